//!
//! One-call installation of every adapter into a host application.

use std::path::Path;

use super::http::HtmlValidationLayer;
use super::mailer::MailerObserver;
use super::notifications::{NotificationHandler, TRANSMIT_EVENT};
use crate::validator::{SharedValidator, lock};

/// Registration hooks a host application exposes
pub trait Host {
    /// Name of the deployment environment, e.g. `"development"`
    fn environment(&self) -> &str;

    /// Application root; snapshots default to `<root>/tmp/invalid_html`
    fn app_root(&self) -> Option<&Path> {
        None
    }

    /// Whether the host sends mail at all
    fn supports_mail(&self) -> bool {
        true
    }

    fn use_middleware(&mut self, layer: HtmlValidationLayer);

    /// Register an interceptor that runs before any already registered
    fn prepend_mail_interceptor(&mut self, interceptor: MailerObserver);

    fn append_mail_observer(&mut self, observer: MailerObserver);

    fn append_preview_interceptor(&mut self, interceptor: MailerObserver);

    fn subscribe(&mut self, event: &'static str, handler: NotificationHandler);
}

/// Install the adapters into `host` if its environment is one of the
/// configured environments. Returns whether anything was installed.
///
/// The mail interceptor is prepended so it sees messages before other
/// interceptors rewrite them; the observer runs after delivery as well.
pub fn install<H: Host + ?Sized>(host: &mut H, validator: &SharedValidator) -> bool {
    let environment = host.environment().to_string();
    {
        let mut guard = lock(validator);
        if !guard.config().is_active_in(&environment) {
            log::debug!("Not installing HTML validation in the {environment} environment");
            return false;
        }
        if let Some(root) = host.app_root() {
            guard.config_mut().use_app_root(root);
        }
    }

    host.use_middleware(HtmlValidationLayer::new(validator.clone()));
    if host.supports_mail() {
        let observer = MailerObserver::new(validator.clone());
        host.prepend_mail_interceptor(observer.clone());
        host.append_mail_observer(observer.clone());
        host.append_preview_interceptor(observer);
    }
    host.subscribe(TRANSMIT_EVENT, NotificationHandler::new(validator.clone()));

    log::debug!("Installed HTML validation for the {environment} environment");
    true
}
