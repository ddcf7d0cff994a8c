//!
//! Host integration points.
//!
//! Each adapter extracts an HTML payload from a host-specific object and hands
//! it to a shared [`crate::Validator`]. [`bootstrap::install`] wires all of them
//! into a host at once.

pub mod bootstrap;
pub mod http;
pub mod mailer;
pub mod notifications;

pub use bootstrap::{Host, install};
pub use http::{BodySource, HtmlValidationLayer, HtmlValidationService, check_response};
pub use mailer::{HtmlPart, MailMessage, MailerObserver, OutgoingMail};
pub use notifications::{NotificationHandler, NotificationPayload, TRANSMIT_EVENT, TURBO_STREAMS_CHANNEL};
