//!
//! Outgoing mail validation.

use crate::error::Result;
use crate::validator::{SharedValidator, ValidationRequest, lock};

/// The HTML alternative of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HtmlPart<'a> {
    pub body: &'a [u8],
    pub content_type: Option<&'a str>,
}

/// What the observer needs from a mail message
pub trait MailMessage {
    fn subject(&self) -> Option<&str>;

    fn html_part(&self) -> Option<HtmlPart<'_>>;
}

/// A plain mail message, for hosts without their own message type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingMail {
    pub subject: Option<String>,
    pub html_body: Option<Vec<u8>>,
    pub html_content_type: Option<String>,
}

impl OutgoingMail {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: Some(subject.into()),
            ..Default::default()
        }
    }

    pub fn with_html(mut self, body: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        self.html_body = Some(body.into());
        self.html_content_type = Some(content_type.into());
        self
    }
}

impl MailMessage for OutgoingMail {
    fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    fn html_part(&self) -> Option<HtmlPart<'_>> {
        self.html_body.as_deref().map(|body| HtmlPart {
            body,
            content_type: self.html_content_type.as_deref(),
        })
    }
}

/// Validates the HTML part of every message it sees.
///
/// The same observer serves as a send-time interceptor, a delivery observer
/// and a preview interceptor; the hooks only differ by name.
#[derive(Debug, Clone)]
pub struct MailerObserver {
    validator: SharedValidator,
}

impl MailerObserver {
    pub fn new(validator: SharedValidator) -> Self {
        Self { validator }
    }

    /// Validate `email`'s HTML part under the name `email <subject>`.
    /// Messages without an HTML part are valid.
    pub fn perform<M: MailMessage + ?Sized>(&self, email: &M) -> Result<bool> {
        let Some(part) = email.html_part() else {
            return Ok(true);
        };
        let name = format!("email {}", email.subject().unwrap_or_default());
        let mut request = ValidationRequest::new().name(&name);
        request.content_type = part.content_type;
        lock(&self.validator).validate(part.body, &request)
    }

    pub fn delivering_email<M: MailMessage + ?Sized>(&self, email: &M) -> Result<bool> {
        self.perform(email)
    }

    pub fn delivered_email<M: MailMessage + ?Sized>(&self, email: &M) -> Result<bool> {
        self.perform(email)
    }

    pub fn previewing_email<M: MailMessage + ?Sized>(&self, email: &M) -> Result<bool> {
        self.perform(email)
    }
}
