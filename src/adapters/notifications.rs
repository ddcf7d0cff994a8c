//!
//! Validation of HTML pushed over streaming notifications.

use serde::Deserialize;

use crate::error::Result;
use crate::validator::{SharedValidator, lock};

/// Channel whose broadcasts carry HTML
pub const TURBO_STREAMS_CHANNEL: &str = "Turbo::StreamsChannel";

/// Event the handler is subscribed to
pub const TRANSMIT_EVENT: &str = "transmit.action_cable";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NotificationPayload {
    pub channel_class: Option<String>,
    pub data: Option<String>,
}

impl NotificationPayload {
    pub fn new(channel_class: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            channel_class: Some(channel_class.into()),
            data: Some(data.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotificationHandler {
    validator: SharedValidator,
}

impl NotificationHandler {
    pub fn new(validator: SharedValidator) -> Self {
        Self { validator }
    }

    /// Validate the payload data of a stream broadcast. Missing payloads and
    /// other channels are skipped and count as valid.
    pub fn call(&self, payload: Option<&NotificationPayload>) -> Result<bool> {
        let Some(payload) = payload.filter(|p| p.channel_class.as_deref() == Some(TURBO_STREAMS_CHANNEL)) else {
            return Ok(true);
        };
        let data = payload.data.as_deref().unwrap_or_default();
        lock(&self.validator).validate_html(data)
    }
}
