//!
//! HTML conformance checking for development and test environments.
//!
//! Every payload a host application produces (HTTP responses, emails, pushed
//! notification fragments) can be run through [`Validator::validate`]. When the
//! parser reports problems that are not ignored, the payload is saved to the
//! snapshot directory and a report is either raised as [`Error::InvalidHtml`],
//! logged as a warning, or remembered for a single combined failure later.
//!
//! The free functions in this module operate on one process-wide default
//! [`Validator`]; hosts that want isolation construct their own.

pub mod adapters;
pub mod config;
pub mod error;
pub mod init;
pub mod parser;
pub mod remembered;
pub mod snapshot;
pub mod validator;

pub use config::{Configuration, IgnoreRule};
pub use error::{Error, Result};
pub use parser::{ConformanceParser, Diagnostic, DocumentKind, StandardParser};
pub use validator::{SharedValidator, ValidationRequest, Validator};

use std::sync::LazyLock;

static GLOBAL: LazyLock<SharedValidator> = LazyLock::new(|| Validator::default().shared());

/// Handle to the process-wide default validator
pub fn global() -> SharedValidator {
    GLOBAL.clone()
}

/// Validate `body` against the default validator
pub fn validate_html(body: impl AsRef<[u8]>, request: &ValidationRequest<'_>) -> Result<bool> {
    validator::lock(&GLOBAL).validate(body, request)
}

/// A copy of the default validator's current configuration.
///
/// The snapshot directory is resolved on the default validator first, so the
/// copy reports the directory its snapshots are written to.
pub fn configuration() -> Configuration {
    let validator = validator::lock(&GLOBAL);
    if let Err(e) = validator.config().snapshot_path() {
        log::warn!("Could not create a temporary snapshot directory: {e}");
    }
    validator.config().clone()
}

/// Mutate the default validator's configuration
pub fn configure(f: impl FnOnce(&mut Configuration)) {
    validator::lock(&GLOBAL).configure(f);
}

pub fn remembered_messages() -> Vec<String> {
    validator::lock(&GLOBAL).remembered_messages().to_vec()
}

pub fn forget_messages() {
    validator::lock(&GLOBAL).forget_messages();
}

pub fn raise_remembered_messages() -> Result<()> {
    validator::lock(&GLOBAL).raise_remembered_messages()
}

/// Replace the default validator's configuration and store with fresh defaults.
/// Handles obtained from [`global`] see the reset state.
pub fn reset() {
    *validator::lock(&GLOBAL) = Validator::default();
}
