//!
//! Error types raised by the validation engine and the remembered-messages store.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The HTML had diagnostics left after filtering. Carries the full report,
    /// or several reports joined by `---` lines.
    #[error("{0}")]
    InvalidHtml(String),

    /// `raise_remembered_messages` was called while `remember_messages` is off.
    #[error("remember_messages is disabled, there are no remembered messages to raise")]
    NotRememberingMessages,

    /// No snapshot directory was configured and a temporary one could not be created.
    #[error("Failed to create a temporary snapshot directory: {0}")]
    TempSnapshotDir(#[source] io::Error),

    #[error("Failed to create snapshot directory {path}: {source}")]
    SnapshotDir { source: io::Error, path: PathBuf },

    #[error("Failed to write snapshot {path}: {source}")]
    SnapshotWrite { source: io::Error, path: PathBuf },
}

impl Error {
    /// The report text when this is an [`Error::InvalidHtml`].
    pub fn report(&self) -> Option<&str> {
        match self {
            Error::InvalidHtml(report) => Some(report),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
