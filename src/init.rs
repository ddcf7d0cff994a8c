//!
//! Creation of a default `.validate-html.toml`.

use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Error type for initialization operations
#[derive(Error, Debug)]
pub enum InitError {
    #[error("Failed to access file {path}: {source}")]
    IoError { source: io::Error, path: String },
}

/// Commented configuration matching [`crate::Configuration::default`]
pub const DEFAULT_CONFIG: &str = r#"# validate-html configuration file

# Fail validation with an error (true) or only log a warning (false)
raise_on_invalid_html = true

# Keep every failure report so they can be raised together later
remember_messages = false

# Diagnostics to ignore. A string must equal the whole diagnostic,
# a { pattern = "..." } table matches anywhere in it.
ignored_errors = [
    # { pattern = "That tag isn't allowed here" },
]

# Request paths whose responses are never validated
ignored_paths = [
    # "/admin",
    # { pattern = "^/assets/" },
]

# Environments in which the adapters are installed
environments = ["development", "test"]

# Where invalid documents are saved, relative to this file.
# Defaults to a fresh temporary directory.
# snapshot_path = "tmp/invalid_html"
"#;

/// Create a default configuration file at the specified path.
///
/// Returns `true` if the file was created, or `false` if it already exists.
///
/// # Errors
///
/// Returns an error if the file cannot be created due to permissions or other I/O errors.
pub fn create_default_config(path: &Path) -> Result<bool, InitError> {
    if path.exists() {
        return Ok(false);
    }

    fs::write(path, DEFAULT_CONFIG).map_err(|e| InitError::IoError {
        source: e,
        path: path.display().to_string(),
    })?;

    Ok(true)
}
