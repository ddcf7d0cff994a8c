//!
//! This module defines the validation settings, the ignore rules used to filter
//! diagnostics and request paths, and loading of `.validate-html.toml` files.

use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

/// Name of the configuration file looked up by the CLI
pub const CONFIG_FILE_NAME: &str = ".validate-html.toml";

/// Snapshot directory used when a host application root is known
const APP_SNAPSHOT_DIR: &str = "tmp/invalid_html";

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read config file at {path}: {source}")]
    IoError { source: io::Error, path: String },

    /// Failed to parse the configuration content
    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

/// A literal string or a regular expression used to suppress a diagnostic or
/// exempt a request path.
///
/// Literal rules must equal the whole text. Pattern rules match anywhere in it.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawIgnoreRule")]
pub enum IgnoreRule {
    Literal(String),
    Pattern(Regex),
}

impl IgnoreRule {
    pub fn literal(text: impl Into<String>) -> Self {
        IgnoreRule::Literal(text.into())
    }

    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(IgnoreRule::Pattern)
    }

    pub fn matches(&self, text: &str) -> bool {
        match self {
            IgnoreRule::Literal(literal) => literal == text,
            IgnoreRule::Pattern(regex) => regex.is_match(text),
        }
    }

    /// The literal text or the regex source
    pub fn as_str(&self) -> &str {
        match self {
            IgnoreRule::Literal(literal) => literal,
            IgnoreRule::Pattern(regex) => regex.as_str(),
        }
    }
}

impl PartialEq for IgnoreRule {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (IgnoreRule::Literal(a), IgnoreRule::Literal(b)) => a == b,
            (IgnoreRule::Pattern(a), IgnoreRule::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl From<&str> for IgnoreRule {
    fn from(text: &str) -> Self {
        IgnoreRule::Literal(text.to_string())
    }
}

impl From<String> for IgnoreRule {
    fn from(text: String) -> Self {
        IgnoreRule::Literal(text)
    }
}

impl From<Regex> for IgnoreRule {
    fn from(regex: Regex) -> Self {
        IgnoreRule::Pattern(regex)
    }
}

/// On-disk shape of an ignore rule: `"text"` or `{ pattern = "regex" }`
#[derive(Deserialize)]
#[serde(untagged)]
enum RawIgnoreRule {
    Literal(String),
    Pattern { pattern: String },
}

impl TryFrom<RawIgnoreRule> for IgnoreRule {
    type Error = regex::Error;

    fn try_from(raw: RawIgnoreRule) -> Result<Self, Self::Error> {
        match raw {
            RawIgnoreRule::Literal(text) => Ok(IgnoreRule::Literal(text)),
            RawIgnoreRule::Pattern { pattern } => IgnoreRule::pattern(&pattern),
        }
    }
}

fn matches_any(rules: &[IgnoreRule], text: &str) -> bool {
    rules.iter().any(|rule| rule.matches(text))
}

/// Validation settings
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Raise [`crate::Error::InvalidHtml`] by default when validation fails (default: true)
    pub raise_on_invalid_html: bool,

    /// Append every failure report to the remembered messages (default: false)
    pub remember_messages: bool,

    /// Deployment environments in which the bootstrap installs the adapters
    /// (default: `["development", "test"]`). Only read at bootstrap time.
    pub environments: Vec<String>,

    ignored_errors: Vec<IgnoreRule>,
    ignored_paths: Vec<IgnoreRule>,
    snapshot_path: OnceLock<PathBuf>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            raise_on_invalid_html: true,
            remember_messages: false,
            environments: vec!["development".to_string(), "test".to_string()],
            ignored_errors: Vec::new(),
            ignored_paths: Vec::new(),
            snapshot_path: OnceLock::new(),
        }
    }
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostics to drop before deciding whether the HTML is valid
    pub fn ignored_errors(&self) -> &[IgnoreRule] {
        &self.ignored_errors
    }

    pub fn set_ignored_errors<I>(&mut self, rules: I)
    where
        I: IntoIterator,
        I::Item: Into<IgnoreRule>,
    {
        self.ignored_errors = rules.into_iter().map(Into::into).collect();
    }

    /// Request paths the HTTP middleware leaves alone
    pub fn ignored_paths(&self) -> &[IgnoreRule] {
        &self.ignored_paths
    }

    pub fn set_ignored_paths<I>(&mut self, rules: I)
    where
        I: IntoIterator,
        I::Item: Into<IgnoreRule>,
    {
        self.ignored_paths = rules.into_iter().map(Into::into).collect();
    }

    pub fn is_ignored_error(&self, diagnostic: &str) -> bool {
        matches_any(&self.ignored_errors, diagnostic)
    }

    pub fn is_ignored_path(&self, path: &str) -> bool {
        matches_any(&self.ignored_paths, path)
    }

    /// Directory where invalid documents are saved.
    ///
    /// Unless set explicitly (or through [`Configuration::use_app_root`]), a new
    /// temporary directory is created on first access and reused afterwards.
    pub fn snapshot_path(&self) -> io::Result<&Path> {
        if let Some(path) = self.snapshot_path.get() {
            return Ok(path);
        }
        let dir = tempfile::Builder::new().prefix("invalid_html").tempdir()?.keep();
        log::debug!("Using {} for invalid html snapshots", dir.display());
        Ok(self.snapshot_path.get_or_init(|| dir))
    }

    pub fn set_snapshot_path(&mut self, path: impl Into<PathBuf>) {
        self.snapshot_path = OnceLock::from(path.into());
    }

    /// Default the snapshot directory to `<root>/tmp/invalid_html` unless one
    /// was already chosen.
    pub fn use_app_root(&mut self, root: &Path) {
        if self.snapshot_path.get().is_none() {
            self.set_snapshot_path(root.join(APP_SNAPSHOT_DIR));
        }
    }

    pub fn is_active_in(&self, environment: &str) -> bool {
        self.environments.iter().any(|env| env == environment)
    }

    /// Parse TOML configuration content on top of the defaults.
    ///
    /// A relative `snapshot_path` is resolved against `base_dir`.
    pub fn from_toml_str(content: &str, base_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Ok(file.into_configuration(base_dir))
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            source: e,
            path: path.display().to_string(),
        })?;
        let file: ConfigFile = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(format!("{}: {e}", path.display())))?;
        Ok(file.into_configuration(path.parent()))
    }
}

/// Find the nearest `.validate-html.toml` in `start` or any of its ancestors
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

/// Keys accepted in `.validate-html.toml`
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    raise_on_invalid_html: Option<bool>,
    remember_messages: Option<bool>,
    ignored_errors: Option<Vec<IgnoreRule>>,
    ignored_paths: Option<Vec<IgnoreRule>>,
    environments: Option<Vec<String>>,
    snapshot_path: Option<PathBuf>,
}

impl ConfigFile {
    fn into_configuration(self, base_dir: Option<&Path>) -> Configuration {
        let mut config = Configuration::default();
        if let Some(raise) = self.raise_on_invalid_html {
            config.raise_on_invalid_html = raise;
        }
        if let Some(remember) = self.remember_messages {
            config.remember_messages = remember;
        }
        if let Some(errors) = self.ignored_errors {
            config.set_ignored_errors(errors);
        }
        if let Some(paths) = self.ignored_paths {
            config.set_ignored_paths(paths);
        }
        if let Some(environments) = self.environments {
            config.environments = environments;
        }
        if let Some(path) = self.snapshot_path {
            let path = match base_dir {
                Some(dir) if path.is_relative() => dir.join(path),
                _ => path,
            };
            config.set_snapshot_path(path);
        }
        config
    }
}
