//!
//! The validation engine.
//!
//! A [`Validator`] is the context every core operation runs against: it owns
//! the configuration, the remembered-messages store and the parser backend.
//! Hosts that share one between threads wrap it in a [`SharedValidator`].

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::parser::{ConformanceParser, DocumentKind, ParseOutput, StandardParser, resolve_encoding};
use crate::remembered::RememberedMessages;
use crate::snapshot::write_snapshot;

/// Handle the adapters hold on to
pub type SharedValidator = Arc<Mutex<Validator>>;

/// Lock a shared validator. A panic in another holder does not leave the
/// configuration or the store half-updated, so poisoning is ignored.
pub fn lock(validator: &Mutex<Validator>) -> MutexGuard<'_, Validator> {
    validator.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-call options for [`Validator::validate`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationRequest<'a> {
    /// Label shown in the report header, e.g. a request path or email subject
    pub name: Option<&'a str>,
    /// MIME content type; its charset parameter selects the decoding
    pub content_type: Option<&'a str>,
    /// Overrides [`Configuration::raise_on_invalid_html`] for this call
    pub raise_on_invalid_html: Option<bool>,
}

impl<'a> ValidationRequest<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: &'a str) -> Self {
        self.name = Some(name);
        self
    }

    pub fn content_type(mut self, content_type: &'a str) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn raise_on_invalid_html(mut self, raise: bool) -> Self {
        self.raise_on_invalid_html = Some(raise);
        self
    }
}

pub struct Validator {
    config: Configuration,
    remembered: RememberedMessages,
    parser: Box<dyn ConformanceParser>,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("config", &self.config)
            .field("remembered", &self.remembered)
            .finish_non_exhaustive()
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(Configuration::default())
    }
}

impl Validator {
    pub fn new(config: Configuration) -> Self {
        Self::with_parser(config, StandardParser)
    }

    /// Use a different parser backend
    pub fn with_parser(config: Configuration, parser: impl ConformanceParser + 'static) -> Self {
        Self {
            config,
            remembered: RememberedMessages::new(),
            parser: Box::new(parser),
        }
    }

    pub fn shared(self) -> SharedValidator {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Configuration {
        &mut self.config
    }

    /// Mutate the configuration in place
    pub fn configure(&mut self, f: impl FnOnce(&mut Configuration)) {
        f(&mut self.config);
    }

    /// Validate `body` with default options
    pub fn validate_html(&mut self, body: impl AsRef<[u8]>) -> Result<bool> {
        self.validate(body, &ValidationRequest::default())
    }

    /// Validate an HTML payload.
    ///
    /// Returns `Ok(true)` when no diagnostics survive the ignore rules. On
    /// failure the body is saved as a snapshot and a report is built; the
    /// report is remembered if `remember_messages` is on, then either returned
    /// as [`Error::InvalidHtml`] or logged as a warning with `Ok(false)`.
    /// Empty bodies are valid and never parsed.
    pub fn validate(&mut self, body: impl AsRef<[u8]>, request: &ValidationRequest<'_>) -> Result<bool> {
        let body = body.as_ref();
        if body.is_empty() {
            return Ok(true);
        }

        let encoding = resolve_encoding(request.content_type);
        let ParseOutput { kind, diagnostics } = self.parser.parse(body, encoding);

        let errors: Vec<String> = diagnostics
            .iter()
            .map(ToString::to_string)
            .filter(|diagnostic| !self.config.is_ignored_error(diagnostic))
            .collect();
        if errors.is_empty() {
            return Ok(true);
        }

        let dir = self.config.snapshot_path().map_err(Error::TempSnapshotDir)?;
        let path = write_snapshot(dir, body)?;
        let report = format_report(request.name, kind, &path, &errors);

        if self.config.remember_messages {
            self.remembered.remember(report.clone());
        }

        if request.raise_on_invalid_html.unwrap_or(self.config.raise_on_invalid_html) {
            return Err(Error::InvalidHtml(report));
        }

        log::warn!("{report}");
        Ok(false)
    }

    pub fn remembered_messages(&self) -> &[String] {
        self.remembered.messages()
    }

    /// Clear the remembered messages, whether or not remembering is enabled
    pub fn forget_messages(&mut self) {
        self.remembered.forget();
    }

    /// Raise every remembered report as one [`Error::InvalidHtml`] and clear the store.
    ///
    /// Fails with [`Error::NotRememberingMessages`] when `remember_messages` is
    /// off, even if the store is empty. Does nothing when there is nothing to raise.
    pub fn raise_remembered_messages(&mut self) -> Result<()> {
        if !self.config.remember_messages {
            return Err(Error::NotRememberingMessages);
        }
        match self.remembered.drain_joined() {
            Some(joined) => Err(Error::InvalidHtml(joined)),
            None => Ok(()),
        }
    }
}

fn format_report(name: Option<&str>, kind: DocumentKind, path: &Path, errors: &[String]) -> String {
    let from = name.map(|name| format!(" from {name}")).unwrap_or_default();
    format!(
        "Invalid html{from}\nParsed using {kind}\ndocument saved at: {}\n\n{}\n",
        path.display(),
        errors.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IgnoreRule;
    use crate::parser::Diagnostic;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Reports the same diagnostics for every input and records what it was asked
    #[derive(Default)]
    struct FakeParser {
        messages: Vec<&'static str>,
        calls: Arc<AtomicUsize>,
        encodings: Arc<Mutex<Vec<Option<String>>>>,
    }

    impl FakeParser {
        fn diagnostics(&self, encoding: Option<&str>) -> Vec<Diagnostic> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.encodings.lock().unwrap().push(encoding.map(str::to_string));
            self.messages
                .iter()
                .map(|message| Diagnostic {
                    line: 1,
                    column: 1,
                    message: message.to_string(),
                    excerpt: "<x>".to_string(),
                })
                .collect()
        }
    }

    impl ConformanceParser for FakeParser {
        fn parse_html5_document(&self, _body: &[u8], encoding: Option<&str>) -> Vec<Diagnostic> {
            self.diagnostics(encoding)
        }

        fn parse_html4_document(&self, _body: &[u8], encoding: Option<&str>) -> Vec<Diagnostic> {
            self.diagnostics(encoding)
        }

        fn parse_html5_fragment(&self, _body: &[u8], encoding: Option<&str>) -> Vec<Diagnostic> {
            self.diagnostics(encoding)
        }
    }

    fn validator(messages: Vec<&'static str>, snapshots: &TempDir) -> (Validator, Arc<AtomicUsize>) {
        let parser = FakeParser {
            messages,
            ..Default::default()
        };
        let calls = parser.calls.clone();
        let mut config = Configuration::default();
        config.set_snapshot_path(snapshots.path());
        (Validator::with_parser(config, parser), calls)
    }

    #[test]
    fn test_empty_body_is_valid_without_parsing() {
        let temp_dir = TempDir::new().unwrap();
        let (mut validator, calls) = validator(vec!["boom"], &temp_dir);
        assert!(validator.validate_html("").unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_no_diagnostics_is_valid_and_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let (mut validator, calls) = validator(vec![], &temp_dir);
        assert!(validator.validate_html("<p>fine</p>").unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_report_format() {
        let temp_dir = TempDir::new().unwrap();
        let (mut validator, _) = validator(vec!["first problem", "second problem"], &temp_dir);
        let err = validator
            .validate("<x>", &ValidationRequest::new().name("My Fragment"))
            .unwrap_err();

        let path = temp_dir.path().join(format!("{}.html", crate::snapshot::digest(b"<x>")));
        assert_eq!(
            err.report().unwrap(),
            format!(
                "Invalid html from My Fragment\nParsed using HTML5::DocumentFragment\ndocument saved at: {}\n\n\
                 1:1: ERROR: first problem\n<x>\n^\n1:1: ERROR: second problem\n<x>\n^\n",
                path.display()
            )
        );
        assert_eq!(std::fs::read(path).unwrap(), b"<x>");
    }

    #[test]
    fn test_report_without_name() {
        let temp_dir = TempDir::new().unwrap();
        let (mut validator, _) = validator(vec!["problem"], &temp_dir);
        let err = validator.validate_html("<!DOCTYPE html><x>").unwrap_err();
        assert!(err.report().unwrap().starts_with("Invalid html\nParsed using HTML5::Document\n"));
    }

    #[test]
    fn test_ignored_errors_filter_rendered_diagnostics() {
        let temp_dir = TempDir::new().unwrap();
        let (mut validator, _) = validator(vec!["ignorable", "also ignorable"], &temp_dir);
        validator.configure(|config| {
            config.set_ignored_errors([
                IgnoreRule::literal("1:1: ERROR: ignorable\n<x>\n^"),
                IgnoreRule::pattern("also").unwrap(),
            ])
        });
        assert!(validator.validate_html("<x>").unwrap());
    }

    #[test]
    fn test_literal_ignore_needs_whole_diagnostic() {
        let temp_dir = TempDir::new().unwrap();
        let (mut validator, _) = validator(vec!["ignorable"], &temp_dir);
        validator.config_mut().set_ignored_errors(["ignorable"]);
        assert!(matches!(validator.validate_html("<x>"), Err(Error::InvalidHtml(_))));
    }

    #[test]
    fn test_warn_instead_of_raise() {
        let temp_dir = TempDir::new().unwrap();
        let (mut validator, _) = validator(vec!["problem"], &temp_dir);
        let request = ValidationRequest::new().raise_on_invalid_html(false);
        assert!(!validator.validate("<x>", &request).unwrap());

        validator.config_mut().raise_on_invalid_html = false;
        assert!(!validator.validate_html("<x>").unwrap());

        let request = ValidationRequest::new().raise_on_invalid_html(true);
        assert!(validator.validate("<x>", &request).is_err());
    }

    #[test]
    fn test_charset_is_passed_to_parser() {
        let temp_dir = TempDir::new().unwrap();
        let parser = FakeParser::default();
        let encodings = parser.encodings.clone();
        let mut config = Configuration::default();
        config.set_snapshot_path(temp_dir.path());
        let mut validator = Validator::with_parser(config, parser);

        let request = ValidationRequest::new().content_type("text/html; charset=utf-8");
        assert!(validator.validate("body", &request).unwrap());
        assert!(validator.validate_html("body").unwrap());
        assert_eq!(*encodings.lock().unwrap(), vec![Some("utf-8".to_string()), None]);
    }

    #[test]
    fn test_remembers_even_when_raising() {
        let temp_dir = TempDir::new().unwrap();
        let (mut validator, _) = validator(vec!["problem"], &temp_dir);
        validator.config_mut().remember_messages = true;

        let first = validator.validate("<x>", &ValidationRequest::new().name("First")).unwrap_err();
        let second = validator.validate("<x>", &ValidationRequest::new().name("Second")).unwrap_err();
        assert_eq!(validator.remembered_messages().len(), 2);

        let joined = validator.raise_remembered_messages().unwrap_err();
        assert_eq!(
            joined.report().unwrap(),
            format!("{}---\n{}", first.report().unwrap(), second.report().unwrap())
        );
        assert!(validator.remembered_messages().is_empty());
        assert!(validator.raise_remembered_messages().is_ok());
    }

    #[test]
    fn test_not_remembering() {
        let temp_dir = TempDir::new().unwrap();
        let (mut validator, _) = validator(vec!["problem"], &temp_dir);
        assert!(matches!(
            validator.raise_remembered_messages(),
            Err(Error::NotRememberingMessages)
        ));

        validator.validate_html("<x>").unwrap_err();
        assert!(validator.remembered_messages().is_empty());
    }

    #[test]
    fn test_forget_without_remembering_enabled() {
        let temp_dir = TempDir::new().unwrap();
        let (mut validator, _) = validator(vec!["problem"], &temp_dir);
        validator.config_mut().remember_messages = true;
        validator.validate_html("<x>").unwrap_err();

        validator.config_mut().remember_messages = false;
        validator.forget_messages();
        validator.config_mut().remember_messages = true;
        assert!(validator.raise_remembered_messages().is_ok());
    }
}
