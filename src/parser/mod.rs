//!
//! Conformance parser adapter.
//!
//! Picks one of three parse modes from the first bytes of a payload (full HTML5
//! document, strict HTML4 document, or HTML5 fragment), decodes the payload and
//! hands it to the matching backend. The backends only report diagnostics; no
//! markup is ever rewritten.

mod diagnostic;
mod html4;
mod html5;

pub use diagnostic::Diagnostic;
pub(crate) use diagnostic::SourceMap;

use encoding_rs::{Encoding, UTF_8};
use std::fmt;

/// Which grammar a payload was parsed with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Html5Document,
    Html4Document,
    Html5Fragment,
}

impl DocumentKind {
    /// Choose the parse mode from the start of the payload.
    ///
    /// Leading whitespace is skipped and the comparison is case-insensitive:
    /// `<!doctype html>` selects HTML5, any other doctype or a leading `<html`
    /// selects strict HTML4, everything else is a fragment.
    pub fn sniff(body: &[u8]) -> Self {
        let head = body.trim_ascii_start();
        if starts_with_ignore_ascii_case(head, b"<!doctype html>") {
            DocumentKind::Html5Document
        } else if starts_with_ignore_ascii_case(head, b"<!doctype") || starts_with_ignore_ascii_case(head, b"<html") {
            DocumentKind::Html4Document
        } else {
            DocumentKind::Html5Fragment
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Html5Document => "HTML5::Document",
            DocumentKind::Html4Document => "HTML4::Document",
            DocumentKind::Html5Fragment => "HTML5::DocumentFragment",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn starts_with_ignore_ascii_case(haystack: &[u8], prefix: &[u8]) -> bool {
    haystack.len() >= prefix.len() && haystack[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// Extract the charset parameter from a MIME content type.
///
/// `"text/html; charset=utf-8"` gives `Some("utf-8")`. Returns `None` when there
/// is no content type or no charset parameter.
pub fn resolve_encoding(content_type: Option<&str>) -> Option<&str> {
    content_type?
        .split(';')
        .map(str::trim_start)
        .find_map(|part| part.strip_prefix("charset="))
}

/// Decode a payload to text.
///
/// A known `encoding` label wins; otherwise a byte order mark is honoured and
/// UTF-8 is assumed. Malformed sequences become U+FFFD.
pub(crate) fn decode(body: &[u8], encoding: Option<&str>) -> String {
    let requested = encoding.and_then(|label| {
        let found = Encoding::for_label(label.trim().as_bytes());
        if found.is_none() {
            log::debug!("Unknown charset {label:?}, falling back to sniffing");
        }
        found
    });
    let (text, used, had_errors) = requested.unwrap_or(UTF_8).decode(body);
    if had_errors {
        log::debug!("Input contained malformed {} sequences", used.name());
    }
    text.into_owned()
}

/// Result of running a payload through the adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutput {
    pub kind: DocumentKind,
    pub diagnostics: Vec<Diagnostic>,
}

/// The HTML parsing capability the validation engine orchestrates.
///
/// Each entry point reports every diagnostic it finds, in source order, with
/// no cap on the count. `encoding` is a charset label from the content type,
/// or `None` to let the backend detect it.
pub trait ConformanceParser: Send + Sync {
    fn parse_html5_document(&self, body: &[u8], encoding: Option<&str>) -> Vec<Diagnostic>;

    fn parse_html4_document(&self, body: &[u8], encoding: Option<&str>) -> Vec<Diagnostic>;

    fn parse_html5_fragment(&self, body: &[u8], encoding: Option<&str>) -> Vec<Diagnostic>;

    /// Sniff the parse mode and dispatch to the matching entry point
    fn parse(&self, body: &[u8], encoding: Option<&str>) -> ParseOutput {
        let kind = DocumentKind::sniff(body);
        log::debug!("Parsing {} bytes as {kind} (charset: {encoding:?})", body.len());
        let diagnostics = match kind {
            DocumentKind::Html5Document => self.parse_html5_document(body, encoding),
            DocumentKind::Html4Document => self.parse_html4_document(body, encoding),
            DocumentKind::Html5Fragment => self.parse_html5_fragment(body, encoding),
        };
        ParseOutput { kind, diagnostics }
    }
}

/// Default backend: html5ever for the HTML5 modes, a strict tag-balance
/// checker for HTML4 documents
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardParser;

impl ConformanceParser for StandardParser {
    fn parse_html5_document(&self, body: &[u8], encoding: Option<&str>) -> Vec<Diagnostic> {
        html5::parse_document(&decode(body, encoding))
    }

    fn parse_html4_document(&self, body: &[u8], encoding: Option<&str>) -> Vec<Diagnostic> {
        html4::check_document(&decode(body, encoding))
    }

    fn parse_html5_fragment(&self, body: &[u8], encoding: Option<&str>) -> Vec<Diagnostic> {
        html5::parse_fragment(&decode(body, encoding))
    }
}
