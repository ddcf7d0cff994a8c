//!
//! Response validation for HTTP services.
//!
//! [`check_response`] holds the framework-neutral logic. [`HtmlValidationLayer`]
//! wraps any `tower` service producing `http::Response<BodySource>` and fails
//! the call when the response body is invalid HTML.

use std::sync::{LazyLock, Mutex};
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, Request, Response};
use regex::Regex;
use tower::{Layer, Service};

use crate::error::{Error, Result};
use crate::validator::{SharedValidator, ValidationRequest, Validator, lock};

static HTML_CONTENT_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\Atext/(?:vnd\.turbo-stream\.html|html)\b").unwrap());

/// View annotation comment some template engines put before the doctype
static ANNOTATION_PREFIX: LazyLock<regex::bytes::Regex> =
    LazyLock::new(|| regex::bytes::Regex::new(r"\A<!-- BEGIN .+?-->").unwrap());

/// A response body as handed over by the downstream handler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BodySource {
    Bytes(Vec<u8>),
    /// A wrapper around another body
    Nested(Box<BodySource>),
    /// A body produced in pieces, joined in order
    Chunks(Vec<BodySource>),
    /// A body whose content cannot be read; treated as empty
    #[default]
    Opaque,
}

impl BodySource {
    /// Flatten the body into one byte buffer
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_into(&mut out);
        out
    }

    fn write_into(&self, out: &mut Vec<u8>) {
        match self {
            BodySource::Bytes(bytes) => out.extend_from_slice(bytes),
            BodySource::Nested(inner) => inner.write_into(out),
            BodySource::Chunks(chunks) => chunks.iter().for_each(|chunk| chunk.write_into(out)),
            BodySource::Opaque => {}
        }
    }
}

impl From<Vec<u8>> for BodySource {
    fn from(bytes: Vec<u8>) -> Self {
        BodySource::Bytes(bytes)
    }
}

impl From<&[u8]> for BodySource {
    fn from(bytes: &[u8]) -> Self {
        BodySource::Bytes(bytes.to_vec())
    }
}

impl From<String> for BodySource {
    fn from(text: String) -> Self {
        BodySource::Bytes(text.into_bytes())
    }
}

impl From<&str> for BodySource {
    fn from(text: &str) -> Self {
        BodySource::Bytes(text.as_bytes().to_vec())
    }
}

/// Whether a content type names HTML or a Turbo Stream. Parameters are ignored.
pub fn is_html_content_type(content_type: &str) -> bool {
    HTML_CONTENT_TYPE.is_match(content_type)
}

fn strip_annotation_prefix(body: &[u8]) -> &[u8] {
    match ANNOTATION_PREFIX.find(body) {
        Some(found) => &body[found.end()..],
        None => body,
    }
}

/// Validate a response produced for `path`.
///
/// Responses for ignored paths, without a content type, or with a non-HTML
/// content type are skipped and count as valid. The request path is the
/// report name and the content type selects the charset.
pub fn check_response(validator: &Mutex<Validator>, path: &str, headers: &HeaderMap, body: &BodySource) -> Result<bool> {
    let mut validator = lock(validator);
    if validator.config().is_ignored_path(path) {
        log::debug!("Skipping validation of ignored path {path}");
        return Ok(true);
    }
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok()) else {
        return Ok(true);
    };
    if !is_html_content_type(content_type) {
        return Ok(true);
    }

    let body = body.to_bytes();
    let request = ValidationRequest::new().name(path).content_type(content_type);
    validator.validate(strip_annotation_prefix(&body), &request)
}

/// Adds response validation to a service
#[derive(Debug, Clone)]
pub struct HtmlValidationLayer {
    validator: SharedValidator,
}

impl HtmlValidationLayer {
    pub fn new(validator: SharedValidator) -> Self {
        Self { validator }
    }
}

impl<S> Layer<S> for HtmlValidationLayer {
    type Service = HtmlValidationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HtmlValidationService {
            inner,
            validator: self.validator.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HtmlValidationService<S> {
    inner: S,
    validator: SharedValidator,
}

impl<S, B> Service<Request<B>> for HtmlValidationService<S>
where
    S: Service<Request<B>, Response = Response<BodySource>>,
    S::Future: Send + 'static,
    S::Error: From<Error> + Send + 'static,
{
    type Response = Response<BodySource>;
    type Error = S::Error;
    type Future = BoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let path = request.uri().path().to_string();
        let validator = self.validator.clone();
        let response = self.inner.call(request);
        Box::pin(async move {
            let response = response.await?;
            check_response(&validator, &path, response.headers(), response.body())?;
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_content_types() {
        assert!(is_html_content_type("text/html"));
        assert!(is_html_content_type("text/html; charset=utf-8"));
        assert!(is_html_content_type("text/vnd.turbo-stream.html"));
        assert!(!is_html_content_type("application/json"));
        assert!(!is_html_content_type("text/htmlx"));
        assert!(!is_html_content_type(" text/html"));
    }

    #[test]
    fn test_body_source_flattening() {
        let body = BodySource::Nested(Box::new(BodySource::Chunks(vec![
            "<p>".into(),
            BodySource::Opaque,
            BodySource::Nested(Box::new("hi".into())),
            "</p>".into(),
        ])));
        assert_eq!(body.to_bytes(), b"<p>hi</p>");
        assert!(BodySource::default().to_bytes().is_empty());
    }

    #[test]
    fn test_strip_annotation_prefix() {
        assert_eq!(
            strip_annotation_prefix(b"<!-- BEGIN app/views/index.html.erb --><!DOCTYPE html>"),
            b"<!DOCTYPE html>"
        );
        assert_eq!(strip_annotation_prefix(b"<!-- other --><p>"), b"<!-- other --><p>");
        assert_eq!(
            strip_annotation_prefix(b"<p><!-- BEGIN x --></p>"),
            b"<p><!-- BEGIN x --></p>"
        );
    }
}
