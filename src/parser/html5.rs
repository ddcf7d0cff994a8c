//!
//! HTML5 document and fragment parsing backed by html5ever.
//!
//! The tree builder reports errors without positions, so input is fed one
//! token at a time: each run of text, then each markup chunk from its `<` up to
//! and including its `>`. An error raised while a chunk is processed belongs to
//! the token that chunk holds, and its column is where that token starts.
//!
//! Tree construction errors are reworded by the kind of token that triggered
//! them. Errors on tags and at the end of input list the elements that were
//! open when the token arrived, e.g.
//! `That tag isn't allowed here  Currently open tags: html, strong, em.`
//! Tokenizer errors keep html5ever's own wording.

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashMap;

use html5ever::driver::Parser;
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tokenizer::TokenizerOpts;
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, Tracer, TreeBuilderOpts, TreeSink};
use html5ever::{Attribute, ExpandedName, LocalName, ParseOpts, QualName, local_name, namespace_url, ns};

use super::{Diagnostic, SourceMap};

const DOCUMENT: usize = 0;

/// Prefixes of the messages html5ever's tokenizer emits with `exact_errors` on
const LEXICAL_PREFIXES: [&str; 5] = [
    "Saw ",
    "Bad character",
    "Attributes on an end tag",
    "Self-closing end tag",
    "Duplicate attribute",
];

/// Tree sink that builds no tree: it tracks element names and parents, which
/// are enough to answer the tree builder's queries and to name open elements.
struct ErrorSink {
    next_id: usize,
    names: HashMap<usize, QualName>,
    parents: HashMap<usize, usize>,
    unknown: QualName,
    errors: Vec<Cow<'static, str>>,
}

impl ErrorSink {
    fn new() -> Self {
        Self {
            // 0 is the document; odd ids are nodes, `id + 1` is a template's contents
            next_id: 1,
            names: HashMap::new(),
            parents: HashMap::new(),
            unknown: QualName::new(None, ns!(), LocalName::from("")),
            errors: Vec::new(),
        }
    }

    fn next_handle(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 2;
        id
    }

    fn is_child_of(&self, child: usize, parent: usize) -> bool {
        match self.parents.get(&child) {
            Some(&actual) => actual == parent || (parent != DOCUMENT && actual == parent + 1),
            None => false,
        }
    }
}

impl TreeSink for ErrorSink {
    type Handle = usize;
    type Output = Self;

    fn finish(self) -> Self {
        self
    }

    fn parse_error(&mut self, msg: Cow<'static, str>) {
        self.errors.push(msg);
    }

    fn get_document(&mut self) -> usize {
        DOCUMENT
    }

    fn get_template_contents(&mut self, target: &usize) -> usize {
        target + 1
    }

    fn same_node(&self, x: &usize, y: &usize) -> bool {
        x == y
    }

    fn elem_name<'a>(&'a self, target: &'a usize) -> ExpandedName<'a> {
        self.names.get(target).unwrap_or(&self.unknown).expanded()
    }

    fn create_element(&mut self, name: QualName, _attrs: Vec<Attribute>, _flags: ElementFlags) -> usize {
        let id = self.next_handle();
        self.names.insert(id, name);
        id
    }

    fn create_comment(&mut self, _text: StrTendril) -> usize {
        self.next_handle()
    }

    fn create_pi(&mut self, _target: StrTendril, _data: StrTendril) -> usize {
        self.next_handle()
    }

    fn append(&mut self, parent: &usize, child: NodeOrText<usize>) {
        if let NodeOrText::AppendNode(node) = child {
            self.parents.insert(node, *parent);
        }
    }

    fn append_based_on_parent_node(&mut self, element: &usize, prev_element: &usize, child: NodeOrText<usize>) {
        if self.parents.contains_key(element) {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(&mut self, _name: StrTendril, _public_id: StrTendril, _system_id: StrTendril) {}

    fn set_quirks_mode(&mut self, _mode: QuirksMode) {}

    fn append_before_sibling(&mut self, sibling: &usize, new_node: NodeOrText<usize>) {
        if let NodeOrText::AppendNode(node) = new_node {
            if let Some(&parent) = self.parents.get(sibling) {
                self.parents.insert(node, parent);
            }
        }
    }

    fn add_attrs_if_missing(&mut self, _target: &usize, _attrs: Vec<Attribute>) {}

    fn remove_from_parent(&mut self, target: &usize) {
        self.parents.remove(target);
    }

    fn reparent_children(&mut self, node: &usize, new_parent: &usize) {
        for parent in self.parents.values_mut().filter(|parent| **parent == *node) {
            *parent = *new_parent;
        }
    }
}

/// Collects the handles the tree builder holds on to, in the order it reports them
#[derive(Default)]
struct HandleTrace(RefCell<Vec<usize>>);

impl Tracer for HandleTrace {
    type Handle = usize;

    fn trace_handle(&self, node: &usize) {
        self.0.borrow_mut().push(*node);
    }
}

/// What the parser was looking at when it complained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Characters,
    Doctype,
    Tag,
    EndOfInput,
}

impl TokenKind {
    fn of_markup(markup: &str) -> Self {
        let is_doctype = markup
            .get(..9)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("<!doctype"));
        if is_doctype { TokenKind::Doctype } else { TokenKind::Tag }
    }
}

fn parse_opts() -> ParseOpts {
    ParseOpts {
        tokenizer: TokenizerOpts {
            exact_errors: true,
            ..Default::default()
        },
        tree_builder: TreeBuilderOpts {
            exact_errors: true,
            ..Default::default()
        },
    }
}

/// Parse a complete HTML5 document
pub(super) fn parse_document(text: &str) -> Vec<Diagnostic> {
    feed(html5ever::parse_document(ErrorSink::new(), parse_opts()), text)
}

/// Parse an HTML5 fragment in the context of a `<body>` element
pub(super) fn parse_fragment(text: &str) -> Vec<Diagnostic> {
    let context = QualName::new(None, ns!(html), local_name!("body"));
    feed(
        html5ever::parse_fragment(ErrorSink::new(), parse_opts(), context, Vec::new()),
        text,
    )
}

fn feed(mut parser: Parser<ErrorSink>, text: &str) -> Vec<Diagnostic> {
    let source = SourceMap::new(text);
    let mut diagnostics = Vec::new();
    let mut start = 0;

    for end in chunk_ends(text) {
        let markup_start = text[start..end].rfind('<').map(|i| start + i);
        let text_end = markup_start.unwrap_or(end);

        if text_end > start {
            let run = &text[start..text_end];
            let anchor = start + (run.len() - run.trim_start().len());
            parser.process(StrTendril::from_slice(run));
            let errors = drain_errors(&mut parser);
            report(errors, TokenKind::Characters, &[], &source, anchor, &mut diagnostics);
        }

        if let Some(markup_start) = markup_start {
            let markup = &text[markup_start..end];
            let open = open_elements(&parser);
            parser.process(StrTendril::from_slice(markup));
            let errors = drain_errors(&mut parser);
            report(errors, TokenKind::of_markup(markup), &open, &source, markup_start, &mut diagnostics);
        }

        start = end;
    }

    let open = open_elements(&parser);
    let sink = parser.finish();
    report(sink.errors, TokenKind::EndOfInput, &open, &source, text.len(), &mut diagnostics);
    diagnostics
}

/// Offsets just past every `>`, plus the end of the text if it does not end with one
fn chunk_ends(text: &str) -> impl Iterator<Item = usize> + '_ {
    text.match_indices('>')
        .map(|(i, _)| i + 1)
        .chain((!text.ends_with('>')).then_some(text.len()))
}

fn drain_errors(parser: &mut Parser<ErrorSink>) -> Vec<Cow<'static, str>> {
    std::mem::take(&mut parser.tokenizer.sink.sink.errors)
}

/// Names of the tree builder's open elements, outermost first.
///
/// The builder traces the document, then its stack of open elements, then
/// the handles it keeps for other bookkeeping. The stack is the leading run
/// in which every element is a child of the one before it.
fn open_elements(parser: &Parser<ErrorSink>) -> Vec<String> {
    let builder = &parser.tokenizer.sink;
    let trace = HandleTrace::default();
    builder.trace_handles(&trace);
    let sink = &builder.sink;

    let mut stack: Vec<usize> = Vec::new();
    for handle in trace.0.into_inner().into_iter().skip(1) {
        let parent = stack.last().copied().unwrap_or(DOCUMENT);
        if stack.contains(&handle) || !sink.is_child_of(handle, parent) {
            break;
        }
        stack.push(handle);
    }

    stack
        .iter()
        .map(|handle| sink.elem_name(handle).local.to_string())
        .collect()
}

fn is_lexical(message: &str) -> bool {
    LEXICAL_PREFIXES.iter().any(|prefix| message.starts_with(prefix))
        || message.to_ascii_lowercase().contains("character reference")
}

fn describe(message: &str, kind: TokenKind, open: &[String]) -> String {
    if is_lexical(message) {
        return message.to_string();
    }
    match kind {
        TokenKind::Characters if message.contains("NullCharacterToken") => {
            "Null bytes are not allowed in HTML5".to_string()
        }
        TokenKind::Characters => "Character tokens aren't legal here".to_string(),
        TokenKind::Doctype => "This is not a legal doctype".to_string(),
        TokenKind::Tag => format!("That tag isn't allowed here  Currently open tags: {}.", open.join(", ")),
        TokenKind::EndOfInput => format!("Premature end of file  Currently open tags: {}.", open.join(", ")),
    }
}

/// One token yields one diagnostic per distinct message
fn report(
    errors: Vec<Cow<'static, str>>,
    kind: TokenKind,
    open: &[String],
    source: &SourceMap<'_>,
    offset: usize,
    out: &mut Vec<Diagnostic>,
) {
    let first = out.len();
    for error in errors {
        log::trace!("html5ever: {error}");
        let diagnostic = source.diagnostic(offset, describe(&error, kind, open));
        if !out[first..].contains(&diagnostic) {
            out.push(diagnostic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVALID: &str = "<strong><em>Very Emphasized</strong></em>";
    const VALID: &str = "<strong><em>Very Emphasized</em></strong>";

    fn positions(diagnostics: &[Diagnostic]) -> Vec<(usize, usize)> {
        diagnostics.iter().map(|d| (d.line, d.column)).collect()
    }

    fn messages(diagnostics: &[Diagnostic]) -> Vec<&str> {
        diagnostics.iter().map(|d| d.message.as_str()).collect()
    }

    #[test]
    fn test_valid_fragment() {
        assert!(parse_fragment(VALID).is_empty());
        assert!(parse_fragment("body").is_empty());
    }

    #[test]
    fn test_misnested_fragment_points_at_end_tags() {
        let diagnostics = parse_fragment(INVALID);
        assert_eq!(positions(&diagnostics), vec![(1, 28), (1, 37)]);
        assert!(diagnostics.iter().all(|d| d.excerpt == INVALID));
    }

    #[test]
    fn test_misnested_fragment_lists_open_tags() {
        let diagnostics = parse_fragment(INVALID);
        assert_eq!(
            messages(&diagnostics),
            vec![
                "That tag isn't allowed here  Currently open tags: html, strong, em.",
                "That tag isn't allowed here  Currently open tags: html.",
            ]
        );
    }

    #[test]
    fn test_valid_document() {
        assert!(parse_document("<!DOCTYPE html><html><body><p>hi</p></body></html>").is_empty());
        assert!(parse_document(&format!("<!doctype html>{VALID}")).is_empty());
    }

    #[test]
    fn test_misnested_document() {
        let diagnostics = parse_document(&format!("<!doctype html>{INVALID}"));
        assert_eq!(positions(&diagnostics), vec![(1, 43), (1, 52)]);
        assert_eq!(
            messages(&diagnostics),
            vec![
                "That tag isn't allowed here  Currently open tags: html, body, strong, em.",
                "That tag isn't allowed here  Currently open tags: html, body.",
            ]
        );
    }

    #[test]
    fn test_multiline_positions() {
        let text = "<ul>\n  <li><b>one</li>\n</ul>";
        let diagnostics = parse_fragment(text);
        assert!(!diagnostics.is_empty());
        assert_eq!(diagnostics[0].line, 2);
        assert_eq!(diagnostics[0].excerpt, "  <li><b>one</li>");
        assert_eq!(
            diagnostics[0].message,
            "That tag isn't allowed here  Currently open tags: html, ul, li, b."
        );
    }

    #[test]
    fn test_stray_end_tag() {
        let diagnostics = parse_fragment("<p>text</span></p>");
        assert_eq!(positions(&diagnostics), vec![(1, 8)]);
        assert_eq!(
            diagnostics[0].message,
            "That tag isn't allowed here  Currently open tags: html, p."
        );
    }

    #[test]
    fn test_token_kinds() {
        assert_eq!(TokenKind::of_markup("<!DOCTYPE html>"), TokenKind::Doctype);
        assert_eq!(TokenKind::of_markup("<!doctype html>"), TokenKind::Doctype);
        assert_eq!(TokenKind::of_markup("<!-- note -->"), TokenKind::Tag);
        assert_eq!(TokenKind::of_markup("</em>"), TokenKind::Tag);
        assert_eq!(TokenKind::of_markup("<a>"), TokenKind::Tag);
    }

    #[test]
    fn test_describe() {
        let open = vec!["html".to_string(), "div".to_string()];
        assert_eq!(describe("Duplicate attribute", TokenKind::Tag, &open), "Duplicate attribute");
        assert_eq!(
            describe("Invalid character reference &nope", TokenKind::Characters, &[]),
            "Invalid character reference &nope"
        );
        assert_eq!(
            describe("Unexpected token", TokenKind::Characters, &[]),
            "Character tokens aren't legal here"
        );
        assert_eq!(describe("Bad DOCTYPE", TokenKind::Doctype, &[]), "This is not a legal doctype");
        assert_eq!(
            describe("Unexpected open tag at end of body", TokenKind::EndOfInput, &open),
            "Premature end of file  Currently open tags: html, div."
        );
    }

    #[test]
    fn test_chunk_ends() {
        assert_eq!(chunk_ends("<a>b</a>").collect::<Vec<_>>(), vec![3, 8]);
        assert_eq!(chunk_ends("<a>tail").collect::<Vec<_>>(), vec![3, 7]);
        assert_eq!(chunk_ends("text").collect::<Vec<_>>(), vec![4]);
    }
}
