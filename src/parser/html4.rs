//!
//! Strict HTML 4.01 checking.
//!
//! Legacy documents are checked for tag balance and element vocabulary rather
//! than run through the HTML5 tree builder, so they do not collect complaints
//! that only make sense for HTML5. Messages follow libxml2's HTML parser.

use phf::phf_set;

use super::{Diagnostic, SourceMap};

/// Elements defined by the HTML 4.01 strict, transitional and frameset DTDs
static ELEMENTS: phf::Set<&'static str> = phf_set! {
    "a", "abbr", "acronym", "address", "applet", "area", "b", "base", "basefont", "bdo", "big",
    "blockquote", "body", "br", "button", "caption", "center", "cite", "code", "col", "colgroup",
    "dd", "del", "dfn", "dir", "div", "dl", "dt", "em", "fieldset", "font", "form", "frame",
    "frameset", "h1", "h2", "h3", "h4", "h5", "h6", "head", "hr", "html", "i", "iframe", "img",
    "input", "ins", "isindex", "kbd", "label", "legend", "li", "link", "map", "menu", "meta",
    "noframes", "noscript", "object", "ol", "optgroup", "option", "p", "param", "pre", "q", "s",
    "samp", "script", "select", "small", "span", "strike", "strong", "style", "sub", "sup",
    "table", "tbody", "td", "textarea", "tfoot", "th", "thead", "title", "tr", "tt", "u", "ul",
    "var",
};

static VOID_ELEMENTS: phf::Set<&'static str> = phf_set! {
    "area", "base", "basefont", "br", "col", "frame", "hr", "img", "input", "isindex", "link",
    "meta", "param",
};

/// Elements whose end tag may be omitted
static OPTIONAL_END: phf::Set<&'static str> = phf_set! {
    "body", "colgroup", "dd", "dt", "head", "html", "li", "option", "p", "tbody", "td", "tfoot",
    "th", "thead", "tr",
};

/// Elements whose content is text up to the matching end tag
static RAW_TEXT: phf::Set<&'static str> = phf_set! {
    "script", "style", "textarea", "title",
};

/// Start tags that implicitly close an open `p`
static CLOSES_P: phf::Set<&'static str> = phf_set! {
    "address", "blockquote", "center", "dir", "div", "dl", "fieldset", "form", "h1", "h2", "h3",
    "h4", "h5", "h6", "hr", "isindex", "menu", "noframes", "ol", "p", "pre", "table", "ul",
};

/// Whether a `start` tag implicitly ends the `open` element
fn closes_implicitly(open: &str, start: &str) -> bool {
    match open {
        "p" => CLOSES_P.contains(start),
        "li" => start == "li",
        "dt" | "dd" => matches!(start, "dt" | "dd"),
        "option" => matches!(start, "option" | "optgroup"),
        "td" | "th" => matches!(start, "td" | "th" | "tr" | "tbody" | "thead" | "tfoot"),
        "tr" => matches!(start, "tr" | "tbody" | "thead" | "tfoot"),
        "thead" | "tbody" | "tfoot" => matches!(start, "tbody" | "thead" | "tfoot"),
        "head" => start == "body",
        _ => false,
    }
}

struct OpenElement {
    name: String,
    offset: usize,
}

struct Checker<'a> {
    text: &'a str,
    source: SourceMap<'a>,
    stack: Vec<OpenElement>,
    diagnostics: Vec<Diagnostic>,
}

/// Check a complete HTML4 document
pub(super) fn check_document(text: &str) -> Vec<Diagnostic> {
    let mut checker = Checker {
        text,
        source: SourceMap::new(text),
        stack: Vec::new(),
        diagnostics: Vec::new(),
    };
    checker.run();
    checker.diagnostics
}

impl Checker<'_> {
    fn report(&mut self, offset: usize, message: String) {
        let diagnostic = self.source.diagnostic(offset, message);
        self.diagnostics.push(diagnostic);
    }

    fn run(&mut self) {
        let mut pos = 0;
        while let Some(found) = self.text[pos..].find('<') {
            let start = pos + found;
            match self.markup_at(start) {
                Some(next) => pos = next,
                None => return,
            }
        }
        self.finish();
    }

    /// Handle the markup starting at `start` (a `<`) and return where scanning
    /// resumes, or `None` when the rest of the input cannot be scanned.
    fn markup_at(&mut self, start: usize) -> Option<usize> {
        let rest = &self.text[start..];
        if rest.starts_with("<!--") {
            return match rest[4..].find("-->") {
                Some(end) => Some(start + 4 + end + 3),
                None => {
                    self.report(start, "Comment not terminated".to_string());
                    None
                }
            };
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            return match rest.find('>') {
                Some(end) => Some(start + end + 1),
                None => {
                    self.report(start, "Couldn't find end of declaration".to_string());
                    None
                }
            };
        }

        let (is_end, name_start) = if rest.starts_with("</") { (true, 2) } else { (false, 1) };
        let name_len = rest[name_start..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':')))
            .unwrap_or(rest.len() - name_start);
        if name_len == 0 || !rest[name_start..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            // A bare `<` in text
            return Some(start + 1);
        }
        let name = rest[name_start..name_start + name_len].to_ascii_lowercase();

        let Some(tag_len) = tag_length(rest) else {
            let kind = if is_end { "End" } else { "Start" };
            self.report(start, format!("Couldn't find end of {kind} Tag {name}"));
            return None;
        };
        let after = start + tag_len;

        if is_end {
            self.end_tag(&name, start);
            return Some(after);
        }

        self.start_tag(&name, start);
        if RAW_TEXT.contains(name.as_str()) {
            return Some(self.skip_raw_text(&name, after));
        }
        Some(after)
    }

    fn start_tag(&mut self, name: &str, offset: usize) {
        if !ELEMENTS.contains(name) {
            self.report(offset, format!("Tag {name} invalid"));
        }
        while self
            .stack
            .last()
            .is_some_and(|open| closes_implicitly(&open.name, name))
        {
            self.stack.pop();
        }
        if !VOID_ELEMENTS.contains(name) {
            self.stack.push(OpenElement {
                name: name.to_string(),
                offset,
            });
        }
    }

    fn end_tag(&mut self, name: &str, offset: usize) {
        let Some(index) = self.stack.iter().rposition(|open| open.name == name) else {
            self.report(offset, format!("Unexpected end tag : {name}"));
            return;
        };
        let unclosed = self.stack[index + 1..]
            .iter()
            .rev()
            .find(|open| !OPTIONAL_END.contains(open.name.as_str()))
            .map(|open| open.name.clone());
        if let Some(open) = unclosed {
            self.report(offset, format!("Opening and ending tag mismatch: {name} and {open}"));
        }
        self.stack.truncate(index);
    }

    /// Skip the content of a raw text element; the end tag is left for the main loop
    fn skip_raw_text(&mut self, name: &str, from: usize) -> usize {
        let closing = format!("</{name}");
        let haystack = self.text[from..].to_ascii_lowercase();
        match haystack.find(&closing) {
            Some(end) => from + end,
            None => self.text.len(),
        }
    }

    fn finish(&mut self) {
        let unclosed: Vec<(usize, String)> = self
            .stack
            .iter()
            .rev()
            .filter(|open| !OPTIONAL_END.contains(open.name.as_str()))
            .map(|open| (open.offset, open.name.clone()))
            .collect();
        for (offset, name) in unclosed {
            self.report(offset, format!("Premature end of data in tag {name}"));
        }
    }
}

/// Length of the tag starting at the beginning of `rest`, up to and including
/// its closing `>`. Quoted attribute values may contain `>`.
fn tag_length(rest: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in rest.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(i + 1),
            (None, _) => {}
        }
    }
    None
}
