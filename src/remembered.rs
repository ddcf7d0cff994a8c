//!
//! Store for failure reports whose raising is deferred to a later checkpoint.

/// Separator line placed between reports when they are raised together
pub const SEPARATOR: &str = "---\n";

/// Ordered, append-only list of violation reports.
///
/// Reports are kept in the order they were added, duplicates included.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RememberedMessages {
    messages: Vec<String>,
}

impl RememberedMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember(&mut self, report: impl Into<String>) {
        self.messages.push(report.into());
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn forget(&mut self) {
        self.messages.clear();
    }

    /// Empty the store and return everything it held as one combined report,
    /// or `None` if there was nothing to return.
    pub fn drain_joined(&mut self) -> Option<String> {
        if self.messages.is_empty() {
            return None;
        }
        let messages = std::mem::take(&mut self.messages);
        Some(messages.join(SEPARATOR))
    }
}
