//! Document Model Abstractions
//!
//! The host editor owns the text buffer. The core only needs an immutable
//! snapshot it can walk line by line, plus the list of ranges touched by an
//! edit so it can decide whether a rescan is worth doing.

use crate::error::{BridgeError, Result};
use crate::platform::PlatformSendSync;

/// A single line of a document snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLine {
    /// 1-based line number.
    pub number: usize,
    /// Byte offset of the first character of the line in the whole document.
    pub from: usize,
    /// Line content without the trailing line break.
    pub text: String,
}

impl DocumentLine {
    /// Byte offset just past the last character of the line.
    pub fn to(&self) -> usize {
        self.from + self.text.len()
    }
}

/// Immutable document snapshot provided by the host editor.
///
/// Line numbers are 1-based, matching the host editor convention. A document
/// always has at least one (possibly empty) line.
pub trait TextDocument: PlatformSendSync {
    /// Number of lines in the snapshot.
    fn line_count(&self) -> usize;

    /// Fetch a line by its 1-based number.
    fn line(&self, number: usize) -> Option<DocumentLine>;

    /// Total length in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate every line in order.
    fn lines(&self) -> Box<dyn Iterator<Item = DocumentLine> + '_> {
        Box::new((1..=self.line_count()).filter_map(move |n| self.line(n)))
    }
}

/// One changed range of an edit transaction.
///
/// `old_*` offsets refer to the document before the edit, `new_*` offsets to
/// the document after it. `inserted` is the text now occupying
/// `new_start..new_end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedRange {
    pub old_start: usize,
    pub old_end: usize,
    pub new_start: usize,
    pub new_end: usize,
    pub inserted: String,
}

impl ChangedRange {
    /// Whether the removed part of the old document overlaps `start..end`.
    ///
    /// Pure insertions touch a span when they land strictly inside it.
    pub fn touches_old(&self, start: usize, end: usize) -> bool {
        if self.old_start == self.old_end {
            return self.old_start > start && self.old_start < end;
        }
        self.old_start < end && self.old_end > start
    }
}

/// In-memory document snapshot backed by a `String`.
///
/// Used by headless hosts and throughout the test suites. Lines are split on
/// `\n`; hosts that use other separators are expected to normalize first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringDocument {
    text: String,
    line_starts: Vec<usize>,
}

impl StringDocument {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { text, line_starts }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Produce the snapshot after replacing `from..to` with `insert`, along
    /// with the changed range describing the edit.
    pub fn with_edit(&self, from: usize, to: usize, insert: &str) -> Result<(Self, ChangedRange)> {
        if from > to || to > self.text.len() {
            return Err(BridgeError::InvalidRange(format!(
                "edit range {}..{} outside document of length {}",
                from,
                to,
                self.text.len()
            )));
        }
        if !self.text.is_char_boundary(from) || !self.text.is_char_boundary(to) {
            return Err(BridgeError::InvalidRange(format!(
                "edit range {}..{} splits a character",
                from, to
            )));
        }

        let mut text = String::with_capacity(self.text.len() - (to - from) + insert.len());
        text.push_str(&self.text[..from]);
        text.push_str(insert);
        text.push_str(&self.text[to..]);

        let change = ChangedRange {
            old_start: from,
            old_end: to,
            new_start: from,
            new_end: from + insert.len(),
            inserted: insert.to_string(),
        };

        Ok((Self::new(text), change))
    }
}

impl TextDocument for StringDocument {
    fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    fn line(&self, number: usize) -> Option<DocumentLine> {
        let index = number.checked_sub(1)?;
        let from = *self.line_starts.get(index)?;
        let to = self
            .line_starts
            .get(index + 1)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());

        Some(DocumentLine {
            number,
            from,
            text: self.text[from..to].to_string(),
        })
    }

    fn len(&self) -> usize {
        self.text.len()
    }
}
