//! Decorations handed to the editor view.

use std::sync::Arc;

use bridge_traits::document::ChangedRange;
use core_links::AudioReference;

use crate::widget::AudioPlayerWidget;

/// A player block placed right after the link it belongs to.
#[derive(Debug, Clone)]
pub struct Decoration {
    /// Document offset of the block (end of the link).
    pub position: usize,
    pub reference: AudioReference,
    pub widget: Arc<AudioPlayerWidget>,
    /// Rendered as a block below the line.
    pub block: bool,
    /// Placed after content at `position`.
    pub side: i8,
}

impl Decoration {
    pub fn block_after(reference: AudioReference, widget: Arc<AudioPlayerWidget>) -> Self {
        Self {
            position: reference.anchor_position(),
            reference,
            widget,
            block: true,
            side: 1,
        }
    }
}

/// Immutable, ordered set of decorations.
///
/// Sessions share it as `Arc<DecorationSet>` and replace the whole set on
/// rebuild, so an unchanged set can be detected with `Arc::ptr_eq`.
#[derive(Debug, Clone, Default)]
pub struct DecorationSet {
    decorations: Vec<Decoration>,
}

impl DecorationSet {
    /// Build a set, ordering decorations by position.
    pub fn new(mut decorations: Vec<Decoration>) -> Self {
        decorations.sort_by_key(|d| (d.position, d.reference.span.start));
        Self { decorations }
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn len(&self) -> usize {
        self.decorations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decorations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Decoration> {
        self.decorations.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Decoration> {
        self.decorations.get(index)
    }

    /// Ids of the widgets in the set, in position order.
    pub fn widget_ids(&self) -> Vec<String> {
        self.decorations
            .iter()
            .map(|d| d.widget.id().to_string())
            .collect()
    }
}

impl<'a> IntoIterator for &'a DecorationSet {
    type Item = &'a Decoration;
    type IntoIter = std::slice::Iter<'a, Decoration>;

    fn into_iter(self) -> Self::IntoIter {
        self.decorations.iter()
    }
}

/// Link spans of a decoration set, carried through the edits that kept it.
///
/// A kept set is never rewritten, so its `position`s describe the document
/// as of the last rebuild. The map follows every later edit and is what the
/// overlap check and [`block_positions`](Self::block_positions) read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpanMap {
    spans: Vec<(usize, usize)>,
}

impl SpanMap {
    pub fn of(set: &DecorationSet) -> Self {
        Self {
            spans: set
                .iter()
                .map(|d| (d.reference.span.start, d.reference.span.end))
                .collect(),
        }
    }

    pub fn spans(&self) -> &[(usize, usize)] {
        &self.spans
    }

    /// Current offsets of the player blocks (the span ends).
    pub fn block_positions(&self) -> Vec<usize> {
        self.spans.iter().map(|&(_, end)| end).collect()
    }

    /// Whether the edit overlaps any tracked span.
    pub fn touched_by(&self, change: &ChangedRange) -> bool {
        self.spans
            .iter()
            .any(|&(start, end)| change.touches_old(start, end))
    }

    /// Move every span through `changes`, which must not overlap any span.
    ///
    /// Text inserted exactly at a span start lands before the link; text
    /// inserted at its end stays outside it.
    pub fn map_through(&mut self, changes: &[ChangedRange]) {
        if changes.is_empty() {
            return;
        }
        for span in &mut self.spans {
            *span = (
                map_position(changes, span.0, true),
                map_position(changes, span.1, false),
            );
        }
    }
}

/// Map an old-document offset into the new document. Change ranges carry
/// their end in both coordinate systems, so the offset only needs the last
/// change that finished before it.
fn map_position(changes: &[ChangedRange], pos: usize, insertions_before: bool) -> usize {
    changes
        .iter()
        .filter(|c| c.old_end < pos || (c.old_end == pos && (insertions_before || c.old_start < c.old_end)))
        .max_by_key(|c| c.old_end)
        .map_or(pos, |c| pos - c.old_end + c.new_end)
}
