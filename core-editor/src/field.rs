//! # Decoration Field
//!
//! Decides, per editor transaction, whether the decoration set has to be
//! rebuilt.
//!
//! A rebuild is needed when:
//! - the transaction carries [`Effect::RefreshPlayers`], or
//! - text containing audio-link syntax was inserted, or
//! - a changed range overlaps the span of a decorated link.
//!
//! Every other transaction keeps the current set as-is.

use bridge_traits::document::ChangedRange;
use core_links::LinkScanner;

use crate::decoration::SpanMap;

/// Side effects attached to a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    /// Rebuild every player (settings changed or the viewport settled).
    RefreshPlayers,
}

/// One editor update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    pub changes: Vec<ChangedRange>,
    pub effects: Vec<Effect>,
}

impl Transaction {
    /// Text edit without effects.
    pub fn edit(changes: Vec<ChangedRange>) -> Self {
        Self {
            changes,
            effects: Vec::new(),
        }
    }

    /// Effect-only transaction forcing a refresh.
    pub fn refresh() -> Self {
        Self {
            changes: Vec::new(),
            effects: vec![Effect::RefreshPlayers],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn doc_changed(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn has_effect(&self, effect: Effect) -> bool {
        self.effects.contains(&effect)
    }
}

/// What to do with the decoration set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldUpdate {
    /// Keep the current set.
    Keep,
    /// Recompute the set.
    Rebuild,
}

/// Decide how `transaction` affects the decorated links, whose current
/// offsets are in `spans`.
pub fn classify(scanner: &LinkScanner, spans: &SpanMap, transaction: &Transaction) -> FieldUpdate {
    if transaction.has_effect(Effect::RefreshPlayers) {
        return FieldUpdate::Rebuild;
    }
    if !transaction.doc_changed() {
        return FieldUpdate::Keep;
    }

    let relevant = transaction
        .changes
        .iter()
        .any(|change| scanner.contains_audio_link(&change.inserted) || spans.touched_by(change));

    if relevant {
        FieldUpdate::Rebuild
    } else {
        FieldUpdate::Keep
    }
}
