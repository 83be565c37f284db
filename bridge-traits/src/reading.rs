//! Reading View Abstractions
//!
//! In reading mode the host renders the note itself and hands rendered
//! sections to post-processors. Audio embeds show up as elements carrying a
//! `src` attribute; the core inserts a player container right after each one
//! and watches for the container leaving the view.

use std::sync::Arc;

use crate::{
    error::Result,
    platform::{PlatformSend, PlatformSendSync},
    ui::WidgetAnchor,
};

/// A rendered section of a note in reading mode.
pub trait ReadingSection: PlatformSendSync {
    /// Embed elements found in the section, in document order.
    fn embeds(&self) -> Vec<Arc<dyn EmbedElement>>;

    /// Path of the note the section belongs to, when known.
    fn source_path(&self) -> Option<String> {
        None
    }
}

/// An internal embed element in the reading view.
pub trait EmbedElement: PlatformSendSync {
    /// Value of the element's `src` attribute, if present.
    fn src_attribute(&self) -> Option<String>;

    /// Insert the anchor's container as the next sibling of this element.
    fn insert_after(&self, anchor: &dyn WidgetAnchor) -> Result<()>;

    /// Observe the parent of the inserted container and report through
    /// `sink` once the container with `container_id` is removed.
    fn observe_removal(
        &self,
        container_id: &str,
        sink: Arc<dyn RemovalSink>,
    ) -> Result<Box<dyn ObserverHandle>>;
}

/// Receives container-removal notifications.
pub trait RemovalSink: PlatformSendSync {
    fn container_removed(&self, container_id: &str);
}

/// A live mutation observer.
pub trait ObserverHandle: PlatformSend {
    /// Stop observing. Safe to call more than once.
    fn disconnect(&mut self);
}
