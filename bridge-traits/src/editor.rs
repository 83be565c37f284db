//! Editor View Abstractions

use std::sync::Arc;

use crate::{document::TextDocument, platform::PlatformSendSync};

/// Live editor view hosting one document.
pub trait EditorView: PlatformSendSync {
    /// Snapshot of the current document.
    fn document(&self) -> Arc<dyn TextDocument>;

    /// Vault path of the note being edited, used to resolve relative links.
    fn file_path(&self) -> Option<String> {
        None
    }

    /// Ask the host to re-read the decoration set and redraw.
    fn request_redraw(&self);
}
