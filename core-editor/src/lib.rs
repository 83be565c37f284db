//! # Editor Integration Module
//!
//! Renders a waveform player under every audio link in the live editor.
//!
//! ## Overview
//!
//! This module handles:
//! - Per-widget mount and teardown with deferred rendering ([`widget`])
//! - Reusing widgets across rebuilds and tearing down stale ones ([`lifecycle`])
//! - Deciding which edits warrant a rebuild ([`field`])
//! - Debouncing viewport changes ([`viewport`])
//! - Tying it together per editor view ([`EditorSession`])

pub mod decoration;
pub mod error;
pub mod field;
pub mod lifecycle;
pub mod session;
#[cfg(test)]
mod test_host;
pub mod viewport;
pub mod widget;

pub use decoration::{Decoration, DecorationSet};
pub use error::{EditorError, Result};
pub use field::{Effect, Transaction};
pub use lifecycle::{ReconcileReport, WidgetLifecycleManager};
pub use session::{EditorDeps, EditorSession};
pub use viewport::ViewportDebouncer;
pub use widget::{AudioPlayerWidget, MountOutcome, MountState, WidgetContext, WidgetIds};
