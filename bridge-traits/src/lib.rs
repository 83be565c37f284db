//! # Host Bridge Traits
//!
//! Host abstraction traits that must be implemented by each embedding of the
//! waveform player core.
//!
//! ## Overview
//!
//! This crate defines the contract between the core library and the host
//! application (the note editor the plugin runs in). Each trait represents a
//! capability the core requires but does not own: the text buffer, the vault,
//! the UI tree, the event loop and the waveform player component itself.
//!
//! ## Traits
//!
//! ### Documents & Editing
//! - [`TextDocument`](document::TextDocument) - Line-addressable document snapshots
//! - [`EditorView`](editor::EditorView) - Live editor hosting decorations
//!
//! ### Vault & Storage
//! - [`VaultAccess`](vault::VaultAccess) - File lookup, attachment folder, resource URLs
//! - [`SettingsStore`](storage::SettingsStore) - Plugin settings persistence
//!
//! ### UI Integration
//! - [`AnchorFactory`](ui::AnchorFactory) / [`WidgetAnchor`](ui::WidgetAnchor) - Player containers
//! - [`PlayerComponent`](player::PlayerComponent) - The waveform player renderer
//! - [`ReadingSection`](reading::ReadingSection) / [`EmbedElement`](reading::EmbedElement) - Reading view DOM
//!
//! ### Utilities
//! - [`TaskScheduler`](scheduler::TaskScheduler) - Idle callbacks and cancellable timers
//! - [`LoggerSink`](log::LoggerSink) - Forward structured logs to the host
//!
//! ## Host Requirements
//!
//! | Host            | Implementation Crate | Status |
//! |-----------------|----------------------|--------|
//! | Desktop/native  | `bridge-desktop`     | ✅ Vault, settings, scheduler |
//! | Editor webview  | TBD                  | 📋 Planned |
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is
//! missing:
//!
//! ```ignore
//! use core_runtime::error::Error;
//!
//! let vault = builder.vault.ok_or_else(|| Error::CapabilityMissing {
//!     capability: "VaultAccess".to_string(),
//!     message: "No vault implementation provided. \
//!               Native hosts: use bridge_desktop::FsVault.".to_string(),
//! })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Implementations should convert host errors to `BridgeError` and keep the
//! offending path or id in the message.
//!
//! ## Thread Safety
//!
//! Bridge traits carry the [`PlatformSendSync`](platform::PlatformSendSync)
//! bound: `Send + Sync` on native targets, nothing on `wasm32`.

pub mod document;
pub mod editor;
pub mod error;
pub mod log;
pub mod platform;
pub mod player;
pub mod reading;
pub mod scheduler;
pub mod storage;
#[cfg(feature = "test-support")]
pub mod testing;
pub mod ui;
pub mod vault;

pub use error::BridgeError;

// Re-export commonly used types
pub use document::{ChangedRange, DocumentLine, StringDocument, TextDocument};
pub use editor::EditorView;
pub use log::{DevConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use platform::{PlatformSend, PlatformSendSync};
pub use player::{
    PlayerComponent, PlayerEventKind, PlayerEventSink, PlayerHandle, PlayerProps, PlayerStyles,
    RenderedPlayer, SamplePoints, WaveformType,
};
pub use reading::{EmbedElement, ObserverHandle, ReadingSection, RemovalSink};
pub use scheduler::{ScheduledTask, TaskId, TaskScheduler};
pub use storage::SettingsStore;
pub use ui::{AnchorFactory, WidgetAnchor};
pub use vault::{VaultAccess, VaultFile};
