//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for native hosts (macOS,
//! Windows, Linux) and headless tooling.
//!
//! ## Overview
//!
//! This crate provides ready-to-use implementations of the bridges a native
//! host can satisfy without a UI toolkit:
//! - `VaultAccess` over a directory tree, indexed with `tokio::fs`
//! - `SettingsStore` as a JSON file in the user's config directory
//! - `TaskScheduler` on top of Tokio timers
//!
//! UI bridges (anchors, player component, reading view) have no desktop
//! default; they belong to whichever toolkit renders the player.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{FsVault, JsonFileSettingsStore, TokioScheduler};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let vault = FsVault::open("/home/me/Notes").await?
//!         .with_attachment_folder("attachments");
//!     let store = JsonFileSettingsStore::default_location()?;
//!     let scheduler = TokioScheduler::try_current()?;
//!
//!     // Use in plugin configuration
//!     Ok(())
//! }
//! ```

mod scheduler;
mod settings;
mod vault;

pub use scheduler::TokioScheduler;
pub use settings::JsonFileSettingsStore;
pub use vault::FsVault;
