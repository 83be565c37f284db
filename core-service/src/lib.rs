//! Plugin façade for the waveform player core.
//!
//! This crate wires the host-provided bridges (vault, settings store, player
//! component, UI anchors, scheduler) into the feature crates and exposes the
//! plugin lifecycle to the host. Native hosts typically enable the
//! `desktop-shims` feature, which re-exports the adapters from
//! `bridge-desktop` and lets [`PluginConfig`] fall back to them.
//!
//! ```ignore
//! use core_service::{PluginConfig, WaveformPlayerPlugin};
//!
//! let config = PluginConfig::builder()
//!     .vault(vault)
//!     .player_component(player)
//!     .anchor_factory(anchors)
//!     .build()?;
//! let plugin = WaveformPlayerPlugin::new(config)?;
//! plugin.onload().await?;
//! let session = plugin.create_editor_session(view)?;
//! ```

pub mod error;
pub mod i18n;
pub mod plugin;
pub mod settings_tab;

pub use error::{CoreError, Result};
pub use i18n::Locale;
pub use plugin::{PluginContext, RefreshReport, WaveformPlayerPlugin};
pub use settings_tab::{DropdownOption, SettingControl, SettingsTab};

pub use core_editor::EditorSession;
pub use core_runtime::config::{PluginConfig, PluginConfigBuilder};
pub use core_runtime::events::{CoreEvent, EventStream};
pub use core_runtime::logging::{init_logging, LoggingConfig};
pub use core_runtime::settings::{Settings, SettingsPatch, SettingsSnapshot};

#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
pub use bridge_desktop::{FsVault, JsonFileSettingsStore, TokioScheduler};
