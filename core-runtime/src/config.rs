//! # Plugin Configuration Module
//!
//! Provides configuration management for the waveform player core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! `PluginConfig` instance that holds every host bridge and tuning value the
//! core needs. It enforces fail-fast validation so a host learns about a
//! missing capability at load time rather than on the first audio link.
//!
//! ## Required Dependencies
//!
//! - `VaultAccess` - File lookup and resource URLs
//! - `PlayerComponent` - The waveform player renderer
//! - `AnchorFactory` - Player containers in the host UI
//! - `SettingsStore` - Settings persistence (desktop default available)
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `TaskScheduler` - Idle callbacks and timers (desktop default: Tokio)
//! - `LoggerSink` - Host log forwarding
//!
//! When the `desktop-shims` feature is enabled, a JSON-file `SettingsStore`
//! and a Tokio-backed `TaskScheduler` are injected when not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::PluginConfig;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = PluginConfig::builder()
//!     .vault(Arc::new(MyVault))
//!     .player_component(Arc::new(MyPlayer))
//!     .anchor_factory(Arc::new(MyAnchors))
//!     .settings_store(Arc::new(MySettingsStore))
//!     .scheduler(Arc::new(MyScheduler))
//!     .viewport_debounce(Duration::from_millis(250))
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! The builder returns [`Error::CapabilityMissing`] naming the missing
//! bridge, and [`Error::Config`] for out-of-range values.

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{
    AnchorFactory, LoggerSink, PlayerComponent, SettingsStore, TaskScheduler, VaultAccess,
};
use std::sync::Arc;
use std::time::Duration;

/// Quiet period before a burst of viewport changes triggers a refresh.
pub const DEFAULT_VIEWPORT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Upper bound accepted for the viewport debounce.
pub const MAX_VIEWPORT_DEBOUNCE: Duration = Duration::from_secs(10);

/// Locale used when the host does not report one.
pub const DEFAULT_LOCALE: &str = "en";

/// Plugin configuration.
///
/// Holds all bridges and settings required to initialize the core. Use
/// [`PluginConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct PluginConfig {
    /// Vault file lookup (required)
    pub vault: Arc<dyn VaultAccess>,

    /// Settings persistence (required, desktop default available)
    pub settings_store: Arc<dyn SettingsStore>,

    /// Waveform player renderer (required)
    pub player_component: Arc<dyn PlayerComponent>,

    /// Player container factory (required)
    pub anchor_factory: Arc<dyn AnchorFactory>,

    /// Idle callbacks and timers (required, desktop default available)
    pub scheduler: Arc<dyn TaskScheduler>,

    /// Host log forwarding (optional)
    pub logger_sink: Option<Arc<dyn LoggerSink>>,

    /// Quiet period for viewport-change debouncing
    pub viewport_debounce: Duration,

    /// Event bus buffer size
    pub event_buffer_size: usize,

    /// Host UI locale (e.g. "en", "zh")
    pub locale: String,
}

impl std::fmt::Debug for PluginConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginConfig")
            .field("vault", &"VaultAccess { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field("player_component", &"PlayerComponent { ... }")
            .field("anchor_factory", &"AnchorFactory { ... }")
            .field("scheduler", &"TaskScheduler { ... }")
            .field(
                "logger_sink",
                &self.logger_sink.as_ref().map(|_| "LoggerSink { ... }"),
            )
            .field("viewport_debounce", &self.viewport_debounce)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("locale", &self.locale)
            .finish()
    }
}

impl PluginConfig {
    /// Creates a new builder for constructing a `PluginConfig`.
    pub fn builder() -> PluginConfigBuilder {
        PluginConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The viewport debounce is non-zero and at most 10 seconds
    /// - The event buffer holds between 1 and 10,000 events
    /// - The locale is not empty
    pub fn validate(&self) -> Result<()> {
        if self.viewport_debounce.is_zero() {
            return Err(Error::Config(
                "Viewport debounce must be greater than 0ms".to_string(),
            ));
        }

        if self.viewport_debounce > MAX_VIEWPORT_DEBOUNCE {
            return Err(Error::Config(
                "Viewport debounce exceeds maximum of 10 seconds (10,000ms)".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > 10_000 {
            return Err(Error::Config(
                "Event buffer size exceeds maximum of 10,000 events".to_string(),
            ));
        }

        if self.locale.trim().is_empty() {
            return Err(Error::Config(
                "Locale cannot be empty. Use .locale(\"en\") or leave it unset.".to_string(),
            ));
        }

        Ok(())
    }
}

fn missing(capability: &str, message: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: message.to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_settings_store() -> Result<Arc<dyn SettingsStore>> {
    Err(missing(
        "SettingsStore",
        "SettingsStore implementation is required for settings persistence. \
         Native hosts: enable the 'desktop-shims' feature to use the default JsonFileSettingsStore. \
         Editor hosts: inject an adapter over the plugin data API.",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_settings_store() -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::JsonFileSettingsStore;

    let store = JsonFileSettingsStore::default_location().map_err(|e| {
        Error::Internal(format!("Failed to locate default settings file: {}", e))
    })?;
    let store: Arc<dyn SettingsStore> = Arc::new(store);
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_scheduler() -> Result<Arc<dyn TaskScheduler>> {
    Err(missing(
        "TaskScheduler",
        "TaskScheduler implementation is required for deferred mounts and viewport debouncing. \
         Native hosts: enable the 'desktop-shims' feature to use the default TokioScheduler. \
         Editor hosts: inject an adapter over requestIdleCallback/setTimeout.",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_scheduler() -> Result<Arc<dyn TaskScheduler>> {
    use bridge_desktop::TokioScheduler;

    let scheduler = TokioScheduler::try_current().map_err(|e| {
        Error::CapabilityMissing {
            capability: "TaskScheduler".to_string(),
            message: format!(
                "The default TokioScheduler needs a running Tokio runtime ({}). \
                 Build the config inside the runtime or inject a scheduler.",
                e
            ),
        }
    })?;
    let scheduler: Arc<dyn TaskScheduler> = Arc::new(scheduler);
    Ok(scheduler)
}

/// Builder for constructing [`PluginConfig`] instances.
#[derive(Default)]
pub struct PluginConfigBuilder {
    vault: Option<Arc<dyn VaultAccess>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    player_component: Option<Arc<dyn PlayerComponent>>,
    anchor_factory: Option<Arc<dyn AnchorFactory>>,
    scheduler: Option<Arc<dyn TaskScheduler>>,
    logger_sink: Option<Arc<dyn LoggerSink>>,
    viewport_debounce: Option<Duration>,
    event_buffer_size: Option<usize>,
    locale: Option<String>,
}

impl PluginConfigBuilder {
    /// Sets the vault implementation (required).
    pub fn vault(mut self, vault: Arc<dyn VaultAccess>) -> Self {
        self.vault = Some(vault);
        self
    }

    /// Sets the settings store implementation.
    ///
    /// If not provided, the JSON-file store in the user's config directory
    /// is used when the `desktop-shims` feature is enabled.
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Sets the waveform player renderer (required).
    pub fn player_component(mut self, component: Arc<dyn PlayerComponent>) -> Self {
        self.player_component = Some(component);
        self
    }

    /// Sets the player container factory (required).
    pub fn anchor_factory(mut self, factory: Arc<dyn AnchorFactory>) -> Self {
        self.anchor_factory = Some(factory);
        self
    }

    /// Sets the task scheduler.
    ///
    /// If not provided, a Tokio-backed scheduler bound to the current
    /// runtime is used when the `desktop-shims` feature is enabled.
    pub fn scheduler(mut self, scheduler: Arc<dyn TaskScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Sets the host logger sink (optional).
    pub fn logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    /// Sets the viewport debounce period.
    ///
    /// Default: 200ms
    pub fn viewport_debounce(mut self, period: Duration) -> Self {
        self.viewport_debounce = Some(period);
        self
    }

    /// Sets the event bus buffer size.
    ///
    /// Default: 100
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the host UI locale.
    ///
    /// Default: "en"
    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Builds the final `PluginConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(PluginConfig)` on success, or an error if:
    /// - Required bridges are missing (VaultAccess, PlayerComponent, AnchorFactory)
    /// - No default exists for a missing SettingsStore or TaskScheduler
    /// - Configuration values are out of range
    pub fn build(self) -> Result<PluginConfig> {
        let vault = self.vault.ok_or_else(|| {
            missing(
                "VaultAccess",
                "VaultAccess implementation is required to resolve audio links. \
                 Native hosts: use bridge_desktop::FsVault. \
                 Editor hosts: inject an adapter over the vault API.",
            )
        })?;

        let player_component = self.player_component.ok_or_else(|| {
            missing(
                "PlayerComponent",
                "PlayerComponent implementation is required to render waveform players. \
                 Inject the host's waveform player renderer with .player_component().",
            )
        })?;

        let anchor_factory = self.anchor_factory.ok_or_else(|| {
            missing(
                "AnchorFactory",
                "AnchorFactory implementation is required to create player containers. \
                 Inject the host's UI adapter with .anchor_factory().",
            )
        })?;

        let settings_store = match self.settings_store {
            Some(store) => store,
            None => provide_default_settings_store()?,
        };

        let scheduler = match self.scheduler {
            Some(scheduler) => scheduler,
            None => provide_default_scheduler()?,
        };

        let config = PluginConfig {
            vault,
            settings_store,
            player_component,
            anchor_factory,
            scheduler,
            logger_sink: self.logger_sink,
            viewport_debounce: self.viewport_debounce.unwrap_or(DEFAULT_VIEWPORT_DEBOUNCE),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            locale: self.locale.unwrap_or_else(|| DEFAULT_LOCALE.to_string()),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualScheduler;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{
        PlayerEventSink, PlayerProps, RenderedPlayer, VaultFile, WidgetAnchor,
    };
    use serde_json::Value;

    struct NullVault;

    impl VaultAccess for NullVault {
        fn file_by_path(&self, _path: &str) -> Option<VaultFile> {
            None
        }

        fn attachment_folder(&self) -> Option<String> {
            None
        }

        fn resource_url(&self, file: &VaultFile) -> String {
            file.path.clone()
        }
    }

    struct NullStore;

    #[async_trait]
    impl SettingsStore for NullStore {
        async fn load(&self) -> BridgeResult<Option<Value>> {
            Ok(None)
        }

        async fn save(&self, _data: &Value) -> BridgeResult<()> {
            Ok(())
        }
    }

    struct NullPlayer;

    impl PlayerComponent for NullPlayer {
        fn render(
            &self,
            _anchor: &dyn WidgetAnchor,
            _props: PlayerProps,
            _sink: Arc<dyn PlayerEventSink>,
        ) -> BridgeResult<Box<dyn RenderedPlayer>> {
            Err(bridge_traits::BridgeError::NotAvailable("test".to_string()))
        }
    }

    struct NullAnchors;

    impl AnchorFactory for NullAnchors {
        fn create_anchor(&self, _player_id: &str) -> Arc<dyn WidgetAnchor> {
            unimplemented!("not used by config tests")
        }
    }

    fn complete_builder() -> PluginConfigBuilder {
        PluginConfig::builder()
            .vault(Arc::new(NullVault))
            .settings_store(Arc::new(NullStore))
            .player_component(Arc::new(NullPlayer))
            .anchor_factory(Arc::new(NullAnchors))
            .scheduler(Arc::new(ManualScheduler::new()))
    }

    #[test]
    fn test_build_with_all_bridges() {
        let config = complete_builder().build().unwrap();
        assert_eq!(config.viewport_debounce, Duration::from_millis(200));
        assert_eq!(config.event_buffer_size, 100);
        assert_eq!(config.locale, "en");
        assert!(config.logger_sink.is_none());
    }

    #[test]
    fn test_missing_vault_is_capability_error() {
        let result = PluginConfig::builder()
            .settings_store(Arc::new(NullStore))
            .player_component(Arc::new(NullPlayer))
            .anchor_factory(Arc::new(NullAnchors))
            .scheduler(Arc::new(ManualScheduler::new()))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, message }) => {
                assert_eq!(capability, "VaultAccess");
                assert!(message.contains("FsVault"));
            }
            other => panic!("expected CapabilityMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_player_component() {
        let result = PluginConfig::builder()
            .vault(Arc::new(NullVault))
            .anchor_factory(Arc::new(NullAnchors))
            .build();

        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { ref capability, .. }) if capability == "PlayerComponent"
        ));
    }

    #[test]
    fn test_zero_debounce_rejected() {
        let result = complete_builder()
            .viewport_debounce(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_excessive_debounce_rejected() {
        let result = complete_builder()
            .viewport_debounce(Duration::from_secs(11))
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_event_buffer_bounds() {
        assert!(complete_builder().event_buffer_size(0).build().is_err());
        assert!(complete_builder().event_buffer_size(10_001).build().is_err());
        assert!(complete_builder().event_buffer_size(16).build().is_ok());
    }

    #[test]
    fn test_blank_locale_rejected() {
        let result = complete_builder().locale("  ").build();
        assert!(matches!(result, Err(Error::Config(_))));

        let config = complete_builder().locale("zh").build().unwrap();
        assert_eq!(config.locale, "zh");
    }

    #[test]
    fn test_debug_hides_bridges() {
        let config = complete_builder().build().unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("VaultAccess { ... }"));
        assert!(debug.contains("viewport_debounce"));
    }
}
