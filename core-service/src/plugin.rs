//! # Plugin Façade
//!
//! [`WaveformPlayerPlugin`] owns everything one plugin instance shares:
//! the settings registry, the playback coordinator, the event bus, the open
//! editor sessions and the reading-view renderer. Hosts drive it through
//! the load/unload hooks and forward editor and reading-view events.
//!
//! ## Lifecycle
//!
//! ```text
//!  new ──> onload ──> (editor sessions, reading sections, settings edits) ──> onunload
//! ```
//!
//! A settings edit is applied in memory, broadcast to every editor session
//! and the reading view, and only then persisted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bridge_traits::editor::EditorView;
use bridge_traits::reading::ReadingSection;
use core_editor::{EditorDeps, EditorSession, WidgetContext, WidgetIds};
use core_links::{LinkScanner, ResourceResolver};
use core_playback::PlaybackCoordinator;
use core_reading::{ReadingContext, ReadingModeRenderer};
use core_runtime::config::PluginConfig;
use core_runtime::events::{EventBus, EventStream};
use core_runtime::settings::{SettingsPatch, SettingsRegistry, SettingsSnapshot};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{CoreError, Result};
use crate::i18n::Locale;
use crate::settings_tab::{self, SettingsTab};

/// Shared state of one plugin instance. No module-level statics.
pub struct PluginContext {
    pub settings: Arc<SettingsRegistry>,
    pub coordinator: Arc<PlaybackCoordinator>,
    pub events: EventBus,
    pub scanner: Arc<LinkScanner>,
    pub resolver: Arc<ResourceResolver>,
    pub widgets: WidgetContext,
    pub reading: ReadingModeRenderer,
}

impl PluginContext {
    fn new(config: &PluginConfig) -> Result<Self> {
        let events = EventBus::new(config.event_buffer_size);
        let settings = Arc::new(SettingsRegistry::new().with_event_bus(events.clone()));
        let coordinator = Arc::new(
            PlaybackCoordinator::new(settings.clone()).with_event_bus(events.clone()),
        );
        let scanner = Arc::new(LinkScanner::new()?);
        let resolver = Arc::new(ResourceResolver::new(config.vault.clone()));

        let widgets = WidgetContext {
            resolver: resolver.clone(),
            component: config.player_component.clone(),
            anchors: config.anchor_factory.clone(),
            scheduler: config.scheduler.clone(),
            coordinator: coordinator.clone(),
            events: Some(events.clone()),
            ids: Arc::new(WidgetIds::default()),
        };

        let reading = ReadingModeRenderer::new(ReadingContext {
            scanner: scanner.clone(),
            resolver: resolver.clone(),
            component: config.player_component.clone(),
            anchors: config.anchor_factory.clone(),
            coordinator: coordinator.clone(),
            settings: settings.clone(),
            events: Some(events.clone()),
        });

        Ok(Self {
            settings,
            coordinator,
            events,
            scanner,
            resolver,
            widgets,
            reading,
        })
    }
}

/// What a refresh broadcast reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub editor_sessions: usize,
    pub reading_entries: usize,
}

pub struct WaveformPlayerPlugin {
    config: PluginConfig,
    context: PluginContext,
    locale: Locale,
    sessions: Mutex<Vec<EditorSession>>,
    loaded: AtomicBool,
}

impl WaveformPlayerPlugin {
    /// Wire the configured bridges together. Nothing is read from the host
    /// until [`onload`](Self::onload).
    pub fn new(config: PluginConfig) -> Result<Self> {
        config.validate()?;
        let context = PluginContext::new(&config)?;
        let locale = Locale::from_tag(&config.locale);

        Ok(Self {
            config,
            context,
            locale,
            sessions: Mutex::new(Vec::new()),
            loaded: AtomicBool::new(false),
        })
    }

    /// Load persisted settings. A store that cannot be read leaves the
    /// defaults in place.
    pub async fn onload(&self) -> Result<SettingsSnapshot> {
        let snapshot = match self
            .context
            .settings
            .load(self.config.settings_store.as_ref())
            .await
        {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Could not load settings, using defaults");
                self.context.settings.snapshot()
            }
        };

        self.loaded.store(true, Ordering::SeqCst);
        info!(
            version = snapshot.version,
            locale = ?self.locale,
            "Waveform player loaded"
        );
        Ok(snapshot)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    pub fn context(&self) -> &PluginContext {
        &self.context
    }

    pub fn settings(&self) -> SettingsSnapshot {
        self.context.settings.snapshot()
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Subscribe to settings, widget and playback events.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.context.events.subscribe())
    }

    /// Attach players to a newly opened editor view.
    pub fn create_editor_session(&self, view: Arc<dyn EditorView>) -> Result<EditorSession> {
        if !self.is_loaded() {
            return Err(CoreError::NotLoaded);
        }

        let deps = EditorDeps {
            scanner: self.context.scanner.clone(),
            settings: self.context.settings.clone(),
            widgets: self.context.widgets.clone(),
            viewport_debounce: self.config.viewport_debounce,
        };
        let session = EditorSession::new(deps, view)?;

        let mut sessions = self.sessions.lock();
        sessions.retain(|s| !s.is_destroyed());
        sessions.push(session.clone());
        debug!(sessions = sessions.len(), "Editor session opened");
        Ok(session)
    }

    /// Tear down the players of a closed editor view.
    pub fn close_editor_session(&self, session: &EditorSession) -> bool {
        let removed = {
            let mut sessions = self.sessions.lock();
            let before = sessions.len();
            sessions.retain(|s| !s.same_session(session));
            before != sessions.len()
        };
        session.destroy();
        removed
    }

    /// Number of live editor sessions.
    pub fn session_count(&self) -> usize {
        self.sessions
            .lock()
            .iter()
            .filter(|s| !s.is_destroyed())
            .count()
    }

    /// Post-process a rendered reading-view section.
    pub fn process_reading_section(&self, section: &dyn ReadingSection) -> Vec<String> {
        if !self.is_loaded() {
            debug!("Ignoring reading section before load");
            return Vec::new();
        }
        self.context.reading.process_section(section)
    }

    /// Apply a settings update, refresh every player and persist.
    ///
    /// Returns `Ok(None)` for an empty patch. A persistence failure is
    /// reported after the in-memory update and refresh already happened.
    pub async fn update_settings(&self, patch: SettingsPatch) -> Result<Option<SettingsSnapshot>> {
        let Some(snapshot) = self.context.settings.apply(patch) else {
            return Ok(None);
        };

        self.refresh_all_players();

        self.context
            .settings
            .save(self.config.settings_store.as_ref())
            .await
            .map_err(|source| CoreError::Persistence {
                version: snapshot.version,
                source,
            })?;

        Ok(Some(snapshot))
    }

    /// Apply one edit from the settings panel.
    pub async fn apply_setting(&self, key: &str, value: &str) -> Result<Option<SettingsSnapshot>> {
        let patch = settings_tab::patch_for(key, value)?;
        self.update_settings(patch).await
    }

    /// The settings panel for the current settings and locale.
    pub fn settings_tab(&self) -> SettingsTab {
        SettingsTab::build(&self.settings().settings, self.locale)
    }

    /// Rebuild every editor session's players and re-render the reading view.
    pub fn refresh_all_players(&self) -> RefreshReport {
        let sessions: Vec<EditorSession> = {
            let mut sessions = self.sessions.lock();
            sessions.retain(|s| !s.is_destroyed());
            sessions.clone()
        };

        for session in &sessions {
            session.refresh();
        }
        let reading_entries = self.context.reading.refresh_all();

        debug!(
            editor_sessions = sessions.len(),
            reading_entries, "Players refreshed"
        );
        RefreshReport {
            editor_sessions: sessions.len(),
            reading_entries,
        }
    }

    /// Stop playback and release every player.
    pub fn onunload(&self) {
        let stopped = self.context.coordinator.stop_all();

        let sessions = std::mem::take(&mut *self.sessions.lock());
        for session in &sessions {
            session.destroy();
        }
        let reading = self.context.reading.clear();

        if self.loaded.swap(false, Ordering::SeqCst) {
            info!(
                stopped,
                editor_sessions = sessions.len(),
                reading_entries = reading,
                "Waveform player unloaded"
            );
        }
    }
}

impl std::fmt::Debug for WaveformPlayerPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaveformPlayerPlugin")
            .field("config", &self.config)
            .field("loaded", &self.is_loaded())
            .field("sessions", &self.session_count())
            .finish()
    }
}
