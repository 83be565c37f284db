//! # Settings Registry
//!
//! Holds the plugin settings singleton together with a version counter.
//!
//! Every mutation bumps the version. Widgets remember the version they were
//! built with, so comparing versions is enough to know whether a mounted
//! player still reflects the current settings.
//!
//! ## Persistence format
//!
//! Settings are stored by the host as one JSON object with camelCase keys:
//!
//! ```json
//! { "stopOthersOnPlay": true, "waveformType": "mirror", "samplePoints": 200 }
//! ```
//!
//! Loading merges the stored object over the defaults field by field, so a
//! partially written or outdated file never prevents the plugin from loading.

use crate::error::Result;
use crate::events::{CoreEvent, EventBus, SettingsEvent};

use bridge_traits::player::{SamplePoints, WaveformType};
use bridge_traits::storage::SettingsStore;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

pub const KEY_STOP_OTHERS_ON_PLAY: &str = "stopOthersOnPlay";
pub const KEY_WAVEFORM_TYPE: &str = "waveformType";
pub const KEY_SAMPLE_POINTS: &str = "samplePoints";

/// User-configurable plugin settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Pause every other player when one starts playing.
    pub stop_others_on_play: bool,
    pub waveform_type: WaveformType,
    pub sample_points: SamplePoints,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            stop_others_on_play: true,
            waveform_type: WaveformType::Mirror,
            sample_points: SamplePoints::P200,
        }
    }
}

impl Settings {
    /// Merge a stored JSON document over the defaults.
    ///
    /// Returns the merged settings and the keys that fell back to their
    /// default value because they were missing or invalid.
    pub fn merge_over_defaults(stored: &Value) -> (Settings, Vec<String>) {
        let defaults = Settings::default();
        let mut defaulted = Vec::new();

        let Some(object) = stored.as_object() else {
            warn!(
                found = %json_kind(stored),
                "Stored settings are not a JSON object, using defaults"
            );
            defaulted.extend(
                [KEY_STOP_OTHERS_ON_PLAY, KEY_WAVEFORM_TYPE, KEY_SAMPLE_POINTS]
                    .iter()
                    .map(|key| key.to_string()),
            );
            return (defaults, defaulted);
        };

        let settings = Settings {
            stop_others_on_play: field_or_default(
                object.get(KEY_STOP_OTHERS_ON_PLAY),
                KEY_STOP_OTHERS_ON_PLAY,
                defaults.stop_others_on_play,
                &mut defaulted,
            ),
            waveform_type: field_or_default(
                object.get(KEY_WAVEFORM_TYPE),
                KEY_WAVEFORM_TYPE,
                defaults.waveform_type,
                &mut defaulted,
            ),
            sample_points: field_or_default(
                object.get(KEY_SAMPLE_POINTS),
                KEY_SAMPLE_POINTS,
                defaults.sample_points,
                &mut defaulted,
            ),
        };

        (settings, defaulted)
    }

    /// Serialize to the persisted JSON shape.
    pub fn to_json(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert(
            KEY_STOP_OTHERS_ON_PLAY.to_string(),
            Value::Bool(self.stop_others_on_play),
        );
        map.insert(
            KEY_WAVEFORM_TYPE.to_string(),
            Value::String(self.waveform_type.as_str().to_string()),
        );
        map.insert(
            KEY_SAMPLE_POINTS.to_string(),
            Value::from(self.sample_points.value()),
        );
        Value::Object(map)
    }
}

fn field_or_default<T: DeserializeOwned>(
    value: Option<&Value>,
    key: &str,
    default: T,
    defaulted: &mut Vec<String>,
) -> T {
    let Some(value) = value else {
        defaulted.push(key.to_string());
        return default;
    };

    match serde_json::from_value(value.clone()) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(key, value = %value, error = %e, "Invalid stored setting, using default");
            defaulted.push(key.to_string());
            default
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Partial update applied atomically by [`SettingsRegistry::apply`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub stop_others_on_play: Option<bool>,
    pub waveform_type: Option<WaveformType>,
    pub sample_points: Option<SamplePoints>,
}

impl SettingsPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_others_on_play(mut self, value: bool) -> Self {
        self.stop_others_on_play = Some(value);
        self
    }

    pub fn waveform_type(mut self, value: WaveformType) -> Self {
        self.waveform_type = Some(value);
        self
    }

    pub fn sample_points(mut self, value: SamplePoints) -> Self {
        self.sample_points = Some(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.stop_others_on_play.is_none()
            && self.waveform_type.is_none()
            && self.sample_points.is_none()
    }

    /// camelCase keys of the fields this patch carries.
    pub fn fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        if self.stop_others_on_play.is_some() {
            fields.push(KEY_STOP_OTHERS_ON_PLAY.to_string());
        }
        if self.waveform_type.is_some() {
            fields.push(KEY_WAVEFORM_TYPE.to_string());
        }
        if self.sample_points.is_some() {
            fields.push(KEY_SAMPLE_POINTS.to_string());
        }
        fields
    }

    fn apply_to(&self, settings: &mut Settings) {
        if let Some(value) = self.stop_others_on_play {
            settings.stop_others_on_play = value;
        }
        if let Some(value) = self.waveform_type {
            settings.waveform_type = value;
        }
        if let Some(value) = self.sample_points {
            settings.sample_points = value;
        }
    }
}

/// Immutable copy of the settings at a given version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsSnapshot {
    pub version: u64,
    pub settings: Settings,
}

/// Owner of the settings singleton.
///
/// Cheap to read: callers take a [`SettingsSnapshot`] and never hold the
/// lock while doing anything else.
pub struct SettingsRegistry {
    state: RwLock<SettingsSnapshot>,
    events: Option<EventBus>,
}

impl SettingsRegistry {
    /// Registry holding the defaults at version 0.
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            state: RwLock::new(SettingsSnapshot {
                version: 0,
                settings,
            }),
            events: None,
        }
    }

    /// Publish settings events on `events`.
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn snapshot(&self) -> SettingsSnapshot {
        *self.state.read()
    }

    pub fn version(&self) -> u64 {
        self.state.read().version
    }

    /// Apply a partial update.
    ///
    /// An empty patch changes nothing and returns `None`. Otherwise the
    /// version is bumped and the new snapshot returned.
    pub fn apply(&self, patch: SettingsPatch) -> Option<SettingsSnapshot> {
        if patch.is_empty() {
            debug!("Ignoring empty settings patch");
            return None;
        }

        let snapshot = {
            let mut state = self.state.write();
            patch.apply_to(&mut state.settings);
            state.version += 1;
            *state
        };

        info!(
            version = snapshot.version,
            fields = ?patch.fields(),
            "Settings updated"
        );
        self.emit(SettingsEvent::Changed {
            version: snapshot.version,
            changed_fields: patch.fields(),
        });

        Some(snapshot)
    }

    /// Replace the settings with the stored document merged over defaults.
    pub async fn load(&self, store: &dyn SettingsStore) -> Result<SettingsSnapshot> {
        let stored = store.load().await?;

        let (settings, defaulted) = match stored {
            Some(value) => Settings::merge_over_defaults(&value),
            None => {
                debug!("No stored settings, using defaults");
                (Settings::default(), Vec::new())
            }
        };

        let snapshot = {
            let mut state = self.state.write();
            state.settings = settings;
            state.version += 1;
            *state
        };

        info!(
            version = snapshot.version,
            waveform_type = %snapshot.settings.waveform_type,
            sample_points = %snapshot.settings.sample_points,
            "Settings loaded"
        );
        self.emit(SettingsEvent::Loaded {
            version: snapshot.version,
            defaulted_fields: defaulted,
        });

        Ok(snapshot)
    }

    /// Persist the current settings.
    pub async fn save(&self, store: &dyn SettingsStore) -> Result<()> {
        let snapshot = self.snapshot();

        match store.save(&snapshot.settings.to_json()).await {
            Ok(()) => {
                debug!(version = snapshot.version, "Settings saved");
                self.emit(SettingsEvent::Saved {
                    version: snapshot.version,
                });
                Ok(())
            }
            Err(e) => {
                warn!(version = snapshot.version, error = %e, "Failed to save settings");
                self.emit(SettingsEvent::SaveFailed {
                    version: snapshot.version,
                    message: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    fn emit(&self, event: SettingsEvent) {
        if let Some(events) = &self.events {
            events.emit(CoreEvent::Settings(event)).ok();
        }
    }
}

impl Default for SettingsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SettingsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsRegistry")
            .field("state", &*self.state.read())
            .finish()
    }
}
