//! # Settings Panel Model
//!
//! Describes the plugin's settings panel so the host can draw it with its
//! own widgets: one toggle and two dropdowns, labelled in the host locale.
//!
//! Hosts report edits back as `(key, value)` strings, the way dropdown
//! widgets hand them out; [`patch_for`] turns them into a
//! [`SettingsPatch`]. Every edit commits immediately.

use bridge_traits::player::{SamplePoints, WaveformType};
use core_runtime::settings::{
    Settings, SettingsPatch, KEY_SAMPLE_POINTS, KEY_STOP_OTHERS_ON_PLAY, KEY_WAVEFORM_TYPE,
};
use serde::Serialize;

use crate::error::{CoreError, Result};
use crate::i18n::Locale;

/// One option of a dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropdownOption {
    pub value: String,
    pub label: String,
}

/// One row of the settings panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SettingControl {
    Toggle {
        key: &'static str,
        name: String,
        description: String,
        value: bool,
    },
    Dropdown {
        key: &'static str,
        name: String,
        description: String,
        options: Vec<DropdownOption>,
        selected: String,
    },
}

impl SettingControl {
    pub fn key(&self) -> &'static str {
        match self {
            SettingControl::Toggle { key, .. } | SettingControl::Dropdown { key, .. } => key,
        }
    }
}

/// The whole panel, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsTab {
    pub controls: Vec<SettingControl>,
}

impl SettingsTab {
    /// Build the panel for the current settings.
    pub fn build(settings: &Settings, locale: Locale) -> Self {
        let strings = locale.strings();

        let waveform_options = WaveformType::ALL
            .into_iter()
            .map(|waveform| DropdownOption {
                value: waveform.as_str().to_string(),
                label: strings.waveform_label(waveform).to_string(),
            })
            .collect();

        let sample_options = SamplePoints::ALL
            .into_iter()
            .map(|points| DropdownOption {
                value: points.value().to_string(),
                label: strings.sample_points_label(points).to_string(),
            })
            .collect();

        Self {
            controls: vec![
                SettingControl::Toggle {
                    key: KEY_STOP_OTHERS_ON_PLAY,
                    name: strings.stop_other_players.name.to_string(),
                    description: strings.stop_other_players.description.to_string(),
                    value: settings.stop_others_on_play,
                },
                SettingControl::Dropdown {
                    key: KEY_WAVEFORM_TYPE,
                    name: strings.waveform_type.name.to_string(),
                    description: strings.waveform_type.description.to_string(),
                    options: waveform_options,
                    selected: settings.waveform_type.as_str().to_string(),
                },
                SettingControl::Dropdown {
                    key: KEY_SAMPLE_POINTS,
                    name: strings.sample_points.name.to_string(),
                    description: strings.sample_points.description.to_string(),
                    options: sample_options,
                    selected: settings.sample_points.value().to_string(),
                },
            ],
        }
    }

    pub fn control(&self, key: &str) -> Option<&SettingControl> {
        self.controls.iter().find(|c| c.key() == key)
    }
}

/// Convert a panel edit into a settings patch.
pub fn patch_for(key: &str, value: &str) -> Result<SettingsPatch> {
    let invalid = || CoreError::InvalidSettingValue {
        key: key.to_string(),
        value: value.to_string(),
    };

    match key {
        KEY_STOP_OTHERS_ON_PLAY => {
            let flag = value.parse::<bool>().map_err(|_| invalid())?;
            Ok(SettingsPatch::new().stop_others_on_play(flag))
        }
        KEY_WAVEFORM_TYPE => {
            let waveform = WaveformType::parse(value).ok_or_else(invalid)?;
            Ok(SettingsPatch::new().waveform_type(waveform))
        }
        KEY_SAMPLE_POINTS => {
            let points = value
                .parse::<u32>()
                .ok()
                .and_then(|n| SamplePoints::try_from(n).ok())
                .ok_or_else(invalid)?;
            Ok(SettingsPatch::new().sample_points(points))
        }
        _ => Err(CoreError::UnknownSetting(key.to_string())),
    }
}
