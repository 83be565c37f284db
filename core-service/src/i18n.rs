//! Localized strings for the settings panel.
//!
//! Two locales are bundled. Anything other than Chinese falls back to
//! English.

use bridge_traits::player::{SamplePoints, WaveformType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Locale {
    #[default]
    En,
    Zh,
}

impl Locale {
    /// Map a host locale tag (`"zh"`, `"zh-CN"`, `"en-US"`, ...) to a bundle.
    pub fn from_tag(tag: &str) -> Self {
        let language = tag
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match language.as_str() {
            "zh" => Locale::Zh,
            _ => Locale::En,
        }
    }

    pub fn strings(&self) -> &'static Strings {
        match self {
            Locale::En => &EN,
            Locale::Zh => &ZH,
        }
    }
}

/// Name and description of one setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingText {
    pub name: &'static str,
    pub description: &'static str,
}

/// All user-facing strings of one locale.
#[derive(Debug)]
pub struct Strings {
    pub stop_other_players: SettingText,
    pub waveform_type: SettingText,
    pub sample_points: SettingText,
    /// Labels in [`WaveformType::ALL`] order.
    waveform_labels: [&'static str; 5],
    /// Labels in [`SamplePoints::ALL`] order.
    sample_point_labels: [&'static str; 7],
}

impl Strings {
    pub fn waveform_label(&self, waveform: WaveformType) -> &'static str {
        let index = WaveformType::ALL
            .iter()
            .position(|w| *w == waveform)
            .unwrap_or_default();
        self.waveform_labels[index]
    }

    pub fn sample_points_label(&self, points: SamplePoints) -> &'static str {
        let index = SamplePoints::ALL
            .iter()
            .position(|p| *p == points)
            .unwrap_or_default();
        self.sample_point_labels[index]
    }
}

static EN: Strings = Strings {
    stop_other_players: SettingText {
        name: "Stop other players when playing",
        description: "Stop other players when playing a new audio file",
    },
    waveform_type: SettingText {
        name: "Waveform Type",
        description: "Choose the display style of the audio waveform",
    },
    sample_points: SettingText {
        name: "Sample points",
        description: "Set the number of sample points for the waveform. The higher the number, \
                      the more detailed the waveform, but the performance consumption is also higher.",
    },
    waveform_labels: ["Bars", "Envelope", "Line", "Mirror", "Wave"],
    sample_point_labels: [
        "50 (Lowest)",
        "100 (Low)",
        "200 (Default)",
        "500 (Medium)",
        "1000 (High)",
        "2000 (Very High)",
        "5000 (Extreme)",
    ],
};

static ZH: Strings = Strings {
    stop_other_players: SettingText {
        name: "播放时停止其他播放器",
        description: "播放新音频文件时停止其他播放器",
    },
    waveform_type: SettingText {
        name: "波形类型",
        description: "选择音频波形的显示样式",
    },
    sample_points: SettingText {
        name: "波形采样点数量",
        description: "设置波形图的采样点数量。数值越大，波形细节越丰富，但性能消耗也越大。",
    },
    waveform_labels: ["柱形", "包络", "单线条", "镜像", "波浪"],
    sample_point_labels: [
        "50 (最低)",
        "100 (低)",
        "200 (默认)",
        "500 (中)",
        "1000 (高)",
        "2000 (很高)",
        "5000 (极高)",
    ],
};
