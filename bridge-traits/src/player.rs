//! Waveform Player Component Abstractions
//!
//! The waveform player itself (decoding, peak extraction, drawing, audio
//! output) is a host capability. The core hands it a closed set of props and
//! an anchor to render into, and receives play/pause/end notifications back
//! through a [`PlayerEventSink`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    error::{BridgeError, Result},
    platform::PlatformSendSync,
    ui::WidgetAnchor,
};

/// Visual style of the rendered waveform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveformType {
    Bars,
    Envelope,
    Line,
    #[default]
    Mirror,
    Wave,
}

impl WaveformType {
    pub const ALL: [WaveformType; 5] = [
        WaveformType::Bars,
        WaveformType::Envelope,
        WaveformType::Line,
        WaveformType::Mirror,
        WaveformType::Wave,
    ];

    /// Identifier used in persisted settings and by the player component.
    pub fn as_str(&self) -> &'static str {
        match self {
            WaveformType::Bars => "bars",
            WaveformType::Envelope => "envelope",
            WaveformType::Line => "line",
            WaveformType::Mirror => "mirror",
            WaveformType::Wave => "wave",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

impl fmt::Display for WaveformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of points sampled from the audio to draw the waveform.
///
/// Serialized as the plain integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SamplePoints {
    P50,
    P100,
    #[default]
    P200,
    P500,
    P1000,
    P2000,
    P5000,
}

impl SamplePoints {
    pub const ALL: [SamplePoints; 7] = [
        SamplePoints::P50,
        SamplePoints::P100,
        SamplePoints::P200,
        SamplePoints::P500,
        SamplePoints::P1000,
        SamplePoints::P2000,
        SamplePoints::P5000,
    ];

    pub fn value(&self) -> u32 {
        match self {
            SamplePoints::P50 => 50,
            SamplePoints::P100 => 100,
            SamplePoints::P200 => 200,
            SamplePoints::P500 => 500,
            SamplePoints::P1000 => 1000,
            SamplePoints::P2000 => 2000,
            SamplePoints::P5000 => 5000,
        }
    }
}

impl TryFrom<u32> for SamplePoints {
    type Error = BridgeError;

    fn try_from(value: u32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.value() == value)
            .ok_or_else(|| {
                BridgeError::OperationFailed(format!(
                    "unsupported sample point count {}, expected one of 50, 100, 200, 500, 1000, 2000, 5000",
                    value
                ))
            })
    }
}

impl From<SamplePoints> for u32 {
    fn from(points: SamplePoints) -> Self {
        points.value()
    }
}

impl fmt::Display for SamplePoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Style overrides applied to the player's sub-elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStyles {
    pub controls_padding_bottom: String,
    pub controls_width: String,
    pub root_padding: String,
    pub title_font_size: String,
    pub title_margin: String,
    pub waveform_height: String,
}

impl Default for PlayerStyles {
    fn default() -> Self {
        Self {
            controls_padding_bottom: "0".to_string(),
            controls_width: "156px".to_string(),
            root_padding: "0.5em".to_string(),
            title_font_size: "14px".to_string(),
            title_margin: "0".to_string(),
            waveform_height: "100px".to_string(),
        }
    }
}

/// Everything the player component needs to render one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProps {
    pub class_name: String,
    /// Stable key, equal to the owning widget id.
    pub key: String,
    /// Decoded resource URL.
    pub src: String,
    pub title: String,
    pub waveform_type: WaveformType,
    pub sample_points: SamplePoints,
    pub styles: PlayerStyles,
}

impl PlayerProps {
    pub const CLASS_NAME: &'static str = "wa-obsidian-player";

    pub fn new(
        key: impl Into<String>,
        src: impl Into<String>,
        title: impl Into<String>,
        waveform_type: WaveformType,
        sample_points: SamplePoints,
    ) -> Self {
        Self {
            class_name: Self::CLASS_NAME.to_string(),
            key: key.into(),
            src: src.into(),
            title: title.into(),
            waveform_type,
            sample_points,
            styles: PlayerStyles::default(),
        }
    }
}

/// Playback notification kinds emitted by a rendered player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerEventKind {
    Play,
    Pause,
    Ended,
}

/// Control surface of one rendered player, used to pause or stop it from
/// the outside.
pub trait PlayerHandle: PlatformSendSync {
    /// Identifier of the owning widget or reading-view entry.
    fn id(&self) -> &str;

    /// Pause playback, keeping the position.
    fn pause(&self) -> Result<()>;

    /// Stop playback and rewind.
    fn stop(&self) -> Result<()>;
}

impl fmt::Debug for dyn PlayerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerHandle").field("id", &self.id()).finish()
    }
}

/// Receiver of playback notifications.
pub trait PlayerEventSink: PlatformSendSync {
    fn emit(&self, kind: PlayerEventKind, handle: Arc<dyn PlayerHandle>);
}

/// A player rendered into an anchor.
pub trait RenderedPlayer: PlatformSendSync {
    /// Release the rendered view. Called at most once by the core.
    fn unmount(&mut self) -> Result<()>;
}

/// Factory for rendered players.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::player::{PlayerComponent, PlayerProps};
///
/// fn show(component: &dyn PlayerComponent, anchor: &dyn WidgetAnchor, props: PlayerProps, sink: Arc<dyn PlayerEventSink>) -> Result<()> {
///     let mut rendered = component.render(anchor, props, sink)?;
///     // ... later
///     rendered.unmount()
/// }
/// ```
pub trait PlayerComponent: PlatformSendSync {
    fn render(
        &self,
        anchor: &dyn WidgetAnchor,
        props: PlayerProps,
        sink: Arc<dyn PlayerEventSink>,
    ) -> Result<Box<dyn RenderedPlayer>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waveform_type_serde_lowercase() {
        let json = serde_json::to_string(&WaveformType::Envelope).unwrap();
        assert_eq!(json, "\"envelope\"");

        let parsed: WaveformType = serde_json::from_str("\"wave\"").unwrap();
        assert_eq!(parsed, WaveformType::Wave);
        assert!(serde_json::from_str::<WaveformType>("\"spiral\"").is_err());
    }

    #[test]
    fn test_waveform_type_parse() {
        assert_eq!(WaveformType::parse("bars"), Some(WaveformType::Bars));
        assert_eq!(WaveformType::parse("Bars"), None);
        assert_eq!(WaveformType::default(), WaveformType::Mirror);
    }

    #[test]
    fn test_sample_points_serde_as_integer() {
        let json = serde_json::to_string(&SamplePoints::P1000).unwrap();
        assert_eq!(json, "1000");

        let parsed: SamplePoints = serde_json::from_str("500").unwrap();
        assert_eq!(parsed, SamplePoints::P500);
        assert!(serde_json::from_str::<SamplePoints>("300").is_err());
    }

    #[test]
    fn test_sample_points_try_from() {
        assert_eq!(SamplePoints::try_from(50).unwrap(), SamplePoints::P50);
        assert!(SamplePoints::try_from(0).is_err());
        assert_eq!(u32::from(SamplePoints::default()), 200);
    }

    #[test]
    fn test_player_props_defaults() {
        let props = PlayerProps::new(
            "audio-player-1",
            "app://vault/a.mp3",
            "demo",
            WaveformType::Mirror,
            SamplePoints::P200,
        );

        assert_eq!(props.class_name, "wa-obsidian-player");
        assert_eq!(props.key, "audio-player-1");
        assert_eq!(props.styles.controls_width, "156px");
        assert_eq!(props.styles.waveform_height, "100px");
        assert_eq!(props.styles.root_padding, "0.5em");
    }
}
