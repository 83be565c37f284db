//! # Playback Error Types

use thiserror::Error;

/// Errors that can occur while coordinating players.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The coordinator owning the notification channel is gone.
    #[error("Playback coordinator is no longer available")]
    CoordinatorGone,

    /// The notification channel was closed.
    #[error("Notification channel closed: {0}")]
    ChannelClosed(String),

    /// A player rejected a pause or stop request.
    #[error("Player {instance_id} failed to {action}: {source}")]
    PlayerControl {
        instance_id: String,
        action: &'static str,
        #[source]
        source: bridge_traits::error::BridgeError,
    },
}

impl PlaybackError {
    /// Returns `true` if the error came from a player rather than the coordinator.
    pub fn is_player_error(&self) -> bool {
        matches!(self, PlaybackError::PlayerControl { .. })
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
