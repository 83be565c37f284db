//! Widget Anchor Abstractions
//!
//! An anchor is the host UI container created for one player. It exists
//! independently of whether a player is currently rendered inside it.

use std::sync::Arc;

use crate::platform::PlatformSendSync;

/// Class of the outer container element.
pub const CONTAINER_CLASS: &str = "waveform-player-widget-container";

/// Class of the inner element the player renders into.
pub const PLAYER_CLASS: &str = "waveform-player-widget";

/// Name of the data attribute carrying the player id.
pub const PLAYER_ID_ATTRIBUTE: &str = "playerId";

/// Host UI container for a player.
pub trait WidgetAnchor: PlatformSendSync {
    /// Player id stored in the container's data attribute.
    fn id(&self) -> &str;

    /// Remove everything rendered inside the container.
    fn clear(&self);

    /// Whether the container currently has no rendered content.
    fn is_empty(&self) -> bool;
}

/// Creates anchors.
///
/// Implementations build the outer container with [`CONTAINER_CLASS`] and
/// the [`PLAYER_ID_ATTRIBUTE`] data attribute, plus an inner element with
/// [`PLAYER_CLASS`].
pub trait AnchorFactory: PlatformSendSync {
    fn create_anchor(&self, player_id: &str) -> Arc<dyn WidgetAnchor>;
}
