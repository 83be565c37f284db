//! # Playback Coordination Module
//!
//! Keeps track of which waveform players are playing and enforces the
//! "stop other players on play" setting.
//!
//! ## Overview
//!
//! Players report play, pause and end through a [`PlaybackNotifier`]. Each
//! notification goes through a channel and is handled before `emit` returns,
//! so a newly started player finds every other player already paused.
//! Notifications raised while one is being handled (a paused player
//! reporting its pause) are queued and handled by the same drain loop.

pub mod coordinator;
pub mod error;

pub use coordinator::{PlaybackCoordinator, PlaybackNotifier};
pub use error::{PlaybackError, Result};
