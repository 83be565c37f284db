//! # Event Bus System
//!
//! Provides an event-driven architecture for the waveform player core using
//! `tokio::sync::broadcast`. Core modules report what happened (settings
//! changes, widget mounts and failures, playback transitions) without knowing
//! who is listening.
//!
//! [`CoreEvent`] groups events by the component that raised them.
//! [`EventBus`] is the sending side; [`EventStream`] wraps a receiver with an
//! optional filter.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐   emit    ┌───────────┐
//! │ Settings Registry├──────────>│           │
//! └──────────────────┘           │           │
//!                                │ EventBus  │
//! ┌──────────────────┐   emit    │ (broadcast│   subscribe   ┌────────────┐
//! │ Widget Lifecycle ├──────────>│  channel) ├──────────────>│ Subscriber │
//! └──────────────────┘           │           │               └────────────┘
//!                                │           │
//! ┌──────────────────┐   emit    │           │
//! │ Playback Coord.  ├──────────>│           │
//! └──────────────────┘           └───────────┘
//! ```
//!
//! ## Usage
//!
//! ### Publishing Events
//!
//! ```rust
//! use core_runtime::events::{EventBus, CoreEvent, WidgetEvent};
//!
//! let bus = EventBus::new(100);
//! let event = CoreEvent::Widget(WidgetEvent::Mounted {
//!     widget_id: "audio-player-1".to_string(),
//!     source_path: "sounds/a.mp3".to_string(),
//! });
//!
//! // Emitting without subscribers is not an error worth handling.
//! bus.emit(event).ok();
//! ```
//!
//! ### Filtering Events
//!
//! ```rust
//! use core_runtime::events::{EventBus, EventStream, CoreEvent};
//!
//! let bus = EventBus::new(100);
//! let playback_only = EventStream::new(bus.subscribe())
//!     .filter(|event| matches!(event, CoreEvent::Playback(_)));
//! ```
//!
//! ## Error Handling
//!
//! - `RecvError::Lagged(n)`: the receiver missed `n` events and keeps going.
//! - `RecvError::Closed`: the plugin instance is gone.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Capacity used by [`EventBus::default`].
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Everything the core reports, grouped by source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Settings registry events
    Settings(SettingsEvent),
    /// Editor and reading-view widget events
    Widget(WidgetEvent),
    /// Playback coordination events
    Playback(PlaybackEvent),
}

impl CoreEvent {
    /// Short label for logs.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Settings(e) => e.description(),
            CoreEvent::Widget(e) => e.description(),
            CoreEvent::Playback(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Settings(SettingsEvent::SaveFailed { .. }) => EventSeverity::Error,
            CoreEvent::Widget(WidgetEvent::RenderFailed { .. }) => EventSeverity::Error,
            CoreEvent::Widget(WidgetEvent::TeardownFailed { .. }) => EventSeverity::Error,
            CoreEvent::Widget(WidgetEvent::ResolutionFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Settings(SettingsEvent::Loaded { .. }) => EventSeverity::Info,
            CoreEvent::Settings(SettingsEvent::Changed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// How loudly a host should surface an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Settings Events
// ============================================================================

/// Events related to the settings registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SettingsEvent {
    /// Persisted settings were merged over the defaults.
    Loaded {
        /// Version after loading.
        version: u64,
        /// Fields that fell back to their default because they were missing
        /// or invalid.
        defaulted_fields: Vec<String>,
    },
    /// An in-memory update was applied.
    Changed {
        /// Version after the update.
        version: u64,
        /// camelCase names of the fields the patch carried.
        changed_fields: Vec<String>,
    },
    /// Settings were written to the store.
    Saved {
        version: u64,
    },
    /// Writing settings to the store failed.
    SaveFailed {
        version: u64,
        message: String,
    },
}

impl SettingsEvent {
    fn description(&self) -> &str {
        match self {
            SettingsEvent::Loaded { .. } => "Settings loaded",
            SettingsEvent::Changed { .. } => "Settings changed",
            SettingsEvent::Saved { .. } => "Settings saved",
            SettingsEvent::SaveFailed { .. } => "Settings save failed",
        }
    }
}

// ============================================================================
// Widget Events
// ============================================================================

/// Events related to player widgets in the editor and reading view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum WidgetEvent {
    /// A player was rendered into its anchor.
    Mounted {
        widget_id: String,
        source_path: String,
    },
    /// A widget was torn down.
    Unmounted {
        widget_id: String,
    },
    /// The referenced audio file could not be found in the vault.
    ResolutionFailed {
        widget_id: String,
        source_path: String,
    },
    /// The player component failed to render.
    RenderFailed {
        widget_id: String,
        message: String,
    },
    /// The player component failed to unmount cleanly.
    TeardownFailed {
        widget_id: String,
        message: String,
    },
    /// An editor decoration set was rebuilt.
    DecorationsRebuilt {
        reused: usize,
        created: usize,
        destroyed: usize,
    },
}

impl WidgetEvent {
    fn description(&self) -> &str {
        match self {
            WidgetEvent::Mounted { .. } => "Player mounted",
            WidgetEvent::Unmounted { .. } => "Player unmounted",
            WidgetEvent::ResolutionFailed { .. } => "Audio file not found",
            WidgetEvent::RenderFailed { .. } => "Player render failed",
            WidgetEvent::TeardownFailed { .. } => "Player teardown failed",
            WidgetEvent::DecorationsRebuilt { .. } => "Decorations rebuilt",
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events related to playback coordination between players.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A player started playing.
    Started {
        instance_id: String,
    },
    /// A player paused.
    Paused {
        instance_id: String,
    },
    /// A player reached the end of its file.
    Ended {
        instance_id: String,
    },
    /// The coordinator paused a player because another one started.
    PauseRequested {
        instance_id: String,
        superseded_by: String,
    },
    /// A player left the registry because its widget was torn down.
    Forgotten {
        instance_id: String,
    },
    /// Every registered player was stopped.
    AllStopped {
        count: usize,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Ended { .. } => "Playback ended",
            PlaybackEvent::PauseRequested { .. } => "Pausing superseded player",
            PlaybackEvent::Forgotten { .. } => "Player forgotten",
            PlaybackEvent::AllStopped { .. } => "All players stopped",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast channel shared by every component of one plugin instance.
///
/// Clones publish into the same channel. Each [`subscribe`](Self::subscribe)
/// call gets its own receiver that only sees events sent after it was
/// created; a receiver that falls more than `capacity` events behind gets
/// `RecvError::Lagged`.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let bus = EventBus::new(64);
    /// let _rx = bus.subscribe();
    /// assert_eq!(bus.subscriber_count(), 1);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to the current subscribers. Fails only when nobody is
    /// subscribed, which callers usually ignore with `.ok()`.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A subscription with an optional predicate.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Keep only events matching `predicate`; everything else is skipped
    /// silently.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        match &self.filter {
            Some(predicate) => predicate(event),
            None => true,
        }
    }

    /// Wait for the next matching event.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Next matching event already buffered, if any.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        use broadcast::error::TryRecvError;

        loop {
            let event = match self.receiver.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Lagged(missed)) => return Some(Err(RecvError::Lagged(missed))),
                Err(TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            };
            if self.accepts(&event) {
                return Some(Ok(event));
            }
        }
    }

    /// Every matching event currently buffered. Lag is skipped over.
    pub fn drain(&mut self) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        while let Some(result) = self.try_recv() {
            match result {
                Ok(event) => events.push(event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        events
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
