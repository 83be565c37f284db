//! # Playback Coordinator
//!
//! Registry of playing instances keyed by player id.
//!
//! With `stopOthersOnPlay` enabled at most one instance is registered at a
//! time: a play notification pauses and unregisters every other instance
//! before the new one is added.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use bridge_traits::player::{PlayerEventKind, PlayerEventSink, PlayerHandle};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use core_runtime::settings::SettingsRegistry;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::error::{PlaybackError, Result};

struct Notification {
    kind: PlayerEventKind,
    handle: Arc<dyn PlayerHandle>,
}

pub struct PlaybackCoordinator {
    registry: Mutex<HashMap<String, Arc<dyn PlayerHandle>>>,
    settings: Arc<SettingsRegistry>,
    events: Option<EventBus>,
    sender: mpsc::UnboundedSender<Notification>,
    // Whoever holds the receiver is the one draining.
    receiver: Mutex<mpsc::UnboundedReceiver<Notification>>,
    queued: AtomicUsize,
}

impl PlaybackCoordinator {
    pub fn new(settings: Arc<SettingsRegistry>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            registry: Mutex::new(HashMap::new()),
            settings,
            events: None,
            sender,
            receiver: Mutex::new(receiver),
            queued: AtomicUsize::new(0),
        }
    }

    /// Publish playback events on `events`.
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Sink handed to player components.
    pub fn notifier(self: &Arc<Self>) -> Arc<PlaybackNotifier> {
        Arc::new(PlaybackNotifier {
            coordinator: Arc::downgrade(self),
        })
    }

    /// Queue a notification and drain the queue.
    ///
    /// When called from inside a player callback the notification is only
    /// queued; the drain loop already running picks it up.
    pub fn notify(&self, kind: PlayerEventKind, handle: Arc<dyn PlayerHandle>) -> Result<()> {
        self.queued.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.sender.send(Notification { kind, handle }) {
            self.queued.fetch_sub(1, Ordering::SeqCst);
            return Err(PlaybackError::ChannelClosed(e.to_string()));
        }
        self.drain();
        Ok(())
    }

    fn drain(&self) {
        loop {
            let Some(mut receiver) = self.receiver.try_lock() else {
                trace!("Drain already in progress; notification queued");
                return;
            };

            while let Ok(notification) = receiver.try_recv() {
                self.queued.fetch_sub(1, Ordering::SeqCst);
                self.handle(notification);
            }
            drop(receiver);

            if self.queued.load(Ordering::SeqCst) == 0 {
                return;
            }
        }
    }

    fn handle(&self, notification: Notification) {
        let id = notification.handle.id().to_string();
        match notification.kind {
            PlayerEventKind::Play => self.on_play(id, notification.handle),
            PlayerEventKind::Pause => {
                self.unregister(&id);
                self.publish(PlaybackEvent::Paused { instance_id: id });
            }
            PlayerEventKind::Ended => {
                self.unregister(&id);
                self.publish(PlaybackEvent::Ended { instance_id: id });
            }
        }
    }

    fn on_play(&self, id: String, handle: Arc<dyn PlayerHandle>) {
        let stop_others = self.settings.snapshot().settings.stop_others_on_play;

        let superseded: Vec<(String, Arc<dyn PlayerHandle>)> = if stop_others {
            let mut registry = self.registry.lock();
            let others: Vec<String> = registry.keys().filter(|key| **key != id).cloned().collect();
            others
                .into_iter()
                .filter_map(|key| registry.remove(&key).map(|h| (key, h)))
                .collect()
        } else {
            Vec::new()
        };

        for (other_id, other) in superseded {
            debug!(instance_id = %other_id, superseded_by = %id, "Pausing superseded player");
            self.publish(PlaybackEvent::PauseRequested {
                instance_id: other_id.clone(),
                superseded_by: id.clone(),
            });
            if let Err(source) = other.pause() {
                let err = PlaybackError::PlayerControl {
                    instance_id: other_id,
                    action: "pause",
                    source,
                };
                warn!(error = %err, "Superseded player did not pause");
            }
        }

        self.registry.lock().insert(id.clone(), handle);
        debug!(instance_id = %id, "Player started");
        self.publish(PlaybackEvent::Started { instance_id: id });
    }

    fn unregister(&self, id: &str) -> bool {
        let removed = self.registry.lock().remove(id).is_some();
        if removed {
            trace!(instance_id = %id, "Unregistered player");
        }
        removed
    }

    /// Drop an instance without signalling it. Called when its widget is
    /// unmounted. Returns whether it was registered.
    pub fn forget(&self, id: &str) -> bool {
        let removed = self.unregister(id);
        if removed {
            self.publish(PlaybackEvent::Forgotten {
                instance_id: id.to_string(),
            });
        }
        removed
    }

    /// Send a stop to every registered instance and clear the registry.
    /// Returns how many instances were stopped.
    pub fn stop_all(&self) -> usize {
        let handles: Vec<(String, Arc<dyn PlayerHandle>)> =
            self.registry.lock().drain().collect();
        let count = handles.len();

        for (id, handle) in handles {
            if let Err(source) = handle.stop() {
                let err = PlaybackError::PlayerControl {
                    instance_id: id,
                    action: "stop",
                    source,
                };
                warn!(error = %err, "Player did not stop");
            }
        }

        debug!(count, "Stopped all players");
        self.publish(PlaybackEvent::AllStopped { count });
        count
    }

    pub fn is_playing(&self, id: &str) -> bool {
        self.registry.lock().contains_key(id)
    }

    /// Ids of registered instances, sorted.
    pub fn playing_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.registry.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn playing_count(&self) -> usize {
        self.registry.lock().len()
    }

    fn publish(&self, event: PlaybackEvent) {
        if let Some(events) = &self.events {
            events.emit(CoreEvent::Playback(event)).ok();
        }
    }
}

impl std::fmt::Debug for PlaybackCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackCoordinator")
            .field("playing", &self.playing_ids())
            .field("queued", &self.queued.load(Ordering::SeqCst))
            .finish()
    }
}

/// [`PlayerEventSink`] forwarding to a coordinator.
///
/// Holds a weak reference: notifications arriving after the coordinator is
/// dropped are discarded.
#[derive(Clone)]
pub struct PlaybackNotifier {
    coordinator: Weak<PlaybackCoordinator>,
}

impl PlaybackNotifier {
    pub fn try_notify(&self, kind: PlayerEventKind, handle: Arc<dyn PlayerHandle>) -> Result<()> {
        let coordinator = self
            .coordinator
            .upgrade()
            .ok_or(PlaybackError::CoordinatorGone)?;
        coordinator.notify(kind, handle)
    }
}

impl PlayerEventSink for PlaybackNotifier {
    fn emit(&self, kind: PlayerEventKind, handle: Arc<dyn PlayerHandle>) {
        let id = handle.id().to_string();
        if let Err(e) = self.try_notify(kind, handle) {
            debug!(instance_id = %id, error = %e, "Dropped player notification");
        }
    }
}

impl std::fmt::Debug for PlaybackNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackNotifier")
            .field("attached", &(self.coordinator.strong_count() > 0))
            .finish()
    }
}
