//! Coordinator behaviour as seen through the player sink and the event bus.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::player::{PlayerEventKind, PlayerEventSink, PlayerHandle};
use core_playback::{PlaybackCoordinator, PlaybackNotifier};
use core_runtime::events::{CoreEvent, EventBus, EventStream, PlaybackEvent};
use core_runtime::settings::SettingsRegistry;

/// Player that reports its own pause back through the sink, the way real
/// components do from inside `pause()`.
struct EchoPlayer {
    id: String,
    sink: OnceLock<Arc<PlaybackNotifier>>,
    me: OnceLock<std::sync::Weak<EchoPlayer>>,
    pauses: AtomicUsize,
    stops: AtomicUsize,
}

impl EchoPlayer {
    fn new(id: &str, sink: Arc<PlaybackNotifier>) -> Arc<Self> {
        let player = Arc::new(Self {
            id: id.to_string(),
            sink: OnceLock::new(),
            me: OnceLock::new(),
            pauses: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        });
        player.sink.set(sink).ok();
        player.me.set(Arc::downgrade(&player)).ok();
        player
    }

    fn play(self: &Arc<Self>) {
        if let Some(sink) = self.sink.get() {
            sink.emit(PlayerEventKind::Play, self.clone());
        }
    }
}

impl PlayerHandle for EchoPlayer {
    fn id(&self) -> &str {
        &self.id
    }

    fn pause(&self) -> BridgeResult<()> {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        if let (Some(sink), Some(me)) = (self.sink.get(), self.me.get().and_then(|w| w.upgrade())) {
            sink.emit(PlayerEventKind::Pause, me);
        }
        Ok(())
    }

    fn stop(&self) -> BridgeResult<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Player whose controls always fail, as when its view was already detached.
struct DetachedPlayer {
    stops: AtomicUsize,
}

impl PlayerHandle for DetachedPlayer {
    fn id(&self) -> &str {
        "broken"
    }

    fn pause(&self) -> BridgeResult<()> {
        Err(BridgeError::OperationFailed("detached".to_string()))
    }

    fn stop(&self) -> BridgeResult<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Err(BridgeError::OperationFailed("detached".to_string()))
    }
}

fn setup() -> (Arc<PlaybackCoordinator>, EventStream) {
    let bus = EventBus::new(64);
    let stream = EventStream::new(bus.subscribe())
        .filter(|event| matches!(event, CoreEvent::Playback(_)));
    let coordinator = Arc::new(
        PlaybackCoordinator::new(Arc::new(SettingsRegistry::new())).with_event_bus(bus),
    );
    (coordinator, stream)
}

#[test]
fn test_reentrant_pause_is_drained_in_same_turn() {
    let (coordinator, mut events) = setup();
    let a = EchoPlayer::new("audio-player-0", coordinator.notifier());
    let b = EchoPlayer::new("audio-player-1", coordinator.notifier());

    a.play();
    b.play();

    assert_eq!(a.pauses.load(Ordering::SeqCst), 1);
    assert_eq!(coordinator.playing_ids(), vec!["audio-player-1".to_string()]);

    let received: Vec<PlaybackEvent> = events
        .drain()
        .into_iter()
        .filter_map(|event| match event {
            CoreEvent::Playback(e) => Some(e),
            _ => None,
        })
        .collect();

    assert_eq!(
        received,
        vec![
            PlaybackEvent::Started {
                instance_id: "audio-player-0".to_string()
            },
            PlaybackEvent::PauseRequested {
                instance_id: "audio-player-0".to_string(),
                superseded_by: "audio-player-1".to_string(),
            },
            PlaybackEvent::Started {
                instance_id: "audio-player-1".to_string()
            },
            PlaybackEvent::Paused {
                instance_id: "audio-player-0".to_string()
            },
        ]
    );
}

#[test]
fn test_three_players_only_last_remains() {
    let (coordinator, _events) = setup();
    let players: Vec<_> = (0..3)
        .map(|n| EchoPlayer::new(&format!("audio-player-{}", n), coordinator.notifier()))
        .collect();

    for player in &players {
        player.play();
    }

    assert_eq!(players[0].pauses.load(Ordering::SeqCst), 1);
    assert_eq!(players[1].pauses.load(Ordering::SeqCst), 1);
    assert_eq!(players[2].pauses.load(Ordering::SeqCst), 0);
    assert_eq!(coordinator.playing_count(), 1);
}

#[test]
fn test_stop_all_signals_every_player() {
    let settings = Arc::new(SettingsRegistry::new());
    settings.apply(core_runtime::settings::SettingsPatch::new().stop_others_on_play(false));
    let bus = EventBus::new(16);
    let mut events = EventStream::new(bus.subscribe());
    let coordinator = Arc::new(PlaybackCoordinator::new(settings).with_event_bus(bus));

    let a = EchoPlayer::new("a", coordinator.notifier());
    let b = EchoPlayer::new("b", coordinator.notifier());
    a.play();
    b.play();

    assert_eq!(coordinator.stop_all(), 2);
    assert_eq!(a.stops.load(Ordering::SeqCst), 1);
    assert_eq!(b.stops.load(Ordering::SeqCst), 1);
    assert_eq!(coordinator.playing_count(), 0);

    let last = events.drain().pop().unwrap();
    assert_eq!(last, CoreEvent::Playback(PlaybackEvent::AllStopped { count: 2 }));
}

#[test]
fn test_failing_player_controls_are_contained() {
    let (coordinator, _events) = setup();

    let failing = Arc::new(DetachedPlayer {
        stops: AtomicUsize::new(0),
    });
    let healthy = EchoPlayer::new("ok", coordinator.notifier());

    coordinator
        .notify(PlayerEventKind::Play, failing.clone())
        .unwrap();
    // Pausing the detached player fails; it is unregistered regardless.
    healthy.play();
    assert_eq!(coordinator.playing_ids(), vec!["ok".to_string()]);

    coordinator.notify(PlayerEventKind::Play, failing.clone()).unwrap();
    assert_eq!(coordinator.stop_all(), 1);
    assert_eq!(failing.stops.load(Ordering::SeqCst), 1);
    assert_eq!(coordinator.playing_count(), 0);
}

#[test]
fn test_forget_publishes_event() {
    let (coordinator, mut events) = setup();
    let a = EchoPlayer::new("a", coordinator.notifier());
    a.play();
    events.drain();

    assert!(coordinator.forget("a"));
    assert_eq!(
        events.drain(),
        vec![CoreEvent::Playback(PlaybackEvent::Forgotten {
            instance_id: "a".to_string()
        })]
    );
    assert_eq!(a.pauses.load(Ordering::SeqCst), 0);
}
