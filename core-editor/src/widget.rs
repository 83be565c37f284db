//! # Audio Player Widget
//!
//! One player block in the editor. The anchor is created up front and left
//! empty; the player itself is rendered later from a low-priority scheduler
//! callback so that building decorations never waits on the component.
//!
//! ```text
//!  create ──> PendingMount ──(idle)──> Mounted
//!                 │                       │
//!                 └───────── unmount ─────┴──> Unmounted
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use bridge_traits::player::{PlayerComponent, PlayerProps, RenderedPlayer};
use bridge_traits::scheduler::{TaskId, TaskScheduler};
use bridge_traits::ui::{AnchorFactory, WidgetAnchor};
use core_links::{AudioReference, ResourceResolver};
use core_playback::PlaybackCoordinator;
use core_runtime::events::{CoreEvent, EventBus, WidgetEvent};
use core_runtime::scheduler::defer_low_priority;
use core_runtime::settings::SettingsSnapshot;
use parking_lot::Mutex;
use tracing::{debug, error, warn};

/// Prefix of editor widget ids (`audio-player-0`, `audio-player-1`, ...).
pub const WIDGET_ID_PREFIX: &str = "audio-player";

/// Allocates unique widget ids for one plugin context.
#[derive(Debug)]
pub struct WidgetIds {
    prefix: String,
    next: AtomicU64,
}

impl WidgetIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(0),
        }
    }

    pub fn next_id(&self) -> String {
        format!("{}-{}", self.prefix, self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for WidgetIds {
    fn default() -> Self {
        Self::new(WIDGET_ID_PREFIX)
    }
}

/// Host capabilities and shared registries a widget needs.
#[derive(Clone)]
pub struct WidgetContext {
    pub resolver: Arc<ResourceResolver>,
    pub component: Arc<dyn PlayerComponent>,
    pub anchors: Arc<dyn AnchorFactory>,
    pub scheduler: Arc<dyn TaskScheduler>,
    pub coordinator: Arc<PlaybackCoordinator>,
    pub events: Option<EventBus>,
    pub ids: Arc<WidgetIds>,
}

impl WidgetContext {
    pub(crate) fn publish(&self, event: WidgetEvent) {
        if let Some(events) = &self.events {
            events.emit(CoreEvent::Widget(event)).ok();
        }
    }
}

impl std::fmt::Debug for WidgetContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetContext")
            .field("resolver", &self.resolver)
            .field("events", &self.events.is_some())
            .field("ids", &self.ids)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
    Unmounted,
    PendingMount,
    Mounted,
}

/// Result of a mount attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    Mounted,
    /// The widget was not waiting for a mount (already mounted or torn down).
    Skipped,
    /// The audio file could not be found; the anchor stays empty.
    Unresolved,
    /// The player component failed; the anchor was cleared.
    RenderFailed,
}

struct WidgetState {
    mount: MountState,
    pending_task: Option<TaskId>,
    rendered: Option<Box<dyn RenderedPlayer>>,
}

pub struct AudioPlayerWidget {
    id: String,
    source_path: String,
    title: String,
    source_note: Option<String>,
    snapshot: SettingsSnapshot,
    anchor: Arc<dyn WidgetAnchor>,
    ctx: WidgetContext,
    state: Mutex<WidgetState>,
}

impl AudioPlayerWidget {
    /// Create the widget and its empty anchor. Nothing is rendered until
    /// [`schedule_mount`](Self::schedule_mount) or [`mount`](Self::mount).
    pub fn new(
        ctx: WidgetContext,
        reference: &AudioReference,
        source_note: Option<String>,
        snapshot: SettingsSnapshot,
    ) -> Arc<Self> {
        let id = ctx.ids.next_id();
        let anchor = ctx.anchors.create_anchor(&id);

        Arc::new(Self {
            id,
            source_path: reference.source_path.clone(),
            title: reference.title.clone(),
            source_note,
            snapshot,
            anchor,
            ctx,
            state: Mutex::new(WidgetState {
                mount: MountState::Unmounted,
                pending_task: None,
                rendered: None,
            }),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Settings version the widget was built with.
    pub fn settings_version(&self) -> u64 {
        self.snapshot.version
    }

    pub fn anchor(&self) -> &Arc<dyn WidgetAnchor> {
        &self.anchor
    }

    pub fn mount_state(&self) -> MountState {
        self.state.lock().mount
    }

    /// Whether this widget can stand in for `reference` at settings `version`.
    pub fn matches(&self, reference: &AudioReference, version: u64) -> bool {
        self.source_path == reference.source_path
            && self.title == reference.title
            && self.snapshot.version == version
    }

    /// Queue the mount at the scheduler's lowest priority.
    pub fn schedule_mount(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            if state.mount != MountState::Unmounted {
                return;
            }
            state.mount = MountState::PendingMount;
        }

        let weak: Weak<Self> = Arc::downgrade(self);
        let task = Box::new(move || {
            if let Some(widget) = weak.upgrade() {
                widget.mount();
            }
        });

        match defer_low_priority(self.ctx.scheduler.as_ref(), task) {
            Ok(task_id) => {
                let mut state = self.state.lock();
                // The task may already have run on a threaded scheduler.
                if state.mount == MountState::PendingMount {
                    state.pending_task = Some(task_id);
                }
            }
            Err(e) => {
                warn!(widget_id = %self.id, error = %e, "Could not defer mount; mounting now");
                self.mount();
            }
        }
    }

    /// Resolve the file and render the player into the anchor.
    ///
    /// Only acts on a widget waiting for its mount.
    pub fn mount(&self) -> MountOutcome {
        {
            let mut state = self.state.lock();
            if state.mount != MountState::PendingMount {
                return MountOutcome::Skipped;
            }
            state.pending_task = None;
        }

        let resolved = match self
            .ctx
            .resolver
            .resolve(&self.source_path, self.source_note.as_deref())
        {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(widget_id = %self.id, src = %self.source_path, error = %e, "Audio file not found");
                self.state.lock().mount = MountState::Unmounted;
                self.ctx.publish(WidgetEvent::ResolutionFailed {
                    widget_id: self.id.clone(),
                    source_path: self.source_path.clone(),
                });
                return MountOutcome::Unresolved;
            }
        };

        let settings = self.snapshot.settings;
        let props = PlayerProps::new(
            self.id.clone(),
            resolved.url.clone(),
            resolved.display_title(&self.title),
            settings.waveform_type,
            settings.sample_points,
        );

        let rendered =
            match self
                .ctx
                .component
                .render(self.anchor.as_ref(), props, self.ctx.coordinator.notifier())
            {
                Ok(rendered) => rendered,
                Err(e) => {
                    error!(widget_id = %self.id, error = %e, "Failed to mount player");
                    self.anchor.clear();
                    self.state.lock().mount = MountState::Unmounted;
                    self.ctx.publish(WidgetEvent::RenderFailed {
                        widget_id: self.id.clone(),
                        message: e.to_string(),
                    });
                    return MountOutcome::RenderFailed;
                }
            };

        let orphan = {
            let mut state = self.state.lock();
            if state.mount == MountState::PendingMount {
                state.mount = MountState::Mounted;
                state.rendered = Some(rendered);
                None
            } else {
                Some(rendered)
            }
        };

        if let Some(mut rendered) = orphan {
            // Torn down while the component was rendering.
            if let Err(e) = rendered.unmount() {
                error!(widget_id = %self.id, error = %e, "Failed to unmount player");
            }
            self.anchor.clear();
            return MountOutcome::Skipped;
        }

        debug!(widget_id = %self.id, path = %resolved.file.path, "Player mounted");
        self.ctx.publish(WidgetEvent::Mounted {
            widget_id: self.id.clone(),
            source_path: self.source_path.clone(),
        });
        MountOutcome::Mounted
    }

    /// Release the player, clear the anchor and cancel a pending mount.
    ///
    /// Idempotent: returns `false` when there was nothing to tear down.
    pub fn unmount(&self) -> bool {
        let (previous, pending, rendered) = {
            let mut state = self.state.lock();
            let previous = state.mount;
            state.mount = MountState::Unmounted;
            (previous, state.pending_task.take(), state.rendered.take())
        };

        if previous == MountState::Unmounted && pending.is_none() && rendered.is_none() {
            return false;
        }

        if let Some(task_id) = pending {
            self.ctx.scheduler.cancel(task_id);
        }

        if let Some(mut rendered) = rendered {
            if let Err(e) = rendered.unmount() {
                error!(widget_id = %self.id, error = %e, "Failed to unmount player");
                self.ctx.publish(WidgetEvent::TeardownFailed {
                    widget_id: self.id.clone(),
                    message: e.to_string(),
                });
            }
        }

        self.anchor.clear();
        self.ctx.coordinator.forget(&self.id);

        debug!(widget_id = %self.id, "Widget unmounted");
        self.ctx.publish(WidgetEvent::Unmounted {
            widget_id: self.id.clone(),
        });
        true
    }
}

impl Drop for AudioPlayerWidget {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(task_id) = state.pending_task.take() {
            self.ctx.scheduler.cancel(task_id);
        }
        if let Some(mut rendered) = state.rendered.take() {
            if let Err(e) = rendered.unmount() {
                error!(widget_id = %self.id, error = %e, "Failed to unmount dropped player");
            }
        }
    }
}

impl std::fmt::Debug for AudioPlayerWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioPlayerWidget")
            .field("id", &self.id)
            .field("source_path", &self.source_path)
            .field("title", &self.title)
            .field("settings_version", &self.snapshot.version)
            .field("mount", &self.mount_state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_host::TestHost;
    use bridge_traits::player::{SamplePoints, WaveformType};
    use core_links::LinkScanner;

    fn reference(line: &str) -> AudioReference {
        LinkScanner::new().unwrap().scan_line(line, 0).remove(0)
    }

    #[test]
    fn test_ids_are_sequential() {
        let ids = WidgetIds::default();
        assert_eq!(ids.next_id(), "audio-player-0");
        assert_eq!(ids.next_id(), "audio-player-1");
    }

    #[test]
    fn test_deferred_mount_renders_props() {
        let host = TestHost::new(&["sounds/a.mp3"]);
        let widget = host.widget(&reference("![demo](sounds/a.mp3)"));

        assert!(widget.anchor().is_empty());
        widget.schedule_mount();
        assert_eq!(widget.mount_state(), MountState::PendingMount);
        assert!(widget.anchor().is_empty());

        host.scheduler.run_until_stalled();
        assert_eq!(widget.mount_state(), MountState::Mounted);

        let props = host.dom.rendered(widget.id()).unwrap();
        assert_eq!(props.key, widget.id());
        assert_eq!(props.class_name, "wa-obsidian-player");
        assert_eq!(props.src, "app://local/sounds/a.mp3");
        assert_eq!(props.title, "demo");
        assert_eq!(props.waveform_type, WaveformType::Mirror);
        assert_eq!(props.sample_points, SamplePoints::P200);
        assert_eq!(props.styles.controls_width, "156px");
    }

    #[test]
    fn test_title_falls_back_to_basename() {
        let host = TestHost::new(&["clips/take 2.wav"]);
        let widget = host.widget(&reference("![](clips/take%202.wav)"));

        widget.schedule_mount();
        host.scheduler.run_until_stalled();

        let props = host.dom.rendered(widget.id()).unwrap();
        assert_eq!(props.title, "take 2");
        assert_eq!(props.src, "app://local/clips/take 2.wav");
    }

    #[test]
    fn test_mount_without_idle_uses_zero_timer() {
        let host = TestHost::without_idle(&["a.mp3"]);
        let widget = host.widget(&reference("![a](a.mp3)"));

        widget.schedule_mount();
        assert_eq!(host.scheduler.pending_timers(), 1);
        host.scheduler.run_until_stalled();
        assert_eq!(widget.mount_state(), MountState::Mounted);
    }

    #[test]
    fn test_unresolved_leaves_anchor_empty() {
        let host = TestHost::new(&[]);
        let mut events = host.events();
        let widget = host.widget(&reference("![x](missing.mp3)"));

        widget.schedule_mount();
        host.scheduler.run_until_stalled();

        assert_eq!(widget.mount_state(), MountState::Unmounted);
        assert!(widget.anchor().is_empty());
        assert_eq!(host.component.render_count(), 0);

        let failures: Vec<_> = events
            .drain()
            .into_iter()
            .filter(|e| matches!(e, CoreEvent::Widget(WidgetEvent::ResolutionFailed { .. })))
            .collect();
        assert_eq!(failures.len(), 1);
    }

    #[test]
    fn test_render_failure_is_contained() {
        let host = TestHost::new(&["a.mp3"]);
        host.component.fail_renders(true);
        let widget = host.widget(&reference("![a](a.mp3)"));

        widget.schedule_mount();
        host.scheduler.run_until_stalled();

        assert_eq!(widget.mount_state(), MountState::Unmounted);
        assert!(widget.anchor().is_empty());
    }

    #[test]
    fn test_unmount_before_mount_cancels_task() {
        let host = TestHost::new(&["a.mp3"]);
        let widget = host.widget(&reference("![a](a.mp3)"));

        widget.schedule_mount();
        assert_eq!(host.scheduler.pending_count(), 1);
        assert!(widget.unmount());
        assert_eq!(host.scheduler.pending_count(), 0);

        host.scheduler.run_until_stalled();
        assert_eq!(host.component.render_count(), 0);
        assert_eq!(widget.mount(), MountOutcome::Skipped);
    }

    #[test]
    fn test_unmount_is_idempotent() {
        let host = TestHost::new(&["a.mp3"]);
        let widget = host.widget(&reference("![a](a.mp3)"));
        widget.schedule_mount();
        host.scheduler.run_until_stalled();

        assert!(widget.unmount());
        assert!(!widget.unmount());
        assert_eq!(host.component.unmount_count(), 1);
        assert!(widget.anchor().is_empty());
        assert_eq!(widget.mount_state(), MountState::Unmounted);
    }

    #[test]
    fn test_teardown_failure_forces_unmounted() {
        let host = TestHost::new(&["a.mp3"]);
        let widget = host.widget(&reference("![a](a.mp3)"));
        widget.schedule_mount();
        host.scheduler.run_until_stalled();

        host.component.fail_unmounts(true);
        assert!(widget.unmount());
        assert_eq!(widget.mount_state(), MountState::Unmounted);
        assert!(widget.anchor().is_empty());
    }

    #[test]
    fn test_unmount_forgets_playing_instance() {
        let host = TestHost::new(&["a.mp3"]);
        let widget = host.widget(&reference("![a](a.mp3)"));
        widget.schedule_mount();
        host.scheduler.run_until_stalled();

        host.component
            .trigger(widget.id(), bridge_traits::player::PlayerEventKind::Play);
        assert!(host.coordinator.is_playing(widget.id()));

        widget.unmount();
        assert!(!host.coordinator.is_playing(widget.id()));
    }

    #[test]
    fn test_matches_requires_same_version() {
        let host = TestHost::new(&[]);
        let r = reference("![a](a.mp3)");
        let widget = host.widget(&r);
        let version = widget.settings_version();

        assert!(widget.matches(&r, version));
        assert!(!widget.matches(&r, version + 1));
        assert!(!widget.matches(&reference("![b](a.mp3)"), version));
        assert!(!widget.matches(&reference("![a](b.mp3)"), version));
    }
}
