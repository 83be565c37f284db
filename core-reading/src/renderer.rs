//! # Reading-Mode Renderer
//!
//! Post-processes rendered reading-view sections: every audio embed gets a
//! player container inserted right after it. Entries live as long as their
//! container stays in the view; the host reports removals through a
//! parent-scoped observer.
//!
//! Players follow the settings snapshot current at render time.
//! [`ReadingModeRenderer::refresh_all`] re-renders every entry in place
//! after a settings change.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use bridge_traits::player::{PlayerComponent, PlayerProps, RenderedPlayer};
use bridge_traits::reading::{EmbedElement, ObserverHandle, ReadingSection, RemovalSink};
use bridge_traits::ui::{AnchorFactory, WidgetAnchor};
use core_links::{LinkError, LinkScanner, ResourceResolver};
use core_playback::PlaybackCoordinator;
use core_runtime::events::{CoreEvent, EventBus, WidgetEvent};
use core_runtime::settings::{SettingsRegistry, SettingsSnapshot};
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::error::{ReadingError, Result};

/// Prefix of reading-view player ids.
pub const READING_ID_PREFIX: &str = "audio-player-reading";

/// Host capabilities and shared registries the renderer needs.
#[derive(Clone)]
pub struct ReadingContext {
    pub scanner: Arc<LinkScanner>,
    pub resolver: Arc<ResourceResolver>,
    pub component: Arc<dyn PlayerComponent>,
    pub anchors: Arc<dyn AnchorFactory>,
    pub coordinator: Arc<PlaybackCoordinator>,
    pub settings: Arc<SettingsRegistry>,
    pub events: Option<EventBus>,
}

/// What happened to one embed element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedOutcome {
    /// No `src`, or not an audio file.
    Ignored,
    /// Audio embed whose file is not in the vault.
    Unresolved,
    /// A player was rendered into a new container with this id.
    Rendered(String),
    /// The container was inserted but the player failed to render.
    RenderFailed(String),
}

/// Read-only view of a tracked entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub id: String,
    pub source_path: String,
    pub url: String,
    pub title: String,
    pub settings_version: u64,
    pub mounted: bool,
}

struct ReadingEntry {
    id: String,
    source_path: String,
    url: String,
    title: String,
    settings_version: u64,
    anchor: Arc<dyn WidgetAnchor>,
    rendered: Option<Box<dyn RenderedPlayer>>,
    observer: Option<Box<dyn ObserverHandle>>,
}

impl ReadingEntry {
    fn info(&self) -> EntryInfo {
        EntryInfo {
            id: self.id.clone(),
            source_path: self.source_path.clone(),
            url: self.url.clone(),
            title: self.title.clone(),
            settings_version: self.settings_version,
            mounted: self.rendered.is_some(),
        }
    }
}

struct RendererInner {
    ctx: ReadingContext,
    next_id: AtomicU64,
    entries: Mutex<Vec<ReadingEntry>>,
}

/// Tracks the players rendered into the reading view.
pub struct ReadingModeRenderer {
    inner: Arc<RendererInner>,
}

impl ReadingModeRenderer {
    pub fn new(ctx: ReadingContext) -> Self {
        Self {
            inner: Arc::new(RendererInner {
                ctx,
                next_id: AtomicU64::new(0),
                entries: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Handle every embed of a freshly rendered section.
    ///
    /// Host failures on one embed are logged and do not stop the others.
    /// Returns the ids of the containers inserted.
    pub fn process_section(&self, section: &dyn ReadingSection) -> Vec<String> {
        let source_note = section.source_path();
        let mut inserted = Vec::new();

        for embed in section.embeds() {
            match self.process_embed(embed.as_ref(), source_note.as_deref()) {
                Ok(EmbedOutcome::Rendered(id)) | Ok(EmbedOutcome::RenderFailed(id)) => {
                    inserted.push(id)
                }
                Ok(EmbedOutcome::Ignored) | Ok(EmbedOutcome::Unresolved) => {}
                Err(e) => warn!(error = %e, "Skipping audio embed"),
            }
        }

        inserted
    }

    /// Insert and render a player after one embed element.
    pub fn process_embed(
        &self,
        embed: &dyn EmbedElement,
        source_note: Option<&str>,
    ) -> Result<EmbedOutcome> {
        let inner = &self.inner;
        let ctx = &inner.ctx;

        let Some(src) = embed.src_attribute() else {
            return Ok(EmbedOutcome::Ignored);
        };
        if !ctx.scanner.is_audio_path(&src) {
            return Ok(EmbedOutcome::Ignored);
        }

        let resolved = match ctx.resolver.resolve(&src, source_note) {
            Ok(resolved) => resolved,
            Err(LinkError::NotFound(path)) => {
                debug!(src = %path, "Audio embed not found, skipping");
                return Ok(EmbedOutcome::Unresolved);
            }
            Err(e) => return Err(e.into()),
        };

        let id = format!(
            "{}-{}",
            READING_ID_PREFIX,
            inner.next_id.fetch_add(1, Ordering::Relaxed)
        );
        let anchor = ctx.anchors.create_anchor(&id);
        embed
            .insert_after(anchor.as_ref())
            .map_err(|source| ReadingError::Insert {
                container_id: id.clone(),
                source,
            })?;

        let snapshot = ctx.settings.snapshot();
        let mut entry = ReadingEntry {
            id: id.clone(),
            source_path: src.clone(),
            url: resolved.url.clone(),
            title: resolved.display_title(""),
            settings_version: snapshot.version,
            anchor,
            rendered: None,
            observer: None,
        };
        entry.rendered = inner.render(&entry, snapshot);
        let outcome = if entry.rendered.is_some() {
            EmbedOutcome::Rendered(id.clone())
        } else {
            EmbedOutcome::RenderFailed(id.clone())
        };

        // Tracked before observing: a host may report the removal from
        // inside `observe_removal` when the section is already detached.
        inner.entries.lock().push(entry);

        let sink: Arc<dyn RemovalSink> = Arc::new(RemovalHandler {
            renderer: Arc::downgrade(inner),
        });
        match embed.observe_removal(&id, sink) {
            Ok(observer) => {
                let orphan = {
                    let mut entries = inner.entries.lock();
                    match entries.iter_mut().find(|e| e.id == id) {
                        Some(entry) => {
                            entry.observer = Some(observer);
                            None
                        }
                        None => Some(observer),
                    }
                };
                if let Some(mut observer) = orphan {
                    debug!(id = %id, "Container removed while being observed");
                    observer.disconnect();
                }
                Ok(outcome)
            }
            Err(source) => {
                inner.remove(&id);
                Err(ReadingError::Observe {
                    container_id: id,
                    source,
                })
            }
        }
    }

    /// Handle the host reporting that a container left the view.
    pub fn container_removed(&self, container_id: &str) -> bool {
        self.inner.remove(container_id)
    }

    /// Re-render every entry with the current settings, keeping each
    /// container. Returns how many entries were refreshed.
    pub fn refresh_all(&self) -> usize {
        self.inner.refresh_all()
    }

    /// Tear down every entry. Returns how many there were.
    pub fn clear(&self) -> usize {
        let entries = std::mem::take(&mut *self.inner.entries.lock());
        let count = entries.len();
        for entry in entries {
            self.inner.teardown(entry);
        }
        if count > 0 {
            debug!(entries = count, "Reading view players cleared");
        }
        count
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.lock().is_empty()
    }

    /// Tracked entries in insertion order.
    pub fn entries(&self) -> Vec<EntryInfo> {
        self.inner.entries.lock().iter().map(ReadingEntry::info).collect()
    }
}

impl RendererInner {
    fn publish(&self, event: WidgetEvent) {
        if let Some(events) = &self.ctx.events {
            events.emit(CoreEvent::Widget(event)).ok();
        }
    }

    fn render(
        &self,
        entry: &ReadingEntry,
        snapshot: SettingsSnapshot,
    ) -> Option<Box<dyn RenderedPlayer>> {
        let settings = snapshot.settings;
        let props = PlayerProps::new(
            entry.id.clone(),
            entry.url.clone(),
            entry.title.clone(),
            settings.waveform_type,
            settings.sample_points,
        );

        match self
            .ctx
            .component
            .render(entry.anchor.as_ref(), props, self.ctx.coordinator.notifier())
        {
            Ok(rendered) => {
                debug!(id = %entry.id, src = %entry.source_path, "Reading player rendered");
                self.publish(WidgetEvent::Mounted {
                    widget_id: entry.id.clone(),
                    source_path: entry.source_path.clone(),
                });
                Some(rendered)
            }
            Err(e) => {
                error!(id = %entry.id, error = %e, "Failed to render reading player");
                entry.anchor.clear();
                self.publish(WidgetEvent::RenderFailed {
                    widget_id: entry.id.clone(),
                    message: e.to_string(),
                });
                None
            }
        }
    }

    fn unmount_player(&self, id: &str, rendered: Option<Box<dyn RenderedPlayer>>) {
        if let Some(mut rendered) = rendered {
            if let Err(e) = rendered.unmount() {
                error!(id = %id, error = %e, "Failed to unmount reading player");
                self.publish(WidgetEvent::TeardownFailed {
                    widget_id: id.to_string(),
                    message: e.to_string(),
                });
            }
        }
        self.ctx.coordinator.forget(id);
    }

    fn teardown(&self, mut entry: ReadingEntry) {
        if let Some(mut observer) = entry.observer.take() {
            observer.disconnect();
        }
        self.unmount_player(&entry.id, entry.rendered.take());
        entry.anchor.clear();
        self.publish(WidgetEvent::Unmounted {
            widget_id: entry.id.clone(),
        });
    }

    fn remove(&self, container_id: &str) -> bool {
        let entry = {
            let mut entries = self.entries.lock();
            match entries.iter().position(|e| e.id == container_id) {
                Some(index) => entries.remove(index),
                None => return false,
            }
        };

        debug!(id = %container_id, "Reading player container removed");
        self.teardown(entry);
        true
    }

    fn refresh_all(&self) -> usize {
        let snapshot = self.ctx.settings.snapshot();

        // Take the players out so no lock is held across host calls.
        let taken: Vec<(ReadingEntry, Option<Box<dyn RenderedPlayer>>)> = {
            let mut entries = self.entries.lock();
            entries
                .iter_mut()
                .map(|entry| {
                    entry.settings_version = snapshot.version;
                    let rendered = entry.rendered.take();
                    (
                        ReadingEntry {
                            id: entry.id.clone(),
                            source_path: entry.source_path.clone(),
                            url: entry.url.clone(),
                            title: entry.title.clone(),
                            settings_version: snapshot.version,
                            anchor: entry.anchor.clone(),
                            rendered: None,
                            observer: None,
                        },
                        rendered,
                    )
                })
                .collect()
        };

        let mut refreshed = 0;
        for (shadow, old) in taken {
            self.unmount_player(&shadow.id, old);
            shadow.anchor.clear();

            let rendered = self.render(&shadow, snapshot);
            let orphan = {
                let mut entries = self.entries.lock();
                match entries.iter_mut().find(|e| e.id == shadow.id) {
                    Some(entry) => {
                        entry.rendered = rendered;
                        None
                    }
                    None => rendered,
                }
            };

            match orphan {
                // Removed from the view while re-rendering.
                Some(rendered) => {
                    self.unmount_player(&shadow.id, Some(rendered));
                    shadow.anchor.clear();
                }
                None => refreshed += 1,
            }
        }

        debug!(entries = refreshed, version = snapshot.version, "Reading players refreshed");
        refreshed
    }
}

/// Forwards removal notifications without keeping the renderer alive.
struct RemovalHandler {
    renderer: Weak<RendererInner>,
}

impl RemovalSink for RemovalHandler {
    fn container_removed(&self, container_id: &str) {
        if let Some(renderer) = self.renderer.upgrade() {
            renderer.remove(container_id);
        }
    }
}

impl Drop for ReadingModeRenderer {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for ReadingModeRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadingModeRenderer")
            .field("entries", &self.len())
            .finish()
    }
}
