//! # Editor Session
//!
//! Keeps the player decorations of one editor view in sync with its
//! document, the viewport and the settings.
//!
//! ## Triggers
//!
//! - [`EditorSession::dispatch`] with a text edit rebuilds only when the edit
//!   can affect a link (see [`crate::field`]).
//! - [`EditorSession::dispatch`] with
//!   [`Effect::RefreshPlayers`](crate::field::Effect::RefreshPlayers) always
//!   rebuilds. The plugin sends it after a settings change.
//! - [`EditorSession::on_viewport_changed`] debounces and then sends the
//!   refresh effect.
//!
//! A rebuild rescans the document unless it has not been edited since the
//! last scan, reconciles widgets and swaps the decoration set in one step.
//! A rebuild requested while one is running (from inside a host callback)
//! is folded into another pass of the running loop.

use std::sync::{Arc, Weak};
use std::time::Duration;

use bridge_traits::editor::EditorView;
use core_links::{AudioReference, LinkScanner};
use core_runtime::events::{CoreEvent, EventBus, WidgetEvent};
use core_runtime::settings::SettingsRegistry;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::decoration::{DecorationSet, SpanMap};
use crate::error::{EditorError, Result};
use crate::field::{self, FieldUpdate, Transaction};
use crate::lifecycle::{ReconcileReport, WidgetLifecycleManager};
use crate::viewport::ViewportDebouncer;
use crate::widget::WidgetContext;

/// Everything a session needs besides the view itself.
#[derive(Clone)]
pub struct EditorDeps {
    pub scanner: Arc<LinkScanner>,
    pub settings: Arc<SettingsRegistry>,
    pub widgets: WidgetContext,
    pub viewport_debounce: Duration,
}

struct SessionState {
    decorations: Arc<DecorationSet>,
    /// Link spans of `decorations`, moved through every kept edit.
    spans: SpanMap,
    doc_generation: u64,
    cached: Option<(u64, Vec<AudioReference>)>,
    rebuilding: bool,
    rebuild_requested: bool,
    destroyed: bool,
    rebuilds: u64,
}

struct SessionInner {
    view: Arc<dyn EditorView>,
    scanner: Arc<LinkScanner>,
    settings: Arc<SettingsRegistry>,
    lifecycle: WidgetLifecycleManager,
    debouncer: ViewportDebouncer,
    events: Option<EventBus>,
    state: Mutex<SessionState>,
}

/// Handle to one editor's player decorations. Clones share the session.
#[derive(Clone)]
pub struct EditorSession {
    inner: Arc<SessionInner>,
}

impl EditorSession {
    /// Build the initial decorations and schedule the first refresh.
    pub fn new(deps: EditorDeps, view: Arc<dyn EditorView>) -> Result<Self> {
        let events = deps.widgets.events.clone();
        let debouncer = ViewportDebouncer::new(deps.widgets.scheduler.clone(), deps.viewport_debounce);

        let inner = Arc::new(SessionInner {
            view,
            scanner: deps.scanner,
            settings: deps.settings,
            lifecycle: WidgetLifecycleManager::new(deps.widgets),
            debouncer,
            events,
            state: Mutex::new(SessionState {
                decorations: DecorationSet::empty(),
                spans: SpanMap::default(),
                doc_generation: 0,
                cached: None,
                rebuilding: false,
                rebuild_requested: false,
                destroyed: false,
                rebuilds: 0,
            }),
        });

        inner.rebuild();
        let session = Self { inner };
        session.on_viewport_changed()?;
        debug!(path = ?session.inner.view.file_path(), "Editor session created");
        Ok(session)
    }

    /// Apply an editor transaction. Returns whether the decorations were
    /// rebuilt.
    pub fn dispatch(&self, transaction: Transaction) -> bool {
        self.inner.dispatch(transaction)
    }

    /// Shorthand for dispatching [`Transaction::refresh`].
    pub fn refresh(&self) -> bool {
        self.dispatch(Transaction::refresh())
    }

    /// Note a viewport change; a refresh follows once scrolling settles.
    pub fn on_viewport_changed(&self) -> Result<()> {
        if self.is_destroyed() {
            return Err(EditorError::SessionDestroyed);
        }

        let weak: Weak<SessionInner> = Arc::downgrade(&self.inner);
        self.inner.debouncer.trigger(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.dispatch(Transaction::refresh());
            }
        }))?;
        Ok(())
    }

    /// Current decoration set.
    pub fn decorations(&self) -> Arc<DecorationSet> {
        self.inner.state.lock().decorations.clone()
    }

    /// Offsets of the player blocks in the current document.
    ///
    /// Equal to the decorations' positions right after a rebuild; edits that
    /// keep the set move these instead.
    pub fn block_positions(&self) -> Vec<usize> {
        self.inner.state.lock().spans.block_positions()
    }

    /// Number of completed rebuilds, including the initial one.
    pub fn rebuild_count(&self) -> u64 {
        self.inner.state.lock().rebuilds
    }

    pub fn is_viewport_refresh_pending(&self) -> bool {
        self.inner.debouncer.is_pending()
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.state.lock().destroyed
    }

    /// Whether two handles refer to the same session.
    pub fn same_session(&self, other: &EditorSession) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Cancel the pending refresh and tear down every widget. Idempotent.
    pub fn destroy(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            state.decorations = DecorationSet::empty();
            state.spans = SpanMap::default();
            state.cached = None;
        }

        self.inner.debouncer.cancel();
        let count = self.inner.lifecycle.unmount_all();
        debug!(widgets = count, "Editor session destroyed");
    }
}

impl SessionInner {
    fn dispatch(&self, transaction: Transaction) -> bool {
        let update = {
            let mut state = self.state.lock();
            if state.destroyed {
                return false;
            }
            if transaction.doc_changed() {
                state.doc_generation += 1;
            }
            let update = field::classify(&self.scanner, &state.spans, &transaction);
            if update == FieldUpdate::Keep {
                state.spans.map_through(&transaction.changes);
            }
            update
        };

        match update {
            FieldUpdate::Keep => false,
            FieldUpdate::Rebuild => {
                self.rebuild();
                true
            }
        }
    }

    fn rebuild(&self) {
        {
            let mut state = self.state.lock();
            if state.destroyed {
                return;
            }
            if state.rebuilding {
                state.rebuild_requested = true;
                return;
            }
            state.rebuilding = true;
        }

        let mut total = ReconcileReport::default();
        loop {
            let (generation, cached) = {
                let state = self.state.lock();
                let cached = state
                    .cached
                    .as_ref()
                    .filter(|(generation, _)| *generation == state.doc_generation)
                    .map(|(_, references)| references.clone());
                (state.doc_generation, cached)
            };

            let references = match cached {
                Some(references) => {
                    trace!(count = references.len(), "Reusing cached references");
                    references
                }
                None => self.scanner.scan_document(self.view.document().as_ref()),
            };

            let snapshot = self.settings.snapshot();
            let source_note = self.view.file_path();
            let (decorations, report) =
                self.lifecycle
                    .reconcile(&references, snapshot, source_note.as_deref());
            total.reused += report.reused;
            total.created += report.created;
            total.destroyed += report.destroyed;

            let again = {
                let mut state = self.state.lock();
                if state.destroyed {
                    state.rebuilding = false;
                    drop(state);
                    self.lifecycle.unmount_all();
                    return;
                }
                let decorations = DecorationSet::new(decorations);
                state.spans = SpanMap::of(&decorations);
                state.decorations = Arc::new(decorations);
                if state.doc_generation == generation {
                    state.cached = Some((generation, references));
                }
                state.rebuilds += 1;
                let again = state.rebuild_requested;
                state.rebuild_requested = false;
                if !again {
                    state.rebuilding = false;
                }
                again
            };

            if !again {
                break;
            }
        }

        if let Some(events) = &self.events {
            events
                .emit(CoreEvent::Widget(WidgetEvent::DecorationsRebuilt {
                    reused: total.reused,
                    created: total.created,
                    destroyed: total.destroyed,
                }))
                .ok();
        }
        self.view.request_redraw();
    }
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("EditorSession")
            .field("decorations", &state.decorations.len())
            .field("rebuilds", &state.rebuilds)
            .field("destroyed", &state.destroyed)
            .finish()
    }
}
