//! # Widget Lifecycle Manager
//!
//! Turns a freshly scanned reference list into decorations, reusing the
//! widgets of the previous pass where possible.
//!
//! A widget is reused for a reference when source path, title and settings
//! version all match. Each widget is claimed at most once, so duplicate
//! links get distinct players. Unclaimed widgets are torn down; new ones
//! are mounted through the scheduler, and so are reused widgets whose last
//! mount failed (file not found or render error).

use std::sync::Arc;

use core_links::AudioReference;
use core_runtime::settings::SettingsSnapshot;
use parking_lot::Mutex;
use tracing::debug;

use crate::decoration::Decoration;
use crate::widget::{AudioPlayerWidget, MountState, WidgetContext};

/// What a reconciliation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub reused: usize,
    pub created: usize,
    pub destroyed: usize,
}

impl ReconcileReport {
    /// Whether the pass kept every widget as it was.
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.destroyed == 0
    }
}

pub struct WidgetLifecycleManager {
    ctx: WidgetContext,
    widgets: Mutex<Vec<Arc<AudioPlayerWidget>>>,
}

impl WidgetLifecycleManager {
    pub fn new(ctx: WidgetContext) -> Self {
        Self {
            ctx,
            widgets: Mutex::new(Vec::new()),
        }
    }

    pub fn context(&self) -> &WidgetContext {
        &self.ctx
    }

    /// Live widgets in decoration order.
    pub fn widgets(&self) -> Vec<Arc<AudioPlayerWidget>> {
        self.widgets.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.widgets.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.lock().is_empty()
    }

    /// Match `references` against the live widgets.
    ///
    /// Returns one decoration per reference, in input order.
    pub fn reconcile(
        &self,
        references: &[AudioReference],
        snapshot: SettingsSnapshot,
        source_note: Option<&str>,
    ) -> (Vec<Decoration>, ReconcileReport) {
        let mut pool: Vec<Option<Arc<AudioPlayerWidget>>> = std::mem::take(&mut *self.widgets.lock())
            .into_iter()
            .map(Some)
            .collect();

        let mut report = ReconcileReport::default();
        let mut created = Vec::new();
        let mut retry = Vec::new();
        let mut decorations = Vec::with_capacity(references.len());

        for reference in references {
            let reused = pool
                .iter_mut()
                .find(|slot| {
                    slot.as_ref()
                        .map(|w| w.matches(reference, snapshot.version))
                        .unwrap_or(false)
                })
                .and_then(Option::take);

            let widget = match reused {
                Some(widget) => {
                    report.reused += 1;
                    if widget.mount_state() == MountState::Unmounted {
                        retry.push(widget.clone());
                    }
                    widget
                }
                None => {
                    let widget = AudioPlayerWidget::new(
                        self.ctx.clone(),
                        reference,
                        source_note.map(str::to_string),
                        snapshot,
                    );
                    report.created += 1;
                    created.push(widget.clone());
                    widget
                }
            };

            decorations.push(Decoration::block_after(reference.clone(), widget));
        }

        let stale: Vec<Arc<AudioPlayerWidget>> = pool.into_iter().flatten().collect();
        report.destroyed = stale.len();

        *self.widgets.lock() = decorations.iter().map(|d| d.widget.clone()).collect();

        for widget in &stale {
            widget.unmount();
        }
        for widget in created.iter().chain(&retry) {
            widget.schedule_mount();
        }

        debug!(
            reused = report.reused,
            retried = retry.len(),
            created = report.created,
            destroyed = report.destroyed,
            version = snapshot.version,
            "Reconciled widgets"
        );
        (decorations, report)
    }

    /// Tear down every widget. Returns how many there were.
    pub fn unmount_all(&self) -> usize {
        let widgets = std::mem::take(&mut *self.widgets.lock());
        for widget in &widgets {
            widget.unmount();
        }
        widgets.len()
    }
}

impl std::fmt::Debug for WidgetLifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetLifecycleManager")
            .field("widgets", &self.len())
            .finish()
    }
}
