//! In-memory host for tests.
//!
//! Enabled with the `test-support` feature. Every fake records what the core
//! asked of it so suites can assert on mounts, clears, pauses and observer
//! registrations without a real UI.
//!
//! Anchors and rendered players share a [`FakeDom`]: rendering fills a
//! container, clearing or unmounting empties it.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::document::{ChangedRange, StringDocument, TextDocument};
use crate::editor::EditorView;
use crate::error::{BridgeError, Result};
use crate::player::{
    PlayerComponent, PlayerEventKind, PlayerEventSink, PlayerHandle, PlayerProps, RenderedPlayer,
};
use crate::reading::{EmbedElement, ObserverHandle, ReadingSection, RemovalSink};
use crate::storage::SettingsStore;
use crate::ui::{AnchorFactory, WidgetAnchor};
use crate::vault::{VaultAccess, VaultFile};

// ============================================================================
// DOM
// ============================================================================

/// Containers created by the core and what is rendered in each.
#[derive(Default)]
pub struct FakeDom {
    containers: Mutex<HashMap<String, Option<PlayerProps>>>,
    created: Mutex<Vec<String>>,
    clears: AtomicUsize,
}

impl FakeDom {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Props currently rendered in the container, if any.
    pub fn rendered(&self, container_id: &str) -> Option<PlayerProps> {
        self.containers.lock().get(container_id).cloned().flatten()
    }

    /// Ids of containers with a rendered player, sorted.
    pub fn mounted_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .containers
            .lock()
            .iter()
            .filter(|(_, props)| props.is_some())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Every container id ever created, in creation order.
    pub fn created(&self) -> Vec<String> {
        self.created.lock().clone()
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    fn create(&self, id: &str) {
        self.containers.lock().insert(id.to_string(), None);
        self.created.lock().push(id.to_string());
    }

    fn fill(&self, id: &str, props: PlayerProps) {
        self.containers.lock().insert(id.to_string(), Some(props));
    }

    fn empty(&self, id: &str) {
        if let Some(slot) = self.containers.lock().get_mut(id) {
            *slot = None;
        }
    }
}

pub struct FakeAnchor {
    id: String,
    dom: Arc<FakeDom>,
}

impl WidgetAnchor for FakeAnchor {
    fn id(&self) -> &str {
        &self.id
    }

    fn clear(&self) {
        self.dom.clears.fetch_add(1, Ordering::SeqCst);
        self.dom.empty(&self.id);
    }

    fn is_empty(&self) -> bool {
        self.dom.rendered(&self.id).is_none()
    }
}

pub struct FakeAnchorFactory {
    dom: Arc<FakeDom>,
}

impl FakeAnchorFactory {
    pub fn new(dom: Arc<FakeDom>) -> Self {
        Self { dom }
    }
}

impl AnchorFactory for FakeAnchorFactory {
    fn create_anchor(&self, player_id: &str) -> Arc<dyn WidgetAnchor> {
        self.dom.create(player_id);
        Arc::new(FakeAnchor {
            id: player_id.to_string(),
            dom: self.dom.clone(),
        })
    }
}

// ============================================================================
// Player component
// ============================================================================

/// Control surface handed to the coordinator for a fake player.
pub struct FakePlayerHandle {
    id: String,
    pauses: AtomicUsize,
    stops: AtomicUsize,
}

impl FakePlayerHandle {
    pub fn pause_count(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl PlayerHandle for FakePlayerHandle {
    fn id(&self) -> &str {
        &self.id
    }

    fn pause(&self) -> Result<()> {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct LivePlayer {
    handle: Arc<FakePlayerHandle>,
    sink: Arc<dyn PlayerEventSink>,
}

/// Player component rendering props into the [`FakeDom`].
pub struct FakePlayerComponent {
    dom: Arc<FakeDom>,
    renders: Mutex<Vec<PlayerProps>>,
    live: Arc<Mutex<HashMap<String, LivePlayer>>>,
    unmounts: Arc<AtomicUsize>,
    fail_render: AtomicBool,
    fail_unmount: Arc<AtomicBool>,
}

impl FakePlayerComponent {
    pub fn new(dom: Arc<FakeDom>) -> Self {
        Self {
            dom,
            renders: Mutex::new(Vec::new()),
            live: Arc::new(Mutex::new(HashMap::new())),
            unmounts: Arc::new(AtomicUsize::new(0)),
            fail_render: AtomicBool::new(false),
            fail_unmount: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make subsequent renders fail.
    pub fn fail_renders(&self, fail: bool) {
        self.fail_render.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent unmounts fail (the container is still emptied).
    pub fn fail_unmounts(&self, fail: bool) {
        self.fail_unmount.store(fail, Ordering::SeqCst);
    }

    /// Props of every successful render, in order.
    pub fn renders(&self) -> Vec<PlayerProps> {
        self.renders.lock().clone()
    }

    pub fn render_count(&self) -> usize {
        self.renders.lock().len()
    }

    pub fn unmount_count(&self) -> usize {
        self.unmounts.load(Ordering::SeqCst)
    }

    /// Handle of the live player rendered under `key`.
    pub fn handle(&self, key: &str) -> Option<Arc<FakePlayerHandle>> {
        self.live.lock().get(key).map(|p| p.handle.clone())
    }

    /// Keys of currently rendered players, sorted.
    pub fn live_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.live.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Simulate the user pressing play (or the player pausing or ending).
    /// Returns `false` when no live player has that key.
    pub fn trigger(&self, key: &str, kind: PlayerEventKind) -> bool {
        let target = self
            .live
            .lock()
            .get(key)
            .map(|p| (p.handle.clone(), p.sink.clone()));
        match target {
            Some((handle, sink)) => {
                sink.emit(kind, handle);
                true
            }
            None => false,
        }
    }
}

impl PlayerComponent for FakePlayerComponent {
    fn render(
        &self,
        anchor: &dyn WidgetAnchor,
        props: PlayerProps,
        sink: Arc<dyn PlayerEventSink>,
    ) -> Result<Box<dyn RenderedPlayer>> {
        if self.fail_render.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed(format!(
                "render refused for {}",
                props.key
            )));
        }

        let handle = Arc::new(FakePlayerHandle {
            id: props.key.clone(),
            pauses: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        });
        self.live
            .lock()
            .insert(props.key.clone(), LivePlayer { handle, sink });
        self.dom.fill(anchor.id(), props.clone());
        self.renders.lock().push(props.clone());

        Ok(Box::new(FakeRenderedPlayer {
            key: props.key,
            anchor_id: anchor.id().to_string(),
            dom: self.dom.clone(),
            live: self.live.clone(),
            unmounts: self.unmounts.clone(),
            fail: self.fail_unmount.clone(),
        }))
    }
}

struct FakeRenderedPlayer {
    key: String,
    anchor_id: String,
    dom: Arc<FakeDom>,
    live: Arc<Mutex<HashMap<String, LivePlayer>>>,
    unmounts: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
}

impl RenderedPlayer for FakeRenderedPlayer {
    fn unmount(&mut self) -> Result<()> {
        self.unmounts.fetch_add(1, Ordering::SeqCst);
        self.live.lock().remove(&self.key);
        self.dom.empty(&self.anchor_id);
        if self.fail.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed(format!(
                "unmount failed for {}",
                self.key
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Vault and settings
// ============================================================================

/// Vault backed by a set of paths. URLs use the `app://local/` scheme with
/// spaces percent-encoded.
#[derive(Default)]
pub struct MemoryVault {
    files: RwLock<BTreeSet<String>>,
    attachments: RwLock<Option<String>>,
}

impl MemoryVault {
    pub fn new<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: RwLock::new(files.into_iter().map(Into::into).collect()),
            attachments: RwLock::new(None),
        }
    }

    pub fn with_attachment_folder(self, folder: impl Into<String>) -> Self {
        *self.attachments.write() = Some(folder.into());
        self
    }

    pub fn add_file(&self, path: impl Into<String>) {
        self.files.write().insert(path.into());
    }

    pub fn remove_file(&self, path: &str) {
        self.files.write().remove(path);
    }
}

impl VaultAccess for MemoryVault {
    fn file_by_path(&self, path: &str) -> Option<VaultFile> {
        self.files
            .read()
            .contains(path)
            .then(|| VaultFile::from_path(path))
    }

    fn attachment_folder(&self) -> Option<String> {
        self.attachments.read().clone()
    }

    fn resource_url(&self, file: &VaultFile) -> String {
        format!("app://local/{}", file.path.replace(' ', "%20"))
    }
}

/// Settings store holding the document in memory.
#[derive(Default)]
pub struct MemorySettingsStore {
    data: Mutex<Option<Value>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl MemorySettingsStore {
    pub fn new(initial: Option<Value>) -> Self {
        Self {
            data: Mutex::new(initial),
            ..Self::default()
        }
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn stored(&self) -> Option<Value> {
        self.data.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> Result<Option<Value>> {
        Ok(self.data.lock().clone())
    }

    async fn save(&self, data: &Value) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("disk full".to_string()));
        }
        *self.data.lock() = Some(data.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Editor
// ============================================================================

/// Editor view over a [`StringDocument`] that the test edits directly.
pub struct FakeEditorView {
    doc: RwLock<Arc<StringDocument>>,
    path: Option<String>,
    redraws: AtomicUsize,
}

impl FakeEditorView {
    pub fn new(text: &str) -> Self {
        Self {
            doc: RwLock::new(Arc::new(StringDocument::new(text))),
            path: None,
            redraws: AtomicUsize::new(0),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn text(&self) -> String {
        self.doc.read().as_str().to_string()
    }

    /// Replace `from..to` with `insert` and return the change for dispatch.
    pub fn edit(&self, from: usize, to: usize, insert: &str) -> Result<ChangedRange> {
        let mut doc = self.doc.write();
        let (next, change) = doc.with_edit(from, to, insert)?;
        *doc = Arc::new(next);
        Ok(change)
    }

    /// Insert at the end of the document.
    pub fn append(&self, text: &str) -> Result<ChangedRange> {
        let end = self.doc.read().len();
        self.edit(end, end, text)
    }

    pub fn redraw_count(&self) -> usize {
        self.redraws.load(Ordering::SeqCst)
    }
}

impl EditorView for FakeEditorView {
    fn document(&self) -> Arc<dyn TextDocument> {
        self.doc.read().clone()
    }

    fn file_path(&self) -> Option<String> {
        self.path.clone()
    }

    fn request_redraw(&self) {
        self.redraws.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Reading view
// ============================================================================

/// Embed element that records inserted containers and observers.
pub struct FakeEmbed {
    src: Option<String>,
    inserted: Mutex<Vec<String>>,
    observers: Mutex<Vec<(String, Arc<dyn RemovalSink>, Arc<AtomicBool>)>>,
    disconnects: Arc<AtomicUsize>,
}

impl FakeEmbed {
    pub fn new(src: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            src: src.map(str::to_string),
            inserted: Mutex::new(Vec::new()),
            observers: Mutex::new(Vec::new()),
            disconnects: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Container ids inserted after this element.
    pub fn inserted(&self) -> Vec<String> {
        self.inserted.lock().clone()
    }

    pub fn observer_count(&self) -> usize {
        self.observers
            .lock()
            .iter()
            .filter(|(_, _, connected)| connected.load(Ordering::SeqCst))
            .count()
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    /// Remove the container from the DOM, notifying connected observers.
    pub fn remove_container(&self, container_id: &str) {
        self.inserted.lock().retain(|id| id != container_id);
        let sinks: Vec<Arc<dyn RemovalSink>> = self
            .observers
            .lock()
            .iter()
            .filter(|(id, _, connected)| id == container_id && connected.load(Ordering::SeqCst))
            .map(|(_, sink, _)| sink.clone())
            .collect();
        for sink in sinks {
            sink.container_removed(container_id);
        }
    }
}

impl EmbedElement for FakeEmbed {
    fn src_attribute(&self) -> Option<String> {
        self.src.clone()
    }

    fn insert_after(&self, anchor: &dyn WidgetAnchor) -> Result<()> {
        self.inserted.lock().push(anchor.id().to_string());
        Ok(())
    }

    fn observe_removal(
        &self,
        container_id: &str,
        sink: Arc<dyn RemovalSink>,
    ) -> Result<Box<dyn ObserverHandle>> {
        let connected = Arc::new(AtomicBool::new(true));
        self.observers
            .lock()
            .push((container_id.to_string(), sink, connected.clone()));
        Ok(Box::new(FakeObserver {
            connected,
            disconnects: self.disconnects.clone(),
        }))
    }
}

struct FakeObserver {
    connected: Arc<AtomicBool>,
    disconnects: Arc<AtomicUsize>,
}

impl ObserverHandle for FakeObserver {
    fn disconnect(&mut self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Rendered reading-view section.
pub struct FakeSection {
    embeds: Vec<Arc<FakeEmbed>>,
    path: Option<String>,
}

impl FakeSection {
    pub fn new(embeds: Vec<Arc<FakeEmbed>>) -> Self {
        Self { embeds, path: None }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl ReadingSection for FakeSection {
    fn embeds(&self) -> Vec<Arc<dyn EmbedElement>> {
        self.embeds
            .iter()
            .map(|e| e.clone() as Arc<dyn EmbedElement>)
            .collect()
    }

    fn source_path(&self) -> Option<String> {
        self.path.clone()
    }
}
