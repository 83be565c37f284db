//! Editor sessions driven end to end against in-memory host fakes.

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::document::{StringDocument, TextDocument};
use bridge_traits::editor::EditorView;
use bridge_traits::player::{PlayerEventKind, SamplePoints, WaveformType};
use bridge_traits::testing::{
    FakeAnchorFactory, FakeDom, FakeEditorView, FakePlayerComponent, MemoryVault,
};
use bridge_traits::vault::{VaultAccess, VaultFile};
use core_editor::{EditorDeps, EditorSession, Transaction, WidgetContext, WidgetIds};
use core_links::{LinkScanner, ResourceResolver};
use core_playback::PlaybackCoordinator;
use core_runtime::events::{CoreEvent, EventBus, EventStream, PlaybackEvent, WidgetEvent};
use core_runtime::scheduler::ManualScheduler;
use core_runtime::settings::{SettingsPatch, SettingsRegistry};
use mockall::mock;

mock! {
    pub View {}

    impl EditorView for View {
        fn document(&self) -> Arc<dyn TextDocument>;
        fn file_path(&self) -> Option<String>;
        fn request_redraw(&self);
    }
}

/// Vault that only resolves links relative to the note's folder.
struct NoteRelativeVault {
    files: Vec<&'static str>,
}

impl VaultAccess for NoteRelativeVault {
    fn file_by_path(&self, path: &str) -> Option<VaultFile> {
        self.files.iter().any(|f| *f == path).then(|| VaultFile::from_path(path))
    }

    fn attachment_folder(&self) -> Option<String> {
        None
    }

    fn resource_url(&self, file: &VaultFile) -> String {
        format!("app://local/{}", file.path)
    }

    fn resolve_link_path(&self, link: &str, source_note: Option<&str>) -> Option<VaultFile> {
        let folder = source_note?.rsplit_once('/')?.0;
        self.file_by_path(&format!("{}/{}", folder, link))
    }
}

struct Host {
    dom: Arc<FakeDom>,
    component: Arc<FakePlayerComponent>,
    scheduler: Arc<ManualScheduler>,
    settings: Arc<SettingsRegistry>,
    coordinator: Arc<PlaybackCoordinator>,
    bus: EventBus,
    deps: EditorDeps,
}

impl Host {
    fn new(vault: Arc<dyn VaultAccess>) -> Self {
        let dom = FakeDom::new();
        let component = Arc::new(FakePlayerComponent::new(dom.clone()));
        let scheduler = Arc::new(ManualScheduler::new());
        let bus = EventBus::new(512);
        let settings = Arc::new(SettingsRegistry::new().with_event_bus(bus.clone()));
        let coordinator =
            Arc::new(PlaybackCoordinator::new(settings.clone()).with_event_bus(bus.clone()));

        let deps = EditorDeps {
            scanner: Arc::new(LinkScanner::new().unwrap()),
            settings: settings.clone(),
            widgets: WidgetContext {
                resolver: Arc::new(ResourceResolver::new(vault)),
                component: component.clone(),
                anchors: Arc::new(FakeAnchorFactory::new(dom.clone())),
                scheduler: scheduler.clone(),
                coordinator: coordinator.clone(),
                events: Some(bus.clone()),
                ids: Arc::new(WidgetIds::default()),
            },
            viewport_debounce: Duration::from_millis(200),
        };

        Self {
            dom,
            component,
            scheduler,
            settings,
            coordinator,
            bus,
            deps,
        }
    }

    fn with_files(files: &[&str]) -> Self {
        Self::new(Arc::new(MemoryVault::new(files.iter().copied())))
    }

    fn open(&self, text: &str) -> (Arc<FakeEditorView>, EditorSession) {
        let view = Arc::new(FakeEditorView::new(text));
        let session = EditorSession::new(self.deps.clone(), view.clone()).unwrap();
        (view, session)
    }

    /// Run deferred mounts and let the viewport timer fire.
    fn settle(&self) {
        self.scheduler.run_until_stalled();
        self.scheduler.advance(Duration::from_millis(200));
        self.scheduler.run_until_stalled();
    }

    fn events(&self) -> EventStream {
        EventStream::new(self.bus.subscribe())
    }
}

#[test]
fn test_editing_prose_keeps_decorations() {
    let host = Host::with_files(&["a.mp3"]);
    let (view, session) = host.open("![a](a.mp3)\nnotes");
    host.settle();
    let before = session.decorations();
    let rebuilds = session.rebuild_count();

    let change = view.append(" about the take").unwrap();
    assert!(!session.dispatch(Transaction::edit(vec![change])));

    assert!(Arc::ptr_eq(&before, &session.decorations()));
    assert_eq!(session.rebuild_count(), rebuilds);
    assert_eq!(host.component.render_count(), 1);
}

#[test]
fn test_breaking_a_link_moved_by_earlier_typing_removes_its_player() {
    let host = Host::with_files(&["a.mp3"]);
    let (view, session) = host.open("![a](a.mp3)");
    host.settle();
    assert_eq!(host.dom.mounted_ids(), vec!["audio-player-0".to_string()]);
    let before = session.decorations();

    let intro = view.edit(0, 0, "intro\n").unwrap();
    assert!(!session.dispatch(Transaction::edit(vec![intro])));
    assert!(Arc::ptr_eq(&before, &session.decorations()));
    assert_eq!(session.block_positions(), vec![17]);

    let paren = view.edit(16, 17, "").unwrap();
    assert!(session.dispatch(Transaction::edit(vec![paren])));
    host.settle();

    assert!(session.decorations().is_empty());
    assert!(session.block_positions().is_empty());
    assert!(host.dom.mounted_ids().is_empty());
}

#[test]
fn test_typing_a_link_adds_a_player() {
    let host = Host::with_files(&["a.mp3", "b.wav"]);
    let (view, session) = host.open("![a](a.mp3)\n");
    host.settle();
    let first_id = session.decorations().widget_ids()[0].clone();

    let change = view.append("![[b.wav]]").unwrap();
    assert!(session.dispatch(Transaction::edit(vec![change])));
    host.scheduler.run_until_stalled();

    let decorations = session.decorations();
    assert_eq!(decorations.len(), 2);
    assert_eq!(decorations.widget_ids()[0], first_id);
    assert_eq!(decorations.get(1).unwrap().position, 22);
    assert_eq!(host.dom.mounted_ids().len(), 2);
}

#[test]
fn test_breaking_a_link_removes_its_player() {
    let host = Host::with_files(&["a.mp3"]);
    let (view, session) = host.open("![a](a.mp3)");
    host.settle();
    assert_eq!(host.dom.mounted_ids().len(), 1);

    // Drop the closing parenthesis.
    let change = view.edit(10, 11, "").unwrap();
    assert!(session.dispatch(Transaction::edit(vec![change])));

    assert!(session.decorations().is_empty());
    assert!(host.dom.mounted_ids().is_empty());
    assert_eq!(host.component.unmount_count(), 1);
}

#[test]
fn test_settings_change_remounts_each_player_once() {
    let host = Host::with_files(&["a.mp3", "b.mp3"]);
    let (_view, session) = host.open("![a](a.mp3)\n![b](b.mp3)");
    host.settle();
    assert_eq!(host.component.render_count(), 2);

    host.settings.apply(
        SettingsPatch::new()
            .waveform_type(WaveformType::Bars)
            .sample_points(SamplePoints::P500),
    );
    assert!(session.refresh());
    host.scheduler.run_until_stalled();

    let renders = host.component.renders();
    assert_eq!(renders.len(), 4);
    assert!(renders[2..]
        .iter()
        .all(|p| p.waveform_type == WaveformType::Bars && p.sample_points == SamplePoints::P500));
    assert_eq!(host.component.unmount_count(), 2);
    assert_eq!(host.dom.mounted_ids().len(), 2);
}

fn resolution_failures(events: &mut EventStream) -> usize {
    events
        .drain()
        .into_iter()
        .filter(|e| matches!(e, CoreEvent::Widget(WidgetEvent::ResolutionFailed { .. })))
        .count()
}

#[test]
fn test_missing_file_leaves_empty_anchor_and_one_diagnostic() {
    let host = Host::with_files(&[]);
    let mut events = host.events();
    let (_view, session) = host.open("![ghost](ghost.mp3)");
    host.scheduler.run_until_stalled();

    let decorations = session.decorations();
    assert_eq!(decorations.len(), 1);
    let widget = &decorations.get(0).unwrap().widget;
    assert!(widget.anchor().is_empty());
    assert_eq!(host.component.render_count(), 0);
    assert_eq!(resolution_failures(&mut events), 1);

    // The settled viewport recomputes and tries once more.
    host.scheduler.advance(Duration::from_millis(200));
    host.scheduler.run_until_stalled();
    assert!(widget.anchor().is_empty());
    assert_eq!(resolution_failures(&mut events), 1);
}

#[test]
fn test_file_added_later_mounts_on_next_refresh() {
    let vault = Arc::new(MemoryVault::default());
    let host = Host::new(vault.clone());
    let (_view, session) = host.open("![late](late.mp3)");
    host.settle();
    assert!(host.dom.mounted_ids().is_empty());

    vault.add_file("late.mp3");
    assert!(session.refresh());
    host.scheduler.run_until_stalled();

    assert_eq!(host.dom.mounted_ids(), vec!["audio-player-0".to_string()]);
    assert_eq!(host.component.render_count(), 1);
    assert_eq!(session.decorations().widget_ids(), vec!["audio-player-0".to_string()]);
}

#[test]
fn test_viewport_burst_triggers_one_refresh() {
    let host = Host::with_files(&["a.mp3"]);
    let (_view, session) = host.open("![a](a.mp3)");
    host.settle();
    let rebuilds = session.rebuild_count();

    for _ in 0..10 {
        session.on_viewport_changed().unwrap();
        host.scheduler.advance(Duration::from_millis(20));
    }
    assert_eq!(session.rebuild_count(), rebuilds);

    host.scheduler.advance(Duration::from_millis(200));
    assert_eq!(session.rebuild_count(), rebuilds + 1);
    assert!(!session.is_viewport_refresh_pending());
    assert_eq!(host.component.render_count(), 1);
}

#[test]
fn test_destroy_cancels_pending_refresh() {
    let host = Host::with_files(&["a.mp3"]);
    let (_view, session) = host.open("![a](a.mp3)");
    host.scheduler.run_until_stalled();
    assert!(session.is_viewport_refresh_pending());

    session.destroy();
    assert_eq!(host.scheduler.pending_count(), 0);

    host.scheduler.advance(Duration::from_secs(1));
    assert_eq!(session.rebuild_count(), 1);
    assert!(host.dom.mounted_ids().is_empty());
}

#[test]
fn test_duplicate_links_get_distinct_players() {
    let host = Host::with_files(&["a.mp3"]);
    let (_view, session) = host.open("![a](a.mp3) and again ![a](a.mp3)");
    host.settle();

    let ids = session.decorations().widget_ids();
    assert_eq!(ids, vec!["audio-player-0", "audio-player-1"]);
    assert_eq!(host.dom.mounted_ids(), ids);
}

#[test]
fn test_playing_one_player_pauses_the_other() {
    let host = Host::with_files(&["a.mp3", "b.mp3"]);
    let (_view, session) = host.open("![a](a.mp3)\n![b](b.mp3)");
    host.settle();
    let ids = session.decorations().widget_ids();
    let mut events = host.events();

    host.component.trigger(&ids[0], PlayerEventKind::Play);
    host.component.trigger(&ids[1], PlayerEventKind::Play);

    assert_eq!(host.coordinator.playing_ids(), vec![ids[1].clone()]);
    assert_eq!(host.component.handle(&ids[0]).unwrap().pause_count(), 1);
    assert!(events.drain().iter().any(|e| matches!(
        e,
        CoreEvent::Playback(PlaybackEvent::PauseRequested { .. })
    )));
}

#[test]
fn test_separate_sessions_do_not_share_widgets() {
    let host = Host::with_files(&["a.mp3"]);
    let (_v1, first) = host.open("![a](a.mp3)");
    let (_v2, second) = host.open("![a](a.mp3)");
    host.settle();

    assert!(!first.same_session(&second));
    assert_ne!(first.decorations().widget_ids(), second.decorations().widget_ids());

    first.destroy();
    assert_eq!(host.dom.mounted_ids(), second.decorations().widget_ids());
}

#[test]
fn test_links_resolve_relative_to_the_open_note() {
    let vault = NoteRelativeVault {
        files: vec!["projects/demo/take.mp3"],
    };
    let host = Host::new(Arc::new(vault));

    let doc: Arc<dyn TextDocument> = Arc::new(StringDocument::new("![[take.mp3]]"));
    let mut view = MockView::new();
    view.expect_document().returning(move || doc.clone());
    view.expect_file_path()
        .returning(|| Some("projects/demo/notes.md".to_string()));
    // Initial build plus the settled viewport refresh.
    view.expect_request_redraw().times(2).return_const(());

    let session = EditorSession::new(host.deps.clone(), Arc::new(view)).unwrap();
    host.settle();

    let id = &session.decorations().widget_ids()[0];
    let props = host.dom.rendered(id).unwrap();
    assert_eq!(props.src, "app://local/projects/demo/take.mp3");
    assert_eq!(props.title, "take");
}
