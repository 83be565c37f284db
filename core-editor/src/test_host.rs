//! Shared fixture for unit tests.

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::testing::{FakeAnchorFactory, FakeDom, FakePlayerComponent, MemoryVault};
use core_links::{AudioReference, LinkScanner, ResourceResolver};
use core_playback::PlaybackCoordinator;
use core_runtime::events::{EventBus, EventStream};
use core_runtime::scheduler::ManualScheduler;
use core_runtime::settings::SettingsRegistry;

use crate::session::EditorDeps;
use crate::widget::{AudioPlayerWidget, WidgetContext, WidgetIds};

pub(crate) struct TestHost {
    pub dom: Arc<FakeDom>,
    pub component: Arc<FakePlayerComponent>,
    pub scheduler: Arc<ManualScheduler>,
    pub settings: Arc<SettingsRegistry>,
    pub coordinator: Arc<PlaybackCoordinator>,
    pub bus: EventBus,
    pub ctx: WidgetContext,
}

impl TestHost {
    pub fn new(files: &[&str]) -> Self {
        Self::with_scheduler(files, ManualScheduler::new())
    }

    pub fn without_idle(files: &[&str]) -> Self {
        Self::with_scheduler(files, ManualScheduler::without_idle())
    }

    fn with_scheduler(files: &[&str], scheduler: ManualScheduler) -> Self {
        let dom = FakeDom::new();
        let component = Arc::new(FakePlayerComponent::new(dom.clone()));
        let scheduler = Arc::new(scheduler);
        let bus = EventBus::new(256);
        let settings = Arc::new(SettingsRegistry::new().with_event_bus(bus.clone()));
        let coordinator = Arc::new(
            PlaybackCoordinator::new(settings.clone()).with_event_bus(bus.clone()),
        );
        let vault = MemoryVault::new(files.iter().copied());

        let ctx = WidgetContext {
            resolver: Arc::new(ResourceResolver::new(Arc::new(vault))),
            component: component.clone(),
            anchors: Arc::new(FakeAnchorFactory::new(dom.clone())),
            scheduler: scheduler.clone(),
            coordinator: coordinator.clone(),
            events: Some(bus.clone()),
            ids: Arc::new(WidgetIds::default()),
        };

        Self {
            dom,
            component,
            scheduler,
            settings,
            coordinator,
            bus,
            ctx,
        }
    }

    pub fn widget(&self, reference: &AudioReference) -> Arc<AudioPlayerWidget> {
        AudioPlayerWidget::new(self.ctx.clone(), reference, None, self.settings.snapshot())
    }

    pub fn events(&self) -> EventStream {
        EventStream::new(self.bus.subscribe())
    }

    pub fn editor_deps(&self) -> EditorDeps {
        EditorDeps {
            scanner: Arc::new(LinkScanner::new().unwrap()),
            settings: self.settings.clone(),
            widgets: self.ctx.clone(),
            viewport_debounce: Duration::from_millis(200),
        }
    }
}
