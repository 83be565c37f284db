//! # Vault Preview Example
//!
//! Opens a note from a vault directory, runs the editor pipeline over it and
//! prints the players that would be rendered. Players are "rendered" to the
//! console.
//!
//! Run with:
//! `cargo run --example vault_preview --package core-service -- <vault-dir> <note.md>`

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bridge_traits::document::{StringDocument, TextDocument};
use bridge_traits::editor::EditorView;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::log::{DevConsoleLogger, LogLevel};
use bridge_traits::player::{PlayerComponent, PlayerEventSink, PlayerProps, RenderedPlayer};
use bridge_traits::ui::{AnchorFactory, WidgetAnchor};
use core_service::{
    init_logging, FsVault, JsonFileSettingsStore, LoggingConfig, PluginConfig, TokioScheduler,
    WaveformPlayerPlugin,
};
use parking_lot::Mutex;

// ============================================================================
// Console UI
// ============================================================================

#[derive(Default)]
struct Console {
    rendered: Mutex<HashMap<String, PlayerProps>>,
}

struct ConsoleAnchor {
    id: String,
    console: Arc<Console>,
}

impl WidgetAnchor for ConsoleAnchor {
    fn id(&self) -> &str {
        &self.id
    }

    fn clear(&self) {
        self.console.rendered.lock().remove(&self.id);
    }

    fn is_empty(&self) -> bool {
        !self.console.rendered.lock().contains_key(&self.id)
    }
}

struct ConsoleAnchors(Arc<Console>);

impl AnchorFactory for ConsoleAnchors {
    fn create_anchor(&self, player_id: &str) -> Arc<dyn WidgetAnchor> {
        Arc::new(ConsoleAnchor {
            id: player_id.to_string(),
            console: self.0.clone(),
        })
    }
}

struct ConsolePlayer(Arc<Console>);

struct ConsoleRendered {
    id: String,
    console: Arc<Console>,
}

impl RenderedPlayer for ConsoleRendered {
    fn unmount(&mut self) -> BridgeResult<()> {
        self.console.rendered.lock().remove(&self.id);
        println!("  - {} unmounted", self.id);
        Ok(())
    }
}

impl PlayerComponent for ConsolePlayer {
    fn render(
        &self,
        anchor: &dyn WidgetAnchor,
        props: PlayerProps,
        _sink: Arc<dyn PlayerEventSink>,
    ) -> BridgeResult<Box<dyn RenderedPlayer>> {
        println!(
            "  + {} \"{}\" [{} / {} points] {}",
            props.key, props.title, props.waveform_type, props.sample_points, props.src
        );
        self.0
            .rendered
            .lock()
            .insert(anchor.id().to_string(), props);
        Ok(Box::new(ConsoleRendered {
            id: anchor.id().to_string(),
            console: self.0.clone(),
        }))
    }
}

// ============================================================================
// Read-only editor view
// ============================================================================

struct NoteView {
    doc: Arc<StringDocument>,
    path: String,
}

impl EditorView for NoteView {
    fn document(&self) -> Arc<dyn TextDocument> {
        self.doc.clone()
    }

    fn file_path(&self) -> Option<String> {
        Some(self.path.clone())
    }

    fn request_redraw(&self) {}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(
        LoggingConfig::default().with_logger_sink(Arc::new(DevConsoleLogger {
            min_level: LogLevel::Warn,
            ..DevConsoleLogger::default()
        })),
    )?;

    let mut args = std::env::args().skip(1);
    let root = args.next().context("usage: vault_preview <vault-dir> <note.md>")?;
    let note = args.next().context("usage: vault_preview <vault-dir> <note.md>")?;

    let vault = FsVault::open(&root)
        .await
        .with_context(|| format!("opening vault {}", root))?;
    println!("Indexed {} files in {}", vault.len(), root);

    let text = tokio::fs::read_to_string(vault.root().join(&note))
        .await
        .with_context(|| format!("reading note {}", note))?;

    let console = Arc::new(Console::default());
    let config = PluginConfig::builder()
        .vault(Arc::new(vault))
        .settings_store(Arc::new(JsonFileSettingsStore::default_location()?))
        .player_component(Arc::new(ConsolePlayer(console.clone())))
        .anchor_factory(Arc::new(ConsoleAnchors(console.clone())))
        .scheduler(Arc::new(TokioScheduler::try_current()?))
        .build()?;

    let plugin = WaveformPlayerPlugin::new(config)?;
    let settings = plugin.onload().await?;
    println!(
        "Settings v{}: {} waveform, {} sample points",
        settings.version, settings.settings.waveform_type, settings.settings.sample_points
    );

    let session = plugin.create_editor_session(Arc::new(NoteView {
        doc: Arc::new(StringDocument::new(text)),
        path: note,
    }))?;
    println!("Found {} audio links", session.decorations().len());

    // Let deferred mounts and the first viewport refresh run.
    tokio::time::sleep(Duration::from_millis(300)).await;

    for decoration in session.decorations().iter() {
        let status = if decoration.widget.anchor().is_empty() {
            "not found"
        } else {
            "ready"
        };
        println!(
            "{:>6}  {}  ({})",
            decoration.position, decoration.reference.source_path, status
        );
    }

    plugin.onunload();
    Ok(())
}
