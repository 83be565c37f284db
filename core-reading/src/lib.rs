//! # Reading View Module
//!
//! Renders waveform players into the non-editable reading view of a note.
//!
//! The host calls [`ReadingModeRenderer::process_section`] for every section
//! it renders. Each audio embed gets a container with a player after it; the
//! container is tracked until the host reports it removed, the settings
//! change ([`ReadingModeRenderer::refresh_all`]) or the plugin unloads
//! ([`ReadingModeRenderer::clear`]).

pub mod error;
pub mod renderer;

pub use error::{ReadingError, Result};
pub use renderer::{EmbedOutcome, EntryInfo, ReadingContext, ReadingModeRenderer, READING_ID_PREFIX};
