//! # Audio Link Module
//!
//! Finds audio links in note text and resolves them to playable resources.
//!
//! ## Overview
//!
//! This module handles:
//! - Scanning lines and whole documents for `![title](file.mp3)` and
//!   `![[file.mp3]]` links ([`LinkScanner`])
//! - The edit guard deciding whether inserted text can contain a link
//! - Resolving link targets through the vault, attachment folder and host
//!   link resolution ([`ResourceResolver`])

pub mod error;
pub mod resolver;
pub mod scanner;

pub use error::{LinkError, Result};
pub use resolver::{ResolvedResource, ResourceResolver};
pub use scanner::{title_from_path, AudioReference, LinkScanner, LinkSyntax, AUDIO_EXTENSIONS};
