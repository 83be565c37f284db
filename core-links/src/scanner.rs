//! # Link Scanner
//!
//! Finds audio references in note text. Two syntaxes are recognized:
//!
//! - markdown image links: `![title](path/to/file.mp3)`
//! - embeds: `![[path/to/file.mp3]]`, titled after the file name
//!
//! Matching is per line; a link broken across lines is ignored. Extensions
//! are compared case-insensitively.

use std::ops::Range;

use bridge_traits::document::TextDocument;
use regex::Regex;

use crate::error::{LinkError, Result};

/// Extensions recognized by [`LinkScanner::new`].
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a", "webm"];

/// Which syntax produced a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkSyntax {
    /// `![title](path.ext)`
    Markdown,
    /// `![[path.ext]]`
    Embed,
}

/// An audio link found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AudioReference {
    /// Display title. Empty when a markdown link has no alt text.
    pub title: String,
    /// Link target exactly as written (may still be percent-encoded).
    pub source_path: String,
    /// Byte range of the whole link in the document.
    pub span: Range<usize>,
    pub syntax: LinkSyntax,
}

impl AudioReference {
    /// Offset the player widget is attached at.
    pub fn anchor_position(&self) -> usize {
        self.span.end
    }
}

/// File name of `path` without directory prefix or extension.
///
/// ```
/// use core_links::title_from_path;
///
/// assert_eq!(title_from_path("folder/b.wav"), "b");
/// assert_eq!(title_from_path("take.two.mp3"), "take.two");
/// ```
pub fn title_from_path(path: &str) -> String {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match name.rfind('.') {
        Some(dot) if dot > 0 => name[..dot].to_string(),
        _ => name.to_string(),
    }
}

/// Compiled matcher for audio links.
#[derive(Debug, Clone)]
pub struct LinkScanner {
    markdown_re: Regex,
    embed_re: Regex,
    extensions: Vec<String>,
}

impl LinkScanner {
    /// Scanner for the default [`AUDIO_EXTENSIONS`].
    pub fn new() -> Result<Self> {
        Self::with_extensions(AUDIO_EXTENSIONS.iter().copied())
    }

    /// Scanner for a custom extension list (without leading dots).
    pub fn with_extensions<I, S>(extensions: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for ext in extensions {
            let ext = ext.as_ref().trim().trim_start_matches('.').to_ascii_lowercase();
            if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(LinkError::InvalidExtension(ext));
            }
            if !normalized.contains(&ext) {
                normalized.push(ext);
            }
        }
        if normalized.is_empty() {
            return Err(LinkError::NoExtensions);
        }

        let alternatives = normalized.join("|");
        let markdown_re = Regex::new(&format!(
            r"(?i)!\[([^\]]*)\]\(([^)]+\.(?:{}))\)",
            alternatives
        ))?;
        let embed_re = Regex::new(&format!(r"(?i)!\[\[([^\]|]+\.(?:{}))\]\]", alternatives))?;

        Ok(Self {
            markdown_re,
            embed_re,
            extensions: normalized,
        })
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// References in one line of text. `line_start` is the document offset of
    /// the line's first byte; returned spans are document-global.
    pub fn scan_line(&self, text: &str, line_start: usize) -> Vec<AudioReference> {
        let mut found: Vec<AudioReference> = Vec::new();

        for caps in self.markdown_re.captures_iter(text) {
            let (Some(whole), Some(src)) = (caps.get(0), caps.get(2)) else {
                continue;
            };
            found.push(AudioReference {
                title: caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default(),
                source_path: src.as_str().to_string(),
                span: line_start + whole.start()..line_start + whole.end(),
                syntax: LinkSyntax::Markdown,
            });
        }

        for caps in self.embed_re.captures_iter(text) {
            let (Some(whole), Some(src)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let source_path = src.as_str().trim().to_string();
            found.push(AudioReference {
                title: title_from_path(&source_path),
                source_path,
                span: line_start + whole.start()..line_start + whole.end(),
                syntax: LinkSyntax::Embed,
            });
        }

        found.sort_by_key(|r| (r.span.start, std::cmp::Reverse(r.span.end)));

        let mut accepted: Vec<AudioReference> = Vec::with_capacity(found.len());
        for reference in found {
            let overlaps = accepted
                .last()
                .map(|last| reference.span.start < last.span.end)
                .unwrap_or(false);
            if !overlaps {
                accepted.push(reference);
            }
        }
        accepted
    }

    /// References in the whole document, in document order.
    pub fn scan_document(&self, doc: &dyn TextDocument) -> Vec<AudioReference> {
        doc.lines()
            .flat_map(|line| self.scan_line(&line.text, line.from))
            .collect()
    }

    /// Whether `text` contains link syntax of either form anywhere.
    ///
    /// Used as the edit guard, so `text` may be inserted text spanning
    /// several lines.
    pub fn contains_audio_link(&self, text: &str) -> bool {
        self.markdown_re.is_match(text) || self.embed_re.is_match(text)
    }

    /// Whether `path` ends in one of the recognized extensions.
    pub fn is_audio_path(&self, path: &str) -> bool {
        let Some(dot) = path.rfind('.') else {
            return false;
        };
        let ext = &path[dot + 1..];
        self.extensions.iter().any(|known| known.eq_ignore_ascii_case(ext))
    }
}
