//! # Resource Resolver
//!
//! Maps a link target as written in a note to a vault file and a URL the
//! player can stream from.
//!
//! Lookup order:
//! 1. the percent-decoded target as a vault path
//! 2. `<attachment folder>/<decoded target>`
//! 3. `<attachment folder>/<target as written>`
//! 4. the host's own link resolution, relative to the containing note

use std::borrow::Cow;
use std::sync::Arc;

use bridge_traits::vault::{VaultAccess, VaultFile};
use tracing::trace;

use crate::error::{LinkError, Result};

/// A link target resolved to a playable resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResource {
    pub file: VaultFile,
    /// Percent-decoded resource URL.
    pub url: String,
}

impl ResolvedResource {
    /// `title` when non-empty, otherwise the file's basename.
    pub fn display_title(&self, title: &str) -> String {
        if title.is_empty() {
            self.file.basename.clone()
        } else {
            title.to_string()
        }
    }
}

/// Percent-decode `text`, keeping it as-is when the result is not UTF-8.
fn decode(text: &str) -> Cow<'_, str> {
    match urlencoding::decode(text) {
        Ok(decoded) => decoded,
        Err(_) => Cow::Borrowed(text),
    }
}

pub struct ResourceResolver {
    vault: Arc<dyn VaultAccess>,
}

impl ResourceResolver {
    pub fn new(vault: Arc<dyn VaultAccess>) -> Self {
        Self { vault }
    }

    /// Locate the vault file a link points to.
    pub fn find_file(&self, src: &str, source_note: Option<&str>) -> Option<VaultFile> {
        let decoded = decode(src);

        if let Some(file) = self.vault.file_by_path(&decoded) {
            return Some(file);
        }

        if let Some(folder) = self.vault.attachment_folder() {
            let folder = folder.trim_end_matches('/');
            let candidates = [
                format!("{}/{}", folder, decoded),
                format!("{}/{}", folder, src),
            ];
            for candidate in candidates {
                trace!(candidate = %candidate, "Trying attachment folder");
                if let Some(file) = self.vault.file_by_path(&candidate) {
                    return Some(file);
                }
            }
        }

        self.vault.resolve_link_path(&decoded, source_note)
    }

    /// Resolve a link to a file and its decoded resource URL.
    pub fn resolve(&self, src: &str, source_note: Option<&str>) -> Result<ResolvedResource> {
        let file = self
            .find_file(src, source_note)
            .ok_or_else(|| LinkError::NotFound(src.to_string()))?;
        let url = decode(&self.vault.resource_url(&file)).into_owned();

        trace!(src = %src, path = %file.path, "Resolved audio link");
        Ok(ResolvedResource { file, url })
    }
}

impl std::fmt::Debug for ResourceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceResolver")
            .field("attachment_folder", &self.vault.attachment_folder())
            .finish()
    }
}
