//! Vault Access Abstractions
//!
//! The vault is the host's view of the note collection on disk. The core asks
//! it three things: does a file exist at a path, where do attachments live,
//! and what URL can a player stream a file from.

use serde::{Deserialize, Serialize};

use crate::platform::PlatformSendSync;

/// A file known to the vault.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VaultFile {
    /// Vault-relative path using `/` separators (e.g. `sounds/a.mp3`).
    pub path: String,
    /// File name without directory or extension (e.g. `a`).
    pub basename: String,
    /// Extension without the dot (e.g. `mp3`).
    pub extension: String,
}

impl VaultFile {
    /// Build a file descriptor from a vault-relative path.
    pub fn from_path(path: impl Into<String>) -> Self {
        let path = path.into();
        let name = path.rsplit('/').next().unwrap_or(path.as_str());
        let (basename, extension) = match name.rfind('.') {
            Some(dot) if dot > 0 => (name[..dot].to_string(), name[dot + 1..].to_string()),
            _ => (name.to_string(), String::new()),
        };

        Self {
            path,
            basename,
            extension,
        }
    }
}

/// Vault access trait
///
/// Lookups are synchronous: hosts keep an in-memory index of vault files and
/// the resolver runs inside deferred mount callbacks.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::vault::VaultAccess;
///
/// fn playable_url(vault: &dyn VaultAccess, path: &str) -> Option<String> {
///     let file = vault.file_by_path(path)?;
///     Some(vault.resource_url(&file))
/// }
/// ```
pub trait VaultAccess: PlatformSendSync {
    /// Exact lookup by vault-relative path.
    fn file_by_path(&self, path: &str) -> Option<VaultFile>;

    /// Configured attachment folder, if the user set one.
    fn attachment_folder(&self) -> Option<String>;

    /// URL the player component can load the file from. May be
    /// percent-encoded; callers decode it.
    fn resource_url(&self, file: &VaultFile) -> String;

    /// Host-native link resolution (shortest-path or alias matching),
    /// relative to the note that contains the link.
    ///
    /// Hosts without such a facility keep the default.
    fn resolve_link_path(&self, _link: &str, _source_note: Option<&str>) -> Option<VaultFile> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vault_file_from_nested_path() {
        let file = VaultFile::from_path("sounds/loops/drum beat.wav");
        assert_eq!(file.basename, "drum beat");
        assert_eq!(file.extension, "wav");
        assert_eq!(file.path, "sounds/loops/drum beat.wav");
    }

    #[test]
    fn test_vault_file_keeps_inner_dots() {
        let file = VaultFile::from_path("take.2.final.mp3");
        assert_eq!(file.basename, "take.2.final");
        assert_eq!(file.extension, "mp3");
    }

    #[test]
    fn test_vault_file_without_extension() {
        let file = VaultFile::from_path("notes/.hidden");
        assert_eq!(file.basename, ".hidden");
        assert_eq!(file.extension, "");
    }
}
