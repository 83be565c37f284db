//! Directory-backed vault implementation

use bridge_traits::{
    error::{BridgeError, Result},
    vault::{VaultAccess, VaultFile},
};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Vault over a directory tree on disk.
///
/// Files are indexed once by [`FsVault::open`] (and again on
/// [`FsVault::refresh`]); lookups are answered from the in-memory index.
/// Hidden entries (names starting with `.`) are not indexed.
pub struct FsVault {
    root: PathBuf,
    attachment_folder: Option<String>,
    index: RwLock<BTreeSet<String>>,
}

impl FsVault {
    /// Index the directory at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let metadata = fs::metadata(&root).await.map_err(BridgeError::Io)?;
        if !metadata.is_dir() {
            return Err(BridgeError::OperationFailed(format!(
                "vault root {} is not a directory",
                root.display()
            )));
        }

        let index = scan(&root).await?;
        debug!(root = ?root, files = index.len(), "Indexed vault");

        Ok(Self {
            root,
            attachment_folder: None,
            index: RwLock::new(index),
        })
    }

    /// Use `folder` (vault-relative) as the attachment folder.
    pub fn with_attachment_folder(mut self, folder: impl Into<String>) -> Self {
        let folder = folder.into();
        let trimmed = folder.trim_matches('/').to_string();
        self.attachment_folder = (!trimmed.is_empty()).then_some(trimmed);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of indexed files.
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    /// Re-read the directory tree.
    pub async fn refresh(&self) -> Result<()> {
        let index = scan(&self.root).await?;
        debug!(files = index.len(), "Refreshed vault index");
        *self.index.write() = index;
        Ok(())
    }

    fn folder_of(path: &str) -> &str {
        path.rfind('/').map(|i| &path[..i]).unwrap_or("")
    }
}

async fn scan(root: &Path) -> Result<BTreeSet<String>> {
    let mut files = BTreeSet::new();
    let mut pending = vec![(root.to_path_buf(), String::new())];

    while let Some((dir, prefix)) = pending.pop() {
        let mut entries = fs::read_dir(&dir).await.map_err(BridgeError::Io)?;

        while let Some(entry) = entries.next_entry().await.map_err(BridgeError::Io)? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }

            let relative = if prefix.is_empty() {
                name
            } else {
                format!("{}/{}", prefix, name)
            };

            let file_type = entry.file_type().await.map_err(BridgeError::Io)?;
            if file_type.is_dir() {
                pending.push((entry.path(), relative));
            } else if file_type.is_file() {
                files.insert(relative);
            }
        }
    }

    Ok(files)
}

impl VaultAccess for FsVault {
    fn file_by_path(&self, path: &str) -> Option<VaultFile> {
        let normalized = path.trim_start_matches('/');
        self.index
            .read()
            .contains(normalized)
            .then(|| VaultFile::from_path(normalized))
    }

    fn attachment_folder(&self) -> Option<String> {
        self.attachment_folder.clone()
    }

    fn resource_url(&self, file: &VaultFile) -> String {
        let absolute = self.root.join(&file.path);
        let absolute = absolute.to_string_lossy().replace('\\', "/");
        let encoded: Vec<String> = absolute
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        let joined = encoded.join("/");

        if joined.starts_with('/') {
            format!("file://{}", joined)
        } else {
            format!("file:///{}", joined)
        }
    }

    /// Match files whose path ends with `link`, preferring the folder of the
    /// source note and then the shortest path.
    fn resolve_link_path(&self, link: &str, source_note: Option<&str>) -> Option<VaultFile> {
        let link = link.trim_start_matches('/');
        if link.is_empty() {
            return None;
        }

        let suffix = format!("/{}", link);
        let source_folder = source_note.map(Self::folder_of);
        let index = self.index.read();

        index
            .iter()
            .filter(|path| path.as_str() == link || path.ends_with(&suffix))
            .min_by_key(|path| {
                let same_folder = source_folder
                    .map(|folder| Self::folder_of(path) == folder)
                    .unwrap_or(false);
                (!same_folder, path.len())
            })
            .map(|path| VaultFile::from_path(path.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn vault_with(files: &[&str]) -> (TempDir, FsVault) {
        let dir = TempDir::new().unwrap();
        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).await.unwrap();
            fs::write(&path, b"RIFF").await.unwrap();
        }
        let vault = FsVault::open(dir.path()).await.unwrap();
        (dir, vault)
    }

    #[tokio::test]
    async fn test_indexes_nested_files_and_skips_hidden() {
        let (_dir, vault) = vault_with(&[
            "a.mp3",
            "sounds/b.wav",
            "sounds/loops/c.ogg",
            ".obsidian/plugins/x.mp3",
        ])
        .await;

        assert_eq!(vault.len(), 3);
        assert!(vault.file_by_path("sounds/loops/c.ogg").is_some());
        assert!(vault.file_by_path(".obsidian/plugins/x.mp3").is_none());

        let file = vault.file_by_path("sounds/b.wav").unwrap();
        assert_eq!(file.basename, "b");
        assert_eq!(file.extension, "wav");
    }

    #[tokio::test]
    async fn test_open_rejects_file_root() {
        let (dir, _vault) = vault_with(&["a.mp3"]).await;
        let result = FsVault::open(dir.path().join("a.mp3")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_attachment_folder_is_normalized() {
        let (_dir, vault) = vault_with(&[]).await;
        let vault = vault.with_attachment_folder("/attachments/");
        assert_eq!(vault.attachment_folder(), Some("attachments".to_string()));

        let (_dir, vault) = vault_with(&[]).await;
        let vault = vault.with_attachment_folder("/");
        assert_eq!(vault.attachment_folder(), None);
    }

    #[tokio::test]
    async fn test_resource_url_is_percent_encoded() {
        let (dir, vault) = vault_with(&["field notes/rain drops.mp3"]).await;
        let file = vault.file_by_path("field notes/rain drops.mp3").unwrap();

        let url = vault.resource_url(&file);
        assert!(url.starts_with("file:///"));
        assert!(url.ends_with("/field%20notes/rain%20drops.mp3"));

        let decoded = urlencoding::decode(&url).unwrap();
        let root = dir.path().to_string_lossy().replace('\\', "/");
        assert!(decoded.contains(root.trim_start_matches('/')));
    }

    #[tokio::test]
    async fn test_resolve_link_prefers_same_folder_then_shortest() {
        let (_dir, vault) = vault_with(&[
            "archive/2023/take.mp3",
            "music/take.mp3",
            "journal/take.mp3",
        ])
        .await;

        let from_journal = vault
            .resolve_link_path("take.mp3", Some("journal/today.md"))
            .unwrap();
        assert_eq!(from_journal.path, "journal/take.mp3");

        let from_root = vault.resolve_link_path("take.mp3", Some("index.md")).unwrap();
        assert_eq!(from_root.path, "music/take.mp3");

        assert!(vault.resolve_link_path("missing.mp3", None).is_none());
        assert!(vault.resolve_link_path("", None).is_none());
    }

    #[tokio::test]
    async fn test_refresh_picks_up_new_files() {
        let (dir, vault) = vault_with(&["a.mp3"]).await;
        assert!(vault.file_by_path("new.wav").is_none());

        fs::write(dir.path().join("new.wav"), b"RIFF").await.unwrap();
        vault.refresh().await.unwrap();

        assert!(vault.file_by_path("new.wav").is_some());
        assert_eq!(vault.len(), 2);
    }
}
