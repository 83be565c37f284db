//! Scanner and resolver working together against a mocked vault.

use std::sync::Arc;

use bridge_traits::document::StringDocument;
use bridge_traits::vault::{VaultAccess, VaultFile};
use core_links::{LinkError, LinkScanner, ResourceResolver};
use mockall::mock;

mock! {
    pub Vault {}

    impl VaultAccess for Vault {
        fn file_by_path(&self, path: &str) -> Option<VaultFile>;
        fn attachment_folder(&self) -> Option<String>;
        fn resource_url(&self, file: &VaultFile) -> String;
    }
}

fn vault_with(files: &'static [&'static str], attachments: Option<&'static str>) -> MockVault {
    let mut vault = MockVault::new();
    vault
        .expect_file_by_path()
        .returning(move |path| files.iter().any(|f| *f == path).then(|| VaultFile::from_path(path)));
    vault
        .expect_attachment_folder()
        .returning(move || attachments.map(str::to_string));
    vault
        .expect_resource_url()
        .returning(|file| format!("app://local/{}", file.path.replace(' ', "%20")));
    vault
}

#[test]
fn test_every_link_in_note_resolves() {
    let note = StringDocument::new(
        "# Session\n\
         ![Intro take](recordings/intro.mp3)\n\
         Loop: ![[loops/beat%201.wav]]\n\
         Bed: ![](pad.ogg)",
    );

    let scanner = LinkScanner::new().unwrap();
    let resolver = ResourceResolver::new(Arc::new(vault_with(
        &["recordings/intro.mp3", "loops/beat 1.wav", "attachments/pad.ogg"],
        Some("attachments"),
    )));

    let refs = scanner.scan_document(&note);
    assert_eq!(refs.len(), 3);

    let resolved: Vec<_> = refs
        .iter()
        .map(|r| resolver.resolve(&r.source_path, Some("session.md")).unwrap())
        .collect();

    assert_eq!(resolved[0].url, "app://local/recordings/intro.mp3");
    assert_eq!(resolved[1].url, "app://local/loops/beat 1.wav");
    assert_eq!(resolved[2].file.path, "attachments/pad.ogg");

    assert_eq!(resolved[0].display_title(&refs[0].title), "Intro take");
    assert_eq!(resolved[1].display_title(&refs[1].title), "beat%201");
    assert_eq!(resolved[2].display_title(&refs[2].title), "pad");
}

#[test]
fn test_missing_file_without_attachment_folder() {
    let resolver = ResourceResolver::new(Arc::new(vault_with(&["a.mp3"], None)));

    let err = resolver.resolve("missing.mp3", None).unwrap_err();
    assert!(matches!(err, LinkError::NotFound(_)));
    assert_eq!(err.to_string(), "Audio file not found: missing.mp3");
}
