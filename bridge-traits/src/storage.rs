//! Settings Storage Abstractions
//!
//! Plugin settings are persisted by the host as a single JSON document.

use serde_json::Value;

use crate::{error::Result, platform::PlatformSendSync};

/// Settings store trait
///
/// Abstracts the host's plugin data persistence:
/// - **Desktop app**: the plugin's `data.json`
/// - **Headless/CLI**: a JSON file in the user's config directory
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
/// use serde_json::json;
///
/// async fn reset(store: &dyn SettingsStore) -> Result<()> {
///     store.save(&json!({ "samplePoints": 200 })).await
/// }
/// ```
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait SettingsStore: PlatformSendSync {
    /// Load the persisted document. `None` when nothing has been saved yet.
    async fn load(&self) -> Result<Option<Value>>;

    /// Replace the persisted document.
    async fn save(&self, data: &Value) -> Result<()>;
}
