//! JSON file settings store

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SettingsStore,
};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

const APP_DIR: &str = "waveform-player";
const FILE_NAME: &str = "settings.json";

/// Settings store persisting the plugin document as pretty-printed JSON.
///
/// Writes go to a sibling temporary file first and are renamed into place,
/// so a crash mid-save never leaves a truncated document behind.
#[derive(Debug, Clone)]
pub struct JsonFileSettingsStore {
    path: PathBuf,
}

impl JsonFileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under the user's config directory
    /// (`<config_dir>/waveform-player/settings.json`).
    pub fn default_location() -> Result<Self> {
        let base = dirs::config_dir().ok_or_else(|| {
            BridgeError::NotAvailable("no user config directory on this platform".to_string())
        })?;
        Ok(Self::new(base.join(APP_DIR).join(FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| FILE_NAME.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SettingsStore for JsonFileSettingsStore {
    async fn load(&self) -> Result<Option<Value>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = ?self.path, "No settings file yet");
                return Ok(None);
            }
            Err(e) => return Err(BridgeError::Io(e)),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            warn!(path = ?self.path, "Settings file is empty; treating as unset");
            return Ok(None);
        }

        let value = serde_json::from_slice(&bytes)?;
        Ok(Some(value))
    }

    async fn save(&self, data: &Value) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let body = serde_json::to_vec_pretty(data)?;
        let temp = self.temp_path();
        fs::write(&temp, &body).await?;
        fs::rename(&temp, &self.path).await?;

        debug!(path = ?self.path, bytes = body.len(), "Saved settings");
        Ok(())
    }
}
