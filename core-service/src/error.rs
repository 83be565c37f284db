use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Plugin is not loaded")]
    NotLoaded,

    #[error("Unknown setting: {0}")]
    UnknownSetting(String),

    #[error("Invalid value {value:?} for setting {key}")]
    InvalidSettingValue { key: String, value: String },

    /// Settings were applied in memory but could not be written.
    #[error("Failed to persist settings version {version}: {source}")]
    Persistence {
        version: u64,
        #[source]
        source: core_runtime::Error,
    },

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Link error: {0}")]
    Link(#[from] core_links::LinkError),

    #[error("Editor error: {0}")]
    Editor(#[from] core_editor::EditorError),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
