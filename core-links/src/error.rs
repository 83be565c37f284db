use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Invalid link pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("At least one audio extension is required")]
    NoExtensions,

    #[error("Invalid audio extension: {0:?}")]
    InvalidExtension(String),

    #[error("Audio file not found: {0}")]
    NotFound(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

pub type Result<T> = std::result::Result<T, LinkError>;
