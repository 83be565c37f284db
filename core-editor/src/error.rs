use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Editor session already destroyed")]
    SessionDestroyed,

    #[error("Scheduling failed: {0}")]
    Scheduling(#[from] bridge_traits::error::BridgeError),

    #[error("Link error: {0}")]
    Link(#[from] core_links::LinkError),
}

pub type Result<T> = std::result::Result<T, EditorError>;
