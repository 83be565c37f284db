use bridge_traits::error::BridgeError;
use core_links::LinkError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReadingError {
    #[error("Failed to insert player container {container_id}: {source}")]
    Insert {
        container_id: String,
        #[source]
        source: BridgeError,
    },

    #[error("Failed to observe player container {container_id}: {source}")]
    Observe {
        container_id: String,
        #[source]
        source: BridgeError,
    },

    #[error("Link error: {0}")]
    Link(#[from] LinkError),
}

pub type Result<T> = std::result::Result<T, ReadingError>;
