use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Host capability not available: {0}")]
    NotAvailable(String),

    #[error("Host operation failed: {0}")]
    OperationFailed(String),

    #[error("Invalid document range: {0}")]
    InvalidRange(String),

    #[error("Malformed settings data: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
