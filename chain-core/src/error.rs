//! Error types for the core crate

use thiserror::Error;

/// Core blockchain errors
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    #[error("Bincode error: {0}")]
    Bincode(String),
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;
