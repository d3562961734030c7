//! Core blockchain data structures and cryptographic capabilities
//!
//! This crate provides the building blocks the consensus core consumes:
//! - Basic types (Hash, Timestamp, BlockNumber)
//! - Block, block header and signed block structures
//! - secp256k1 signing and public key recovery

pub mod block;
pub mod crypto;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use block::*;
pub use crypto::*;
pub use error::*;
pub use types::*;
