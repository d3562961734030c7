//! Consensus error types

use chain_core::{Hash, PublicKey, Timestamp};
use thiserror::Error;

/// Consensus error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    /// Roster has not been populated yet
    #[error("Validator set is empty")]
    EmptyValidatorSet,

    /// The last known block claims a slot at or after the next slot
    #[error("Mint the future block: last block at {last_block}, next slot {next_slot}")]
    MintFutureBlock {
        last_block: Timestamp,
        next_slot: Timestamp,
    },

    /// The slot preceding `now` is already occupied
    #[error("Block already created in slot {prev_slot}")]
    BlockAlreadyCreated { prev_slot: Timestamp },

    /// The previous slot's block has not arrived yet
    #[error("Wait for the block of slot {prev_slot} to arrive")]
    WaitForPrevBlock { prev_slot: Timestamp },

    /// Lookup time is not a slot boundary
    #[error("Time {0} is not aligned to a slot boundary")]
    InvalidSlotAlignment(Timestamp),

    /// Block was not produced by the scheduled leader
    #[error("Invalid block validator: slot {slot} belongs to {expected}, got {actual}")]
    InvalidBlockValidator {
        slot: Timestamp,
        expected: PublicKey,
        actual: PublicKey,
    },

    /// A proposal with this hash is already pending
    #[error("Block {0} has already been added")]
    DuplicateBlock(Hash),

    /// No pending proposal with this hash
    #[error("Unknown proposal {0}")]
    UnknownProposal(Hash),

    /// Validator already endorsed this proposal
    #[error("Validator {validator} already endorsed block {hash}")]
    DuplicateEndorsement { hash: Hash, validator: PublicKey },

    /// Validator has not endorsed this proposal
    #[error("Validator {validator} has not endorsed block {hash}")]
    NotEndorsed { hash: Hash, validator: PublicKey },

    /// Signer could not be recovered from the block signature
    #[error("Invalid signature: public key recovery failed: {0}")]
    SignatureRecoveryFailed(String),

    /// Block could not be hashed
    #[error("Invalid block: {0}")]
    InvalidBlock(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Other error
    #[error("Consensus error: {0}")]
    Other(String),
}

/// Coarse classification of consensus errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Roster or configuration problems, fixed by reconfiguring
    Configuration,
    /// Expected outcomes of the slot state machine
    Temporal,
    /// Block produced by the wrong validator
    Authorization,
    /// Pending proposal bookkeeping violations
    Tracking,
    /// Encoding and other unexpected failures
    Internal,
}

impl ConsensusError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConsensusError::EmptyValidatorSet | ConsensusError::Config(_) => {
                ErrorKind::Configuration
            }
            ConsensusError::MintFutureBlock { .. }
            | ConsensusError::BlockAlreadyCreated { .. }
            | ConsensusError::WaitForPrevBlock { .. }
            | ConsensusError::InvalidSlotAlignment(_) => ErrorKind::Temporal,
            ConsensusError::InvalidBlockValidator { .. } => ErrorKind::Authorization,
            ConsensusError::DuplicateBlock(_)
            | ConsensusError::UnknownProposal(_)
            | ConsensusError::DuplicateEndorsement { .. }
            | ConsensusError::NotEndorsed { .. }
            | ConsensusError::SignatureRecoveryFailed(_) => ErrorKind::Tracking,
            ConsensusError::InvalidBlock(_)
            | ConsensusError::Serialization(_)
            | ConsensusError::Other(_) => ErrorKind::Internal,
        }
    }
}

impl From<serde_json::Error> for ConsensusError {
    fn from(err: serde_json::Error) -> Self {
        ConsensusError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for ConsensusError {
    fn from(err: anyhow::Error) -> Self {
        ConsensusError::Other(err.to_string())
    }
}

/// Result type for consensus operations
pub type ConsensusResult<T> = Result<T, ConsensusError>;
