//! PBFT-style endorsement tracking
//!
//! Proposed blocks wait here while validators endorse them. The tracker only
//! counts distinct endorsers; the caller compares the count against its quorum
//! and deletes the proposal once it commits or abandons the block.

pub mod tracker;

pub use tracker::{EndorsementTracker, PendingProposal};

/// Endorsements needed to finalize a block with `validator_count` validators
pub fn quorum_size(validator_count: usize) -> usize {
    validator_count * 2 / 3 + 1
}
