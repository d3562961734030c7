//! Blockchain consensus engine
//!
//! This crate provides the DPoS/PBFT consensus core: round-robin leader
//! election over a trusted validator roster, and tracking of validator
//! endorsements for proposed blocks.

pub mod config;
pub mod dpos;
pub mod error;
pub mod pbft;
pub mod traits;

pub use config::ConsensusConfig;
pub use dpos::{Dpos, EpochSchedule, ValidatorSet};
pub use error::{ConsensusError, ConsensusResult, ErrorKind};
pub use pbft::{quorum_size, EndorsementTracker, PendingProposal};
pub use traits::{IdentityRecovery, Secp256k1Recovery, SlotStamped};
