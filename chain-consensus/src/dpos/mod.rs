//! Delegated proof of stake leader election
//!
//! Time is cut into fixed-width slots. Within an epoch the slots rotate
//! round-robin through the trusted validator roster, and only the validator
//! scheduled for the slot preceding `now` may have produced the next block.

pub mod election;
pub mod epoch;
pub mod validator_set;

pub use election::Dpos;
pub use epoch::EpochSchedule;
pub use validator_set::ValidatorSet;

use chain_core::Timestamp;

/// Default slot width in seconds
pub const BLOCK_INTERVAL: Timestamp = 10;

/// Default epoch length in seconds
pub const EPOCH_INTERVAL: Timestamp = 86400;

/// Default maximum roster size
pub const MAX_VALIDATOR_SIZE: usize = 21;
