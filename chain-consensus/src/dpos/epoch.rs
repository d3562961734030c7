//! Slot arithmetic and the round-robin schedule

use super::{ValidatorSet, BLOCK_INTERVAL, EPOCH_INTERVAL};
use crate::{ConsensusError, ConsensusResult};
use chain_core::{PublicKey, Timestamp};

/// Maps slot-aligned times to the validator scheduled for them
///
/// The schedule restarts at every epoch boundary and rotates through the
/// current roster, so the same `(slot_time, roster)` pair always yields the
/// same validator on every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochSchedule {
    block_interval: Timestamp,
    epoch_length: Timestamp,
}

impl Default for EpochSchedule {
    fn default() -> Self {
        Self {
            block_interval: BLOCK_INTERVAL,
            epoch_length: EPOCH_INTERVAL,
        }
    }
}

impl EpochSchedule {
    /// Create a schedule; the epoch must hold a whole number of slots
    pub fn new(block_interval: Timestamp, epoch_length: Timestamp) -> ConsensusResult<Self> {
        if block_interval == 0 {
            return Err(ConsensusError::Config(
                "Block interval must be greater than 0".to_string(),
            ));
        }

        if epoch_length == 0 || epoch_length % block_interval != 0 {
            return Err(ConsensusError::Config(format!(
                "Epoch length {} must be a positive multiple of the block interval {}",
                epoch_length, block_interval
            )));
        }

        Ok(Self {
            block_interval,
            epoch_length,
        })
    }

    pub fn block_interval(&self) -> Timestamp {
        self.block_interval
    }

    pub fn epoch_length(&self) -> Timestamp {
        self.epoch_length
    }

    /// Greatest slot strictly before `now` (saturates at 0)
    pub fn prev_slot(&self, now: Timestamp) -> Timestamp {
        now.saturating_sub(1) / self.block_interval * self.block_interval
    }

    /// Smallest slot at or after `now`
    ///
    /// Past the last representable slot this clamps to that slot, so the
    /// result is always slot-aligned.
    pub fn next_slot(&self, now: Timestamp) -> Timestamp {
        now.div_ceil(self.block_interval)
            .checked_mul(self.block_interval)
            .unwrap_or(Timestamp::MAX / self.block_interval * self.block_interval)
    }

    /// Position of a slot within its epoch
    pub fn slot_index(&self, slot_time: Timestamp) -> ConsensusResult<u64> {
        let offset = slot_time % self.epoch_length;
        if offset % self.block_interval != 0 {
            return Err(ConsensusError::InvalidSlotAlignment(slot_time));
        }
        Ok(offset / self.block_interval)
    }

    /// Validator scheduled for a slot-aligned time
    pub fn lookup_validator(
        &self,
        slot_time: Timestamp,
        validators: &ValidatorSet,
    ) -> ConsensusResult<PublicKey> {
        let index = self.slot_index(slot_time)?;
        let roster = validators.validators()?;
        let position = (index % roster.len() as u64) as usize;
        Ok(roster[position])
    }
}
