//! Per-node block production gate

use super::{EpochSchedule, ValidatorSet};
use crate::config::ConsensusConfig;
use crate::traits::SlotStamped;
use crate::{ConsensusError, ConsensusResult};
use chain_core::{PublicKey, Timestamp};
use parking_lot::RwLock;
use tracing::{debug, info, trace};

/// DPoS leader election for one node
///
/// Leadership checks take the roster lock shared; `set_trust_node` takes it
/// exclusively, so a roster swap is never observed half-applied.
#[derive(Debug)]
pub struct Dpos {
    /// This node's own identity
    signer: RwLock<PublicKey>,
    /// Trusted validator roster
    validators: RwLock<ValidatorSet>,
    /// Slot timing
    schedule: EpochSchedule,
}

impl Dpos {
    /// Create a leader election gate with an empty roster
    pub fn new(signer: PublicKey, schedule: EpochSchedule) -> Self {
        Self {
            signer: RwLock::new(signer),
            validators: RwLock::new(ValidatorSet::default()),
            schedule,
        }
    }

    /// Create from configuration, installing its trust nodes as the roster
    pub fn from_config(config: &ConsensusConfig, signer: PublicKey) -> ConsensusResult<Self> {
        config.validate()?;

        let dpos = Self::new(signer, config.schedule()?);
        dpos.set_trust_node(config.to_validators()?);
        Ok(dpos)
    }

    /// Replace the roster
    pub fn set_trust_node(&self, trusts: Vec<PublicKey>) {
        let mut validators = self.validators.write();
        validators.set_validators(trusts);
        info!("Trust nodes updated, {} validators", validators.len());
    }

    /// Snapshot of the current roster
    pub fn validators(&self) -> ConsensusResult<Vec<PublicKey>> {
        Ok(self.validators.read().validators()?.to_vec())
    }

    /// This node's identity
    pub fn signer(&self) -> PublicKey {
        *self.signer.read()
    }

    /// Replace this node's identity
    pub fn set_signer(&self, signer: PublicKey) {
        info!("Signer set to {}", signer);
        *self.signer.write() = signer;
    }

    pub fn schedule(&self) -> &EpochSchedule {
        &self.schedule
    }

    /// Classify the gap between the last known block and the current slot
    pub fn check_deadline<B>(&self, last_block: &B, now: Timestamp) -> ConsensusResult<()>
    where
        B: SlotStamped + ?Sized,
    {
        let last = last_block.slot_time();
        let prev_slot = self.schedule.prev_slot(now);
        let next_slot = self.schedule.next_slot(now);
        trace!(prev_slot, next_slot, now, last, "Checking deadline");

        if last >= next_slot {
            return Err(ConsensusError::MintFutureBlock {
                last_block: last,
                next_slot,
            });
        }
        if last >= prev_slot {
            return Err(ConsensusError::BlockAlreadyCreated { prev_slot });
        }
        if last < prev_slot {
            return Ok(());
        }

        // Integer timestamps are fully classified above
        Err(ConsensusError::WaitForPrevBlock { prev_slot })
    }

    /// Validator scheduled for the slot preceding `now`
    pub fn leader_at(&self, now: Timestamp) -> ConsensusResult<PublicKey> {
        let validators = self.validators.read();
        self.schedule
            .lookup_validator(self.schedule.prev_slot(now), &validators)
    }

    /// Check that this node may produce the block following `last_block`
    pub fn check_validator<B>(&self, last_block: &B, now: Timestamp) -> ConsensusResult<()>
    where
        B: SlotStamped + ?Sized,
    {
        let signer = self.signer();
        self.check_block_producer(last_block, now, &signer)
    }

    /// Check that `producer` is the rightful leader for the block following `last_block`
    pub fn check_block_producer<B>(
        &self,
        last_block: &B,
        now: Timestamp,
        producer: &PublicKey,
    ) -> ConsensusResult<()>
    where
        B: SlotStamped + ?Sized,
    {
        self.check_deadline(last_block, now)?;

        let slot = self.schedule.prev_slot(now);
        let expected = self.leader_at(now)?;
        if expected != *producer {
            return Err(ConsensusError::InvalidBlockValidator {
                slot,
                expected,
                actual: *producer,
            });
        }

        debug!("Validator {} is the leader for slot {}", producer, slot);
        Ok(())
    }
}
