//! Trusted validator roster

use crate::{ConsensusError, ConsensusResult};
use chain_core::PublicKey;
use std::collections::HashSet;
use tracing::debug;

/// Ordered, deduplicated list of validator identities
///
/// Insertion order is the production schedule. An empty set is a valid
/// transient state but every lookup against it fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatorSet {
    validators: Vec<PublicKey>,
}

impl ValidatorSet {
    /// Create a validator set from an ordered roster
    pub fn new(validators: Vec<PublicKey>) -> Self {
        let mut set = Self::default();
        set.set_validators(validators);
        set
    }

    /// Replace the whole roster; repeated identities keep their first position
    pub fn set_validators(&mut self, mut validators: Vec<PublicKey>) {
        let mut seen = HashSet::with_capacity(validators.len());
        validators.retain(|validator| {
            let first = seen.insert(*validator);
            if !first {
                debug!("Dropping duplicate validator {}", validator);
            }
            first
        });
        self.validators = validators;
    }

    /// Get the current roster
    pub fn validators(&self) -> ConsensusResult<&[PublicKey]> {
        if self.validators.is_empty() {
            return Err(ConsensusError::EmptyValidatorSet);
        }
        Ok(&self.validators)
    }

    /// Position of a validator in the schedule
    pub fn position(&self, validator: &PublicKey) -> Option<usize> {
        self.validators.iter().position(|v| v == validator)
    }

    /// Check roster membership
    pub fn contains(&self, validator: &PublicKey) -> bool {
        self.position(validator).is_some()
    }

    /// Get total number of validators
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Check if the roster is empty
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}
