//! Consensus configuration

use crate::dpos::{EpochSchedule, BLOCK_INTERVAL, EPOCH_INTERVAL, MAX_VALIDATOR_SIZE};
use crate::pbft::quorum_size;
use crate::{ConsensusError, ConsensusResult};
use chain_core::PublicKey;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// DPoS/PBFT consensus configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Slot width in seconds
    pub block_interval: u64,
    /// Epoch length in seconds
    pub epoch_length: u64,
    /// Maximum roster size
    pub max_validators: usize,
    /// Hex encoded validator public keys, in production order
    pub trust_nodes: Vec<String>,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            block_interval: BLOCK_INTERVAL,
            epoch_length: EPOCH_INTERVAL,
            max_validators: MAX_VALIDATOR_SIZE,
            trust_nodes: vec![],
        }
    }
}

impl ConsensusConfig {
    /// Create a configuration with default timing and the given roster
    pub fn new(trust_nodes: Vec<String>) -> Self {
        Self {
            trust_nodes,
            ..Self::default()
        }
    }

    /// Load configuration from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ConsensusResult<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| ConsensusError::Config(format!("Failed to read config file: {}", e)))?;

        let config: ConsensusConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> ConsensusResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), content)
            .map_err(|e| ConsensusError::Config(format!("Failed to write config file: {}", e)))?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConsensusResult<()> {
        self.schedule()?;

        if self.max_validators == 0 {
            return Err(ConsensusError::Config(
                "Max validators must be greater than 0".to_string(),
            ));
        }

        if self.trust_nodes.len() > self.max_validators {
            return Err(ConsensusError::Config(format!(
                "{} trust nodes exceed the maximum of {}",
                self.trust_nodes.len(),
                self.max_validators
            )));
        }

        self.to_validators()?;
        Ok(())
    }

    /// Decode the trust nodes into the initial roster
    pub fn to_validators(&self) -> ConsensusResult<Vec<PublicKey>> {
        self.trust_nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                PublicKey::from_hex(node).map_err(|e| {
                    ConsensusError::Config(format!("Invalid trust node {}: {}", i, e))
                })
            })
            .collect()
    }

    /// Slot schedule described by this configuration
    pub fn schedule(&self) -> ConsensusResult<EpochSchedule> {
        EpochSchedule::new(self.block_interval, self.epoch_length)
    }

    /// Endorsements needed for a full roster
    pub fn safe_size(&self) -> usize {
        quorum_size(self.max_validators)
    }

    /// Set block interval
    pub fn with_block_interval(mut self, interval: u64) -> Self {
        self.block_interval = interval;
        self
    }

    /// Set epoch length
    pub fn with_epoch_length(mut self, length: u64) -> Self {
        self.epoch_length = length;
        self
    }
}

/// Trust node keys for testing
#[cfg(test)]
pub(crate) fn test_trust_nodes(count: u8) -> Vec<String> {
    (1..=count)
        .map(|seed| {
            chain_core::Keypair::from_secret_bytes(&[seed; 32])
                .unwrap()
                .public_key()
                .to_hex()
        })
        .collect()
}
