//! Capabilities the consensus core consumes from its collaborators

use chain_core::{
    recover_public_key, Block, BlockHeader, CoreResult, Hash, PublicKey, Signature, SignedBlock,
    Timestamp,
};

/// Anything that claims to occupy a slot
pub trait SlotStamped {
    /// The slot time the block claims
    fn slot_time(&self) -> Timestamp;
}

impl SlotStamped for BlockHeader {
    fn slot_time(&self) -> Timestamp {
        self.timestamp
    }
}

impl SlotStamped for Block {
    fn slot_time(&self) -> Timestamp {
        self.header.timestamp
    }
}

impl SlotStamped for SignedBlock {
    fn slot_time(&self) -> Timestamp {
        self.timestamp()
    }
}

impl SlotStamped for Timestamp {
    fn slot_time(&self) -> Timestamp {
        *self
    }
}

/// Recovers the identity that produced a signature
pub trait IdentityRecovery: Send + Sync {
    /// Recover the signer of `hash`
    fn recover_identity(&self, signature: &Signature, hash: &Hash) -> CoreResult<PublicKey>;
}

/// secp256k1 public key recovery
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Recovery;

impl IdentityRecovery for Secp256k1Recovery {
    fn recover_identity(&self, signature: &Signature, hash: &Hash) -> CoreResult<PublicKey> {
        recover_public_key(signature, hash)
    }
}
