//! Block data structures and operations

use crate::{
    recover_public_key, BlockNumber, CoreError, CoreResult, Hash, Keypair, PublicKey, Signature,
    Timestamp,
};
use serde::{Deserialize, Serialize};

/// Current block format version
pub const BLOCK_VERSION: u32 = 1;

/// Block header containing metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode)]
pub struct BlockHeader {
    /// Block format version
    pub version: u32,
    /// Hash of the parent block
    pub parent_hash: Hash,
    /// Block number (height)
    pub number: BlockNumber,
    /// Slot time the block claims to occupy, in seconds
    pub timestamp: Timestamp,
    /// Keccak256 of the block body
    pub body_hash: Hash,
    /// Total fee collected by this block
    pub fee: u64,
}

impl BlockHeader {
    /// Calculate the hash of this block header
    pub fn hash(&self) -> CoreResult<Hash> {
        let encoded = bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| CoreError::Bincode(e.to_string()))?;
        Ok(Hash::keccak256(&encoded))
    }

    /// Get the genesis block header
    pub fn genesis() -> Self {
        Self {
            version: BLOCK_VERSION,
            parent_hash: Hash::zero(),
            number: 0,
            timestamp: 0,
            body_hash: Hash::keccak256(&[]),
            fee: 0,
        }
    }
}

/// Complete block with header and an opaque body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block header
    pub header: BlockHeader,
    /// Encoded block body
    pub body: Vec<u8>,
}

impl Block {
    /// Create the child of `parent` occupying `timestamp`
    pub fn new(
        parent: &BlockHeader,
        timestamp: Timestamp,
        body: Vec<u8>,
        fee: u64,
    ) -> CoreResult<Self> {
        let header = BlockHeader {
            version: BLOCK_VERSION,
            parent_hash: parent.hash()?,
            number: parent.number + 1,
            timestamp,
            body_hash: Hash::keccak256(&body),
            fee,
        };

        Ok(Self { header, body })
    }

    /// Create genesis block
    pub fn genesis() -> Self {
        Self {
            header: BlockHeader::genesis(),
            body: Vec::new(),
        }
    }

    /// Get the block hash (same as header hash)
    pub fn hash(&self) -> CoreResult<Hash> {
        self.header.hash()
    }

    /// Check that the header commits to the body
    pub fn verify_body(&self) -> bool {
        Hash::keccak256(&self.body) == self.header.body_hash
    }

    /// Check if block is genesis
    pub fn is_genesis(&self) -> bool {
        self.header.number == 0 && self.header.parent_hash == Hash::zero()
    }
}

/// Block with its producer's signature over the header hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBlock {
    pub block: Block,
    pub signature: Signature,
}

impl SignedBlock {
    /// Sign `block` with the producer's key
    pub fn sign(block: Block, keypair: &Keypair) -> CoreResult<Self> {
        let header_hash = block.header.hash()?;
        let signature = keypair.sign_hash(&header_hash);
        Ok(Self { block, signature })
    }

    /// Content hash identifying this block
    pub fn hash(&self) -> CoreResult<Hash> {
        self.block.hash()
    }

    /// Hash the signature was produced over
    pub fn header_hash(&self) -> CoreResult<Hash> {
        self.block.header.hash()
    }

    /// Claimed slot time
    pub fn timestamp(&self) -> Timestamp {
        self.block.header.timestamp
    }

    /// Recover the producer's identity from the signature
    pub fn signer(&self) -> CoreResult<PublicKey> {
        recover_public_key(&self.signature, &self.header_hash()?)
    }
}
