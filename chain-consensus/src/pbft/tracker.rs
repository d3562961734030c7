//! Pending proposals and their endorsers

use crate::traits::{IdentityRecovery, Secp256k1Recovery};
use crate::{ConsensusError, ConsensusResult};
use chain_core::{Hash, PublicKey, SignedBlock};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A proposed block and the distinct validators that endorsed it
#[derive(Debug, Clone)]
pub struct PendingProposal {
    block: SignedBlock,
    /// Endorsers in first-seen order; the proposer is always first
    endorsers: Vec<PublicKey>,
}

impl PendingProposal {
    pub fn block(&self) -> &SignedBlock {
        &self.block
    }

    pub fn endorsers(&self) -> &[PublicKey] {
        &self.endorsers
    }

    /// The validator that signed the block
    pub fn proposer(&self) -> Option<&PublicKey> {
        self.endorsers.first()
    }

    pub fn into_block(self) -> SignedBlock {
        self.block
    }

    fn has_endorsed(&self, validator: &PublicKey) -> bool {
        self.endorsers.contains(validator)
    }
}

/// Tracks proposed-but-unconfirmed blocks
///
/// A single lock guards the whole map: every operation is atomic with respect
/// to every other, including the duplicate check, signer recovery and
/// self-endorsement performed by [`add_signed_block`](Self::add_signed_block).
/// Entries never expire on their own.
pub struct EndorsementTracker<R = Secp256k1Recovery> {
    recovery: R,
    pending: Mutex<HashMap<Hash, PendingProposal>>,
}

impl EndorsementTracker {
    /// Create a tracker recovering signers with secp256k1
    pub fn new() -> Self {
        Self::with_recovery(Secp256k1Recovery)
    }
}

impl Default for EndorsementTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: IdentityRecovery> EndorsementTracker<R> {
    /// Create a tracker with a custom signer recovery
    pub fn with_recovery(recovery: R) -> Self {
        Self {
            recovery,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Start tracking a proposed block, endorsed by its own signer
    ///
    /// Returns the block hash the proposal is tracked under. A block whose
    /// body does not match its header, or whose signer cannot be recovered,
    /// is not tracked.
    pub fn add_signed_block(&self, block: SignedBlock) -> ConsensusResult<Hash> {
        if !block.block.verify_body() {
            return Err(ConsensusError::InvalidBlock(
                "body does not match header body hash".to_string(),
            ));
        }

        let hash = block
            .hash()
            .map_err(|e| ConsensusError::InvalidBlock(e.to_string()))?;
        let header_hash = block
            .header_hash()
            .map_err(|e| ConsensusError::InvalidBlock(e.to_string()))?;

        let mut pending = self.pending.lock();
        if pending.contains_key(&hash) {
            return Err(ConsensusError::DuplicateBlock(hash));
        }

        let proposer = self
            .recovery
            .recover_identity(&block.signature, &header_hash)
            .map_err(|e| ConsensusError::SignatureRecoveryFailed(e.to_string()))?;

        debug!("Tracking block {} proposed by {}", hash, proposer);
        pending.insert(
            hash,
            PendingProposal {
                block,
                endorsers: vec![proposer],
            },
        );
        Ok(hash)
    }

    /// Record an endorsement of a pending block
    pub fn add_validator(&self, hash: &Hash, validator: PublicKey) -> ConsensusResult<()> {
        let mut pending = self.pending.lock();
        let proposal = pending
            .get_mut(hash)
            .ok_or(ConsensusError::UnknownProposal(*hash))?;

        if proposal.has_endorsed(&validator) {
            return Err(ConsensusError::DuplicateEndorsement {
                hash: *hash,
                validator,
            });
        }

        proposal.endorsers.push(validator);
        debug!(
            "Block {} endorsed by {} ({} endorsements)",
            hash,
            validator,
            proposal.endorsers.len()
        );
        Ok(())
    }

    /// Number of distinct endorsers of a pending block
    pub fn validator_number(&self, hash: &Hash) -> ConsensusResult<usize> {
        self.with_proposal(hash, |proposal| proposal.endorsers.len())
    }

    /// Check that `validator` endorsed a pending block
    pub fn check_pubkey_exists(&self, hash: &Hash, validator: &PublicKey) -> ConsensusResult<()> {
        let endorsed = self.with_proposal(hash, |proposal| proposal.has_endorsed(validator))?;
        if !endorsed {
            return Err(ConsensusError::NotEndorsed {
                hash: *hash,
                validator: *validator,
            });
        }
        Ok(())
    }

    /// Get a copy of a pending block
    pub fn get_signed_block(&self, hash: &Hash) -> ConsensusResult<SignedBlock> {
        self.with_proposal(hash, |proposal| proposal.block.clone())
    }

    /// Endorsers of a pending block, in first-seen order
    pub fn get_block_validators(&self, hash: &Hash) -> ConsensusResult<Vec<PublicKey>> {
        self.with_proposal(hash, |proposal| proposal.endorsers.clone())
    }

    /// Snapshot of the hashes still waiting for confirmation
    pub fn waiting_confirmed_block_hash(&self) -> HashSet<Hash> {
        self.pending.lock().keys().copied().collect()
    }

    /// Stop tracking a block, returning the removed proposal
    pub fn delete_hash(&self, hash: &Hash) -> ConsensusResult<PendingProposal> {
        let proposal = self
            .pending
            .lock()
            .remove(hash)
            .ok_or(ConsensusError::UnknownProposal(*hash))?;

        debug!(
            "Stopped tracking block {} with {} endorsements",
            hash,
            proposal.endorsers.len()
        );
        Ok(proposal)
    }

    /// Number of pending proposals
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    fn with_proposal<T>(
        &self,
        hash: &Hash,
        f: impl FnOnce(&PendingProposal) -> T,
    ) -> ConsensusResult<T> {
        let pending = self.pending.lock();
        pending
            .get(hash)
            .map(f)
            .ok_or(ConsensusError::UnknownProposal(*hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use chain_core::{Block, BlockHeader, CoreError, CoreResult, Keypair, Signature};
    use std::sync::Arc;
    use std::thread;

    /// Recovery that always fails
    struct FailingRecovery;

    impl IdentityRecovery for FailingRecovery {
        fn recover_identity(&self, _: &Signature, _: &Hash) -> CoreResult<PublicKey> {
            Err(CoreError::InvalidSignature)
        }
    }

    /// Recovery that attributes every block to one identity
    struct FixedRecovery(PublicKey);

    impl IdentityRecovery for FixedRecovery {
        fn recover_identity(&self, _: &Signature, _: &Hash) -> CoreResult<PublicKey> {
            Ok(self.0)
        }
    }

    fn keypair(seed: u8) -> Keypair {
        Keypair::from_secret_bytes(&[seed; 32]).unwrap()
    }

    fn signed_block(signer: &Keypair, timestamp: u64) -> SignedBlock {
        let block =
            Block::new(&BlockHeader::genesis(), timestamp, b"abcd1234".to_vec(), 10).unwrap();
        SignedBlock::sign(block, signer).unwrap()
    }

    #[test]
    fn test_pbft() {
        let tracker = EndorsementTracker::new();
        let proposer = keypair(1);
        let pubkey1 = keypair(2).public_key();
        let pubkey2 = keypair(3).public_key();

        let block = signed_block(&proposer, 120);
        let hash = tracker.add_signed_block(block.clone()).unwrap();
        assert_eq!(hash, block.hash().unwrap());

        // The proposer has already endorsed its own block
        assert!(matches!(
            tracker.add_validator(&hash, proposer.public_key()),
            Err(ConsensusError::DuplicateEndorsement { .. })
        ));

        tracker.add_validator(&hash, pubkey1).unwrap();
        assert_eq!(tracker.validator_number(&hash).unwrap(), 2);
        assert_eq!(
            tracker.add_validator(&hash, pubkey1),
            Err(ConsensusError::DuplicateEndorsement {
                hash,
                validator: pubkey1
            })
        );
        assert_eq!(tracker.validator_number(&hash).unwrap(), 2);

        tracker.add_validator(&hash, pubkey2).unwrap();
        assert_eq!(tracker.validator_number(&hash).unwrap(), 3);

        assert!(tracker.check_pubkey_exists(&hash, &pubkey1).is_ok());
        assert_eq!(tracker.get_signed_block(&hash).unwrap(), block);
        assert_eq!(
            tracker.get_block_validators(&hash).unwrap(),
            vec![proposer.public_key(), pubkey1, pubkey2]
        );

        let removed = tracker.delete_hash(&hash).unwrap();
        assert_eq!(removed.proposer(), Some(&proposer.public_key()));
        assert_eq!(removed.into_block(), block);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_add_signed_block_exactly_once() {
        let tracker = EndorsementTracker::new();
        let block = signed_block(&keypair(1), 120);

        let hash = tracker.add_signed_block(block.clone()).unwrap();
        assert_eq!(tracker.validator_number(&hash).unwrap(), 1);

        assert_eq!(
            tracker.add_signed_block(block),
            Err(ConsensusError::DuplicateBlock(hash))
        );
        assert_eq!(tracker.validator_number(&hash).unwrap(), 1);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_failed_recovery_does_not_insert() {
        let tracker = EndorsementTracker::with_recovery(FailingRecovery);
        let block = signed_block(&keypair(1), 120);
        let hash = block.hash().unwrap();

        let err = tracker.add_signed_block(block).unwrap_err();
        assert!(matches!(err, ConsensusError::SignatureRecoveryFailed(_)));
        assert_eq!(err.kind(), ErrorKind::Tracking);

        assert!(tracker.is_empty());
        assert_eq!(
            tracker.validator_number(&hash),
            Err(ConsensusError::UnknownProposal(hash))
        );
    }

    #[test]
    fn test_corrupted_signature_rejected() {
        let tracker = EndorsementTracker::new();
        let mut block = signed_block(&keypair(1), 120);
        block.signature = Signature::new([0u8; 32], [0u8; 32], 0);

        assert!(matches!(
            tracker.add_signed_block(block),
            Err(ConsensusError::SignatureRecoveryFailed(_))
        ));
        assert!(tracker.waiting_confirmed_block_hash().is_empty());
    }

    #[test]
    fn test_swapped_body_rejected() {
        let tracker = EndorsementTracker::new();
        let block = Block::new(&BlockHeader::genesis(), 120, b"real".to_vec(), 10).unwrap();
        let real = SignedBlock::sign(block, &keypair(1)).unwrap();

        let mut forged = real.clone();
        forged.block.body = b"garbage".to_vec();

        assert!(matches!(
            tracker.add_signed_block(forged),
            Err(ConsensusError::InvalidBlock(_))
        ));
        assert!(tracker.is_empty());

        // The genuine block is still accepted and keeps its own body
        let hash = tracker.add_signed_block(real.clone()).unwrap();
        assert_eq!(tracker.get_signed_block(&hash).unwrap().block.body, b"real");
        assert_eq!(tracker.delete_hash(&hash).unwrap().into_block(), real);
    }

    #[test]
    fn test_injected_recovery() {
        let identity = keypair(5).public_key();
        let tracker = EndorsementTracker::with_recovery(FixedRecovery(identity));

        let hash = tracker
            .add_signed_block(signed_block(&keypair(1), 120))
            .unwrap();
        assert_eq!(tracker.get_block_validators(&hash).unwrap(), vec![identity]);
    }

    #[test]
    fn test_unknown_proposal() {
        let tracker = EndorsementTracker::new();
        let hash = Hash::keccak256(b"missing");
        let validator = keypair(1).public_key();
        let unknown = Err(ConsensusError::UnknownProposal(hash));

        assert_eq!(tracker.add_validator(&hash, validator), unknown);
        assert_eq!(tracker.check_pubkey_exists(&hash, &validator), unknown);
        assert_eq!(
            tracker.validator_number(&hash),
            Err(ConsensusError::UnknownProposal(hash))
        );
        assert!(matches!(
            tracker.get_signed_block(&hash),
            Err(ConsensusError::UnknownProposal(_))
        ));
        assert!(matches!(
            tracker.delete_hash(&hash),
            Err(ConsensusError::UnknownProposal(_))
        ));
    }

    #[test]
    fn test_not_endorsed() {
        let tracker = EndorsementTracker::new();
        let hash = tracker
            .add_signed_block(signed_block(&keypair(1), 120))
            .unwrap();
        let outsider = keypair(9).public_key();

        assert_eq!(
            tracker.check_pubkey_exists(&hash, &outsider),
            Err(ConsensusError::NotEndorsed {
                hash,
                validator: outsider
            })
        );
    }

    #[test]
    fn test_delete_then_any_operation_fails() {
        let tracker = EndorsementTracker::new();
        let proposer = keypair(1);
        let hash = tracker
            .add_signed_block(signed_block(&proposer, 120))
            .unwrap();

        tracker.delete_hash(&hash).unwrap();

        let unknown = ConsensusError::UnknownProposal(hash);
        assert_eq!(
            tracker.add_validator(&hash, keypair(2).public_key()),
            Err(unknown.clone())
        );
        assert_eq!(tracker.validator_number(&hash), Err(unknown.clone()));
        assert_eq!(
            tracker.check_pubkey_exists(&hash, &proposer.public_key()),
            Err(unknown.clone())
        );
        assert_eq!(tracker.get_block_validators(&hash), Err(unknown));
        assert!(matches!(
            tracker.delete_hash(&hash),
            Err(ConsensusError::UnknownProposal(_))
        ));
        assert!(!tracker.waiting_confirmed_block_hash().contains(&hash));
    }

    #[test]
    fn test_competing_proposals_are_tracked_separately() {
        let tracker = EndorsementTracker::new();
        let a = tracker
            .add_signed_block(signed_block(&keypair(1), 120))
            .unwrap();
        let rival = Block::new(&BlockHeader::genesis(), 120, b"rival".to_vec(), 10).unwrap();
        let b = tracker
            .add_signed_block(SignedBlock::sign(rival, &keypair(2)).unwrap())
            .unwrap();
        assert_ne!(a, b);

        tracker.add_validator(&a, keypair(3).public_key()).unwrap();
        assert_eq!(tracker.validator_number(&a).unwrap(), 2);
        assert_eq!(tracker.validator_number(&b).unwrap(), 1);

        let waiting = tracker.waiting_confirmed_block_hash();
        assert_eq!(waiting, HashSet::from([a, b]));

        // The snapshot is unaffected by later changes
        tracker.delete_hash(&a).unwrap();
        assert_eq!(waiting.len(), 2);
        assert_eq!(tracker.waiting_confirmed_block_hash(), HashSet::from([b]));
    }

    #[test]
    fn test_concurrent_endorsements() {
        let tracker = Arc::new(EndorsementTracker::new());
        let hash = tracker
            .add_signed_block(signed_block(&keypair(1), 120))
            .unwrap();
        let validators: Arc<Vec<PublicKey>> =
            Arc::new((2..=21).map(|seed| keypair(seed).public_key()).collect());

        // Every thread tries to add every validator; each must land exactly once
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                let validators = Arc::clone(&validators);
                thread::spawn(move || {
                    validators
                        .iter()
                        .filter(|v| tracker.add_validator(&hash, **v).is_ok())
                        .count()
                })
            })
            .collect();

        let accepted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(accepted, validators.len());
        assert_eq!(tracker.validator_number(&hash).unwrap(), validators.len() + 1);
    }

    #[test]
    fn test_concurrent_duplicate_blocks() {
        let tracker = Arc::new(EndorsementTracker::new());
        let block = signed_block(&keypair(1), 120);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                let block = block.clone();
                thread::spawn(move || tracker.add_signed_block(block).is_ok())
            })
            .collect();

        let inserted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(inserted, 1);
        assert_eq!(tracker.validator_number(&block.hash().unwrap()).unwrap(), 1);
    }
}
