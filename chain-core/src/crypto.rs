//! secp256k1 signing and public key recovery
//!
//! Validators are identified by their compressed public key. Blocks carry a
//! recoverable ECDSA signature over the header hash, so the signer identity can
//! be recovered from the block alone.

use crate::{CoreError, CoreResult, Hash};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of a compressed secp256k1 public key
pub const PUBLIC_KEY_LENGTH: usize = 33;

/// Compressed secp256k1 public key, used as validator identity
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_LENGTH]);

impl PublicKey {
    /// Parse a public key, checking that it is a valid curve point
    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        let key = secp256k1::PublicKey::from_slice(bytes)
            .map_err(|e| CoreError::InvalidPublicKey(e.to_string()))?;
        Ok(Self(key.serialize()))
    }

    /// Get the underlying byte array
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Create from hex string, with or without `0x` prefix
    pub fn from_hex(hex: &str) -> CoreResult<Self> {
        let bytes = hex::decode(hex.trim_start_matches("0x"))?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl From<secp256k1::PublicKey> for PublicKey {
    fn from(key: secp256k1::PublicKey) -> Self {
        Self(key.serialize())
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Recoverable ECDSA signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub v: u8,
}

impl Signature {
    /// Create new signature
    pub fn new(r: [u8; 32], s: [u8; 32], v: u8) -> Self {
        Self { r, s, v }
    }

    /// Convert to bytes (65 bytes total)
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[0..32].copy_from_slice(&self.r);
        bytes[32..64].copy_from_slice(&self.s);
        bytes[64] = self.v;
        bytes
    }

    /// Create from bytes
    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        if bytes.len() != 65 {
            return Err(CoreError::InvalidSignature);
        }

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[0..32]);
        s.copy_from_slice(&bytes[32..64]);

        Ok(Self { r, s, v: bytes[64] })
    }

    fn to_recoverable(&self) -> CoreResult<RecoverableSignature> {
        let recovery_id = RecoveryId::from_u8_masked(self.v);

        let mut sig_bytes = [0u8; 64];
        sig_bytes[0..32].copy_from_slice(&self.r);
        sig_bytes[32..64].copy_from_slice(&self.s);

        RecoverableSignature::from_compact(&sig_bytes, recovery_id)
            .map_err(|e| CoreError::Crypto(e.to_string()))
    }
}

/// Signing key together with its public identity
#[derive(Clone)]
pub struct Keypair {
    secret: SecretKey,
    public: PublicKey,
}

impl Keypair {
    /// Create a keypair from a 32-byte secret key
    pub fn from_secret_bytes(bytes: &[u8]) -> CoreResult<Self> {
        let secp = Secp256k1::new();
        let secret =
            SecretKey::from_slice(bytes).map_err(|e| CoreError::Crypto(e.to_string()))?;
        let public = secp256k1::PublicKey::from_secret_key(&secp, &secret);

        Ok(Self {
            secret,
            public: public.into(),
        })
    }

    /// Get the public identity of this keypair
    pub fn public_key(&self) -> PublicKey {
        self.public
    }

    /// Sign a 32-byte hash with a recoverable signature
    pub fn sign_hash(&self, hash: &Hash) -> Signature {
        let secp = Secp256k1::new();
        let message = Message::from_digest(*hash.as_bytes());

        let sig = secp.sign_ecdsa_recoverable(message, &self.secret);
        let (recovery_id, sig_bytes) = sig.serialize_compact();

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&sig_bytes[0..32]);
        s.copy_from_slice(&sig_bytes[32..64]);

        Signature::new(r, s, recovery_id as u8)
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// Recover the signer's public key from a signature over `hash`
pub fn recover_public_key(signature: &Signature, hash: &Hash) -> CoreResult<PublicKey> {
    let secp = Secp256k1::new();
    let recoverable = signature.to_recoverable()?;
    let message = Message::from_digest(*hash.as_bytes());

    let public_key = secp
        .recover_ecdsa(message, &recoverable)
        .map_err(|e| CoreError::Crypto(e.to_string()))?;

    Ok(public_key.into())
}
