//! Deterministic Ed25519 identities derived from video embeddings.
//!
//! The signing seed is `HKDF-SHA256(salt = none, ikm = embedding bytes,
//! info = "natural_identity")`, truncated to 32 bytes, and is used directly
//! as an Ed25519 secret key. The same video (same detected faces, same frame
//! order) therefore always yields the same keypair, and the private key never
//! needs to be stored.
//!
//! # Security trade-off
//!
//! No secret salt is mixed in. Anyone able to recompute the embedding of a
//! video can recompute its private key. This is what makes the identity
//! regenerable from the video alone.

use std::fs;
use std::path::Path;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use hkdf::Hkdf;
use sha2::Sha256;
use sha3::{Digest, Sha3_256};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::detect::FaceDetector;
use crate::embedding::{embed_video, Embedding};
use crate::error::{FacemarkError, Result};
use crate::video::VideoSource;

/// HKDF `info` label binding derived seeds to this protocol.
pub const KEY_DERIVATION_INFO: &[u8] = b"natural_identity";

/// Ed25519 public key size in bytes.
pub const PUBLIC_KEY_BYTES: usize = 32;

/// Ed25519 signature size in bytes.
pub const SIGNATURE_BYTES: usize = 64;

/// Derive the 32-byte signing seed for an embedding.
pub fn derive_seed(embedding: &Embedding) -> Result<Zeroizing<[u8; 32]>> {
    let ikm = Zeroizing::new(embedding.to_bytes());
    let hk = Hkdf::<Sha256>::new(None, &ikm);
    let mut seed = Zeroizing::new([0u8; 32]);
    hk.expand(KEY_DERIVATION_INFO, &mut seed[..])
        .map_err(|e| FacemarkError::KeyDerivation(format!("HKDF expand failed: {e}")))?;
    Ok(seed)
}

/// Embedding plus the keypair derived from it.
///
/// The signing key is held in memory only and zeroized on drop.
#[derive(Clone)]
pub struct Identity {
    embedding: Embedding,
    signing_key: SigningKey,
}

impl Identity {
    /// Derive the identity for an embedding.
    pub fn from_embedding(embedding: Embedding) -> Result<Self> {
        let seed = derive_seed(&embedding)?;
        let signing_key = SigningKey::from_bytes(&seed);
        Ok(Self {
            embedding,
            signing_key,
        })
    }

    pub fn embedding(&self) -> &Embedding {
        &self.embedding
    }

    pub fn public_key(&self) -> PublicIdentity {
        PublicIdentity {
            key: self.signing_key.verifying_key(),
        }
    }

    /// Sign `SHA256(embedding bytes)`.
    pub fn sign_embedding(&self) -> [u8; SIGNATURE_BYTES] {
        self.signing_key.sign(&self.embedding.digest()).to_bytes()
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("embedding", &self.embedding)
            .field("public_key", &self.public_key())
            .field("signing_key", &"[REDACTED]")
            .finish()
    }
}

/// Public half of an [`Identity`], persisted as a raw 32-byte blob.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicIdentity {
    key: VerifyingKey,
}

impl PublicIdentity {
    /// Parse raw Ed25519 public key bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let array: [u8; PUBLIC_KEY_BYTES] = bytes.try_into().map_err(|_| {
            FacemarkError::InvalidPublicKey(format!(
                "expected {PUBLIC_KEY_BYTES} bytes, got {}",
                bytes.len()
            ))
        })?;
        let key = VerifyingKey::from_bytes(&array)
            .map_err(|e| FacemarkError::InvalidPublicKey(e.to_string()))?;
        Ok(Self { key })
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_BYTES] {
        self.key.to_bytes()
    }

    /// Write the raw key bytes to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_bytes())?;
        debug!(path = %path.display(), "Saved public key");
        Ok(())
    }

    /// Read a raw key blob from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }

    /// Hex SHA3-256 of the key bytes, for display and logs.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha3_256::digest(self.to_bytes()))
    }

    /// Check `signature` over `SHA256(embedding bytes)`.
    ///
    /// Any malformed or non-matching signature yields `false`.
    pub fn verify_embedding(&self, embedding: &Embedding, signature: &[u8]) -> bool {
        let Ok(bytes) = <[u8; SIGNATURE_BYTES]>::try_from(signature) else {
            return false;
        };
        let signature = Signature::from_bytes(&bytes);
        self.key.verify(&embedding.digest(), &signature).is_ok()
    }
}

impl std::fmt::Debug for PublicIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PublicIdentity")
            .field(&hex::encode(self.to_bytes()))
            .finish()
    }
}

/// Compute the embedding of `source` and derive its identity.
pub fn generate_identity<S, D>(source: &mut S, detector: &D) -> Result<Identity>
where
    S: VideoSource + ?Sized,
    D: FaceDetector + ?Sized,
{
    let embedding = embed_video(source, detector)?;
    let identity = Identity::from_embedding(embedding)?;
    let fingerprint = identity.public_key().fingerprint();
    info!(fingerprint = &fingerprint[..16], "Derived video identity");
    Ok(identity)
}
