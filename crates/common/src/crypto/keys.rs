use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha2::{Digest, Sha256};

use super::signature::SeedSignature;

/// Size of a secp256k1 private scalar in bytes
pub const PRIVATE_KEY_SIZE: usize = 32;
/// Size of a SEC1 compressed secp256k1 point
pub const PUBLIC_KEY_SIZE: usize = 33;
/// Size of a SEC1 uncompressed secp256k1 point
pub const UNCOMPRESSED_PUBLIC_KEY_SIZE: usize = 65;
/// Upper bound on domain-separated re-hash attempts when reducing a signature to a scalar
pub const MAX_DERIVATION_ATTEMPTS: u8 = 8;

const DERIVATION_DOMAIN: &[u8] = b"payunlock/keygen/v1";

/// Errors that can occur during key operations
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("no valid scalar after {0} derivation attempts")]
    DerivationExhausted(u8),
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),
}

/// Public half of a listing key pair
///
/// A thin wrapper around a `k256` secp256k1 point. On chain and in hex form it
/// travels SEC1 compressed (33 bytes); the blob store carries the same bytes
/// as standard base64. Uncompressed (65 byte) points are accepted on input.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(k256::PublicKey);

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl From<k256::PublicKey> for PublicKey {
    fn from(key: k256::PublicKey) -> Self {
        PublicKey(key)
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = KeyError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != PUBLIC_KEY_SIZE && bytes.len() != UNCOMPRESSED_PUBLIC_KEY_SIZE {
            return Err(KeyError::InvalidPublicKey(format!(
                "expected {} or {} bytes, got {}",
                PUBLIC_KEY_SIZE,
                UNCOMPRESSED_PUBLIC_KEY_SIZE,
                bytes.len()
            )));
        }
        k256::PublicKey::from_sec1_bytes(bytes)
            .map(PublicKey)
            .map_err(|_| KeyError::InvalidPublicKey("not a point on secp256k1".into()))
    }
}

impl PublicKey {
    /// Parse a public key from a hexadecimal string
    ///
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let bytes = hex::decode(hex)
            .map_err(|_| KeyError::InvalidPublicKey("public key hex decode error".into()))?;
        Self::try_from(bytes.as_slice())
    }

    /// Parse a public key from standard base64, as stored in listing documents
    pub fn from_base64(b64: &str) -> Result<Self, KeyError> {
        let bytes = STANDARD
            .decode(b64.trim())
            .map_err(|_| KeyError::InvalidPublicKey("public key base64 decode error".into()))?;
        Self::try_from(bytes.as_slice())
    }

    /// SEC1 compressed encoding
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        let mut out = [0u8; PUBLIC_KEY_SIZE];
        out.copy_from_slice(self.0.to_encoded_point(true).as_bytes());
        out
    }

    /// SEC1 uncompressed encoding, used inside ECIES framing
    pub fn to_uncompressed_bytes(&self) -> [u8; UNCOMPRESSED_PUBLIC_KEY_SIZE] {
        let mut out = [0u8; UNCOMPRESSED_PUBLIC_KEY_SIZE];
        out.copy_from_slice(self.0.to_encoded_point(false).as_bytes());
        out
    }

    /// "0x"-prefixed hex of the compressed point, the form the escrow contract takes
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    pub(crate) fn inner(&self) -> &k256::PublicKey {
        &self.0
    }
}

/// Private half of a listing key pair
///
/// Never persisted: every holder recomputes it from a fresh wallet signature
/// with [`SecretKey::derive`] whenever it is needed.
#[derive(Clone)]
pub struct SecretKey(k256::SecretKey);

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecretKey").field(&"..").finish()
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for SecretKey {}

impl SecretKey {
    /// Deterministically derive a key from a wallet signature
    ///
    /// Attempt `i` hashes `DOMAIN || i || signature` with SHA-256 and accepts
    /// the digest if it is a non-zero scalar below the curve order. A rejected
    /// digest is re-hashed under the next counter, never reduced, so every
    /// accepted scalar is uniform over the valid range.
    pub fn derive(signature: &SeedSignature) -> Result<Self, KeyError> {
        for attempt in 0..MAX_DERIVATION_ATTEMPTS {
            let digest = Sha256::new()
                .chain_update(DERIVATION_DOMAIN)
                .chain_update([attempt])
                .chain_update(signature.bytes())
                .finalize();
            if let Ok(key) = k256::SecretKey::from_bytes(&digest) {
                return Ok(SecretKey(key));
            }
            tracing::warn!(attempt, "derived digest is not a valid scalar, re-hashing");
        }
        Err(KeyError::DerivationExhausted(MAX_DERIVATION_ATTEMPTS))
    }

    /// Generate a new random secret key using a cryptographically secure RNG
    pub fn generate() -> Self {
        loop {
            let mut bytes = [0u8; PRIVATE_KEY_SIZE];
            getrandom::getrandom(&mut bytes).expect("failed to generate random bytes");
            if let Ok(key) = k256::SecretKey::from_slice(&bytes) {
                return SecretKey(key);
            }
        }
    }

    /// Parse a secret key from a hexadecimal string
    ///
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let mut buff = [0; PRIVATE_KEY_SIZE];
        hex::decode_to_slice(hex, &mut buff)
            .map_err(|_| KeyError::InvalidPrivateKey("private key hex decode error".into()))?;
        k256::SecretKey::from_slice(&buff)
            .map(SecretKey)
            .map_err(|_| KeyError::InvalidPrivateKey("scalar out of range".into()))
    }

    /// Derive the public key from this secret key
    pub fn public(&self) -> PublicKey {
        PublicKey(self.0.public_key())
    }

    pub fn to_bytes(&self) -> [u8; PRIVATE_KEY_SIZE] {
        self.0.to_bytes().into()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub(crate) fn inner(&self) -> &k256::SecretKey {
        &self.0
    }
}

/// A derived key pair for one party on one listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub secret: SecretKey,
    pub public: PublicKey,
}

impl KeyPair {
    /// Seed-derived key agreement: reproduce a party's pair from their signature
    pub fn derive(signature: &SeedSignature) -> Result<Self, KeyError> {
        let secret = SecretKey::derive(signature)?;
        let public = secret.public();
        Ok(Self { secret, public })
    }
}
