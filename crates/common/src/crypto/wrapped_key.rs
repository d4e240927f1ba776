//! Content key wrapping using ECIES over secp256k1
//!
//! A [`WrappedKey`] carries a listing's [`ContentKey`] encrypted to one
//! recipient's derived public key. The framing is the one produced by the
//! `eciesjs` defaults, so keys wrapped by browser clients unwrap here and
//! vice versa.
//!
//! # Protocol Overview
//!
//! To wrap a content key for a recipient:
//! 1. **Generate ephemeral keypair**: a throwaway secp256k1 scalar
//! 2. **Perform ECDH**: multiply the recipient's point by the ephemeral scalar
//! 3. **Derive KEK**: HKDF-SHA256 over `ephemeral_pk || shared_point` (both uncompressed)
//! 4. **Seal**: AES-256-GCM with a 16 byte nonce over the raw content key
//!
//! The recipient reverses steps 2-4 with their own scalar. A GCM tag mismatch
//! at step 4 means the key was addressed to someone else (or was tampered
//! with); it is reported as [`WrappedKeyError::Unauthorized`], distinct from
//! framing errors.

use std::fmt;

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce, Tag};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hkdf::Hkdf;
use sha2::Sha256;

use super::content_key::{ContentKey, CONTENT_KEY_SIZE};
use super::keys::{PublicKey, SecretKey, UNCOMPRESSED_PUBLIC_KEY_SIZE};

/// ECIES nonce size (eciesjs default)
pub const ECIES_NONCE_SIZE: usize = 16;
/// AES-GCM tag size
pub const ECIES_TAG_SIZE: usize = 16;
/// Total size of a wrapped content key in bytes
///
/// Layout: ephemeral_pubkey (65) || nonce (16) || tag (16) || sealed_key (32) = 129 bytes
pub const WRAPPED_KEY_SIZE: usize =
    UNCOMPRESSED_PUBLIC_KEY_SIZE + ECIES_NONCE_SIZE + ECIES_TAG_SIZE + CONTENT_KEY_SIZE;

type EciesCipher = AesGcm<Aes256, U16>;

/// Errors that can occur during wrapping or unwrapping
#[derive(Debug, thiserror::Error)]
pub enum WrappedKeyError {
    #[error("wrap error: {0}")]
    Wrap(String),
    #[error("wrapped key is not addressed to this private key")]
    Unauthorized,
    #[error("malformed wrapped key: {0}")]
    Malformed(String),
}

/// A content key sealed to a single recipient
///
/// # Wire Format
///
/// ```text
/// [ ephemeral_pubkey: 65 ][ nonce: 16 ][ tag: 16 ][ sealed content key: 32 ]
/// ```
///
/// Travels as standard base64 in listing documents and as "0x" hex on chain.
#[derive(Clone, PartialEq, Eq)]
pub struct WrappedKey(Vec<u8>);

impl fmt::Debug for WrappedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WrappedKey({})", self.to_base64())
    }
}

impl TryFrom<&[u8]> for WrappedKey {
    type Error = WrappedKeyError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != WRAPPED_KEY_SIZE {
            return Err(WrappedKeyError::Malformed(format!(
                "invalid wrapped key size, expected {}, got {}",
                WRAPPED_KEY_SIZE,
                bytes.len()
            )));
        }
        Ok(WrappedKey(bytes.to_vec()))
    }
}

impl WrappedKey {
    /// Seal a content key to `recipient`
    ///
    /// # Errors
    ///
    /// Returns an error if ECDH, key derivation or sealing fails.
    pub fn wrap(key: &ContentKey, recipient: &PublicKey) -> Result<Self, WrappedKeyError> {
        let ephemeral = SecretKey::generate();
        let ephemeral_public = ephemeral.public().to_uncompressed_bytes();

        let kek = derive_kek(&ephemeral, recipient, &ephemeral_public)?;
        let cipher = EciesCipher::new_from_slice(&kek)
            .map_err(|_| WrappedKeyError::Wrap("invalid kek length".into()))?;

        let mut nonce = [0u8; ECIES_NONCE_SIZE];
        getrandom::getrandom(&mut nonce)
            .map_err(|e| WrappedKeyError::Wrap(format!("failed to generate nonce: {}", e)))?;

        let mut sealed = key.bytes().to_vec();
        let tag = cipher
            .encrypt_in_place_detached(Nonce::<U16>::from_slice(&nonce), b"", &mut sealed)
            .map_err(|_| WrappedKeyError::Wrap("aes-gcm encrypt error".into()))?;

        let mut out = Vec::with_capacity(WRAPPED_KEY_SIZE);
        out.extend_from_slice(&ephemeral_public);
        out.extend_from_slice(&nonce);
        out.extend_from_slice(tag.as_slice());
        out.extend_from_slice(&sealed);

        // sanity check we're getting `WRAPPED_KEY_SIZE` bytes here
        if out.len() != WRAPPED_KEY_SIZE {
            return Err(WrappedKeyError::Wrap("expected wrapped key size is incorrect".into()));
        }

        Ok(WrappedKey(out))
    }

    /// Recover the content key with the recipient's private key
    ///
    /// # Errors
    ///
    /// - [`WrappedKeyError::Unauthorized`] if `recipient` is not the key this
    ///   was wrapped for, or the sealed bytes were altered
    /// - [`WrappedKeyError::Malformed`] if the ephemeral point is invalid
    pub fn unwrap(&self, recipient: &SecretKey) -> Result<ContentKey, WrappedKeyError> {
        let (ephemeral_bytes, rest) = self.0.split_at(UNCOMPRESSED_PUBLIC_KEY_SIZE);
        let (nonce, rest) = rest.split_at(ECIES_NONCE_SIZE);
        let (tag, sealed) = rest.split_at(ECIES_TAG_SIZE);

        let ephemeral_public = PublicKey::try_from(ephemeral_bytes)
            .map_err(|_| WrappedKeyError::Malformed("invalid ephemeral public key".into()))?;

        let kek = derive_kek(recipient, &ephemeral_public, ephemeral_bytes)?;
        let cipher = EciesCipher::new_from_slice(&kek)
            .map_err(|_| WrappedKeyError::Malformed("invalid kek length".into()))?;

        let mut key_bytes = sealed.to_vec();
        cipher
            .decrypt_in_place_detached(
                Nonce::<U16>::from_slice(nonce),
                b"",
                &mut key_bytes,
                Tag::<U16>::from_slice(tag),
            )
            .map_err(|_| WrappedKeyError::Unauthorized)?;

        ContentKey::from_slice(&key_bytes)
            .map_err(|_| WrappedKeyError::Malformed("unwrapped key has wrong size".into()))
    }

    /// Parse a wrapped key from standard base64
    pub fn from_base64(b64: &str) -> Result<Self, WrappedKeyError> {
        let bytes = STANDARD
            .decode(b64.trim())
            .map_err(|_| WrappedKeyError::Malformed("base64 decode error".into()))?;
        Self::try_from(bytes.as_slice())
    }

    /// Parse a wrapped key from hex; accepts both plain and "0x"-prefixed hex
    pub fn from_hex(hex: &str) -> Result<Self, WrappedKeyError> {
        let hex = hex.trim();
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let bytes =
            hex::decode(hex).map_err(|_| WrappedKeyError::Malformed("hex decode error".into()))?;
        Self::try_from(bytes.as_slice())
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

/// HKDF-SHA256(ephemeral_pk || shared_point) -> 32 byte key encryption key
fn derive_kek(
    secret: &SecretKey,
    public: &PublicKey,
    ephemeral_public: &[u8],
) -> Result<[u8; 32], WrappedKeyError> {
    let shared = k256::AffinePoint::from(
        public.inner().to_projective() * *secret.inner().to_nonzero_scalar(),
    );
    let shared = PublicKey::from(
        k256::PublicKey::from_affine(shared)
            .map_err(|_| WrappedKeyError::Malformed("ecdh produced the identity".into()))?,
    );

    let mut ikm = Vec::with_capacity(2 * UNCOMPRESSED_PUBLIC_KEY_SIZE);
    ikm.extend_from_slice(ephemeral_public);
    ikm.extend_from_slice(&shared.to_uncompressed_bytes());

    let mut kek = [0u8; 32];
    Hkdf::<Sha256>::new(None, &ikm)
        .expand(&[], &mut kek)
        .map_err(|_| WrappedKeyError::Wrap("hkdf expand error".into()))?;
    Ok(kek)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_wrap_unwrap() {
        let key = ContentKey::from_slice(&[42u8; CONTENT_KEY_SIZE]).unwrap();
        let recipient = SecretKey::generate();
        let wrapped = WrappedKey::wrap(&key, &recipient.public()).unwrap();
        assert_eq!(wrapped.bytes().len(), WRAPPED_KEY_SIZE);
        assert_eq!(wrapped.bytes()[0], 0x04);
        assert_eq!(wrapped.unwrap(&recipient).unwrap(), key);
    }

    #[test]
    fn test_wrong_recipient_is_unauthorized() {
        let key = ContentKey::generate();
        let alice = SecretKey::generate();
        let bob = SecretKey::generate();
        let wrapped = WrappedKey::wrap(&key, &alice.public()).unwrap();
        assert_eq!(wrapped.unwrap(&alice).unwrap(), key);
        assert!(matches!(
            wrapped.unwrap(&bob),
            Err(WrappedKeyError::Unauthorized)
        ));
    }

    #[test]
    fn test_wrapping_is_randomised() {
        let key = ContentKey::generate();
        let recipient = SecretKey::generate().public();
        let a = WrappedKey::wrap(&key, &recipient).unwrap();
        let b = WrappedKey::wrap(&key, &recipient).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_tampered_sealed_key_is_unauthorized() {
        let key = ContentKey::generate();
        let recipient = SecretKey::generate();
        let wrapped = WrappedKey::wrap(&key, &recipient.public()).unwrap();
        for i in UNCOMPRESSED_PUBLIC_KEY_SIZE..WRAPPED_KEY_SIZE {
            let mut bytes = wrapped.bytes().to_vec();
            bytes[i] ^= 0x80;
            let tampered = WrappedKey::try_from(bytes.as_slice()).unwrap();
            assert!(matches!(
                tampered.unwrap(&recipient),
                Err(WrappedKeyError::Unauthorized)
            ));
        }
    }

    #[test]
    fn test_invalid_ephemeral_point_is_malformed() {
        let key = ContentKey::generate();
        let recipient = SecretKey::generate();
        let mut bytes = WrappedKey::wrap(&key, &recipient.public())
            .unwrap()
            .bytes()
            .to_vec();
        bytes[0] = 0x05;
        let broken = WrappedKey::try_from(bytes.as_slice()).unwrap();
        assert!(matches!(
            broken.unwrap(&recipient),
            Err(WrappedKeyError::Malformed(_))
        ));
    }

    #[test]
    fn test_text_encodings() {
        let key = ContentKey::generate();
        let recipient = SecretKey::generate();
        let wrapped = WrappedKey::wrap(&key, &recipient.public()).unwrap();

        let from_b64 = WrappedKey::from_base64(&wrapped.to_base64()).unwrap();
        let from_hex = WrappedKey::from_hex(&wrapped.to_hex()).unwrap();
        assert_eq!(from_b64, wrapped);
        assert_eq!(from_hex, wrapped);
        assert_eq!(from_hex.unwrap(&recipient).unwrap(), key);
    }

    #[test]
    fn test_wrong_size_rejected() {
        assert!(matches!(
            WrappedKey::try_from([0u8; WRAPPED_KEY_SIZE - 1].as_slice()),
            Err(WrappedKeyError::Malformed(_))
        ));
        assert!(WrappedKey::from_hex("0x00").is_err());
        assert!(WrappedKey::from_base64("not base64").is_err());
    }

    /// Sealed with a fixed ephemeral scalar and nonce by an independent
    /// eciesjs-layout implementation
    const KNOWN_WRAPPED_KEY: &str = "04bb50e2d89a4ed70663d080659fe0ad4b9bc3e06c17a227433966cb59ceee020decddbf6e00192011648d13b1c00af770c0c1bb609d4d3a5c98a43772e0e18ef4a0a1a2a3a4a5a6a7a8a9aaabacadaeafd62606393344025b0192b807a2d2b100a25c440e9ab964994ef4c8e31f85d64b9e78c6bcddee26f36396412325aec04a";

    #[test]
    fn test_unwrap_known_answer() {
        let recipient =
            SecretKey::from_hex("2f7bbb81decba608d6ff2d41cb18caa19ce3e6fedadbc7ff089dd9100b3596bd")
                .unwrap();
        let wrapped = WrappedKey::from_hex(KNOWN_WRAPPED_KEY).unwrap();
        let expected: Vec<u8> = (0u8..32).collect();
        assert_eq!(wrapped.unwrap(&recipient).unwrap().bytes(), expected.as_slice());

        // the nonce sits right after the ephemeral point
        assert_eq!(
            &wrapped.bytes()[UNCOMPRESSED_PUBLIC_KEY_SIZE..UNCOMPRESSED_PUBLIC_KEY_SIZE + ECIES_NONCE_SIZE],
            (0xa0u8..0xb0).collect::<Vec<_>>().as_slice()
        );
    }
}
