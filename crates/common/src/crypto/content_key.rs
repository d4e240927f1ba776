//! Payload encryption using AES-256-GCM
//!
//! Every listing has exactly one `ContentKey`. It encrypts the product payload
//! once, at listing creation, and is afterwards only ever moved around wrapped
//! under some party's public key (see [`super::WrappedKey`]).

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Size of the AES-GCM IV in bytes
pub const IV_SIZE: usize = 12;
/// Size of an AES-256 key in bytes
pub const CONTENT_KEY_SIZE: usize = 32;
/// Size of the AES-GCM authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// Errors that can occur during payload encryption/decryption
#[derive(Debug, thiserror::Error)]
pub enum ContentKeyError {
    #[error("encrypt error: {0}")]
    Encrypt(String),
    #[error("authentication failed, wrong key or tampered ciphertext")]
    Authentication,
    #[error("malformed encrypted payload: {0}")]
    Malformed(String),
    #[error("decrypted payload is not valid utf-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// A 256-bit symmetric key for a single listing's payload
///
/// # Examples
///
/// ```ignore
/// let key = ContentKey::generate();
/// let encrypted = key.encrypt("LICENSE-XYZ")?;
/// assert_eq!(key.decrypt(&encrypted)?, "LICENSE-XYZ");
/// ```
#[derive(PartialEq, Eq, Clone)]
pub struct ContentKey([u8; CONTENT_KEY_SIZE]);

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ContentKey").field(&"..").finish()
    }
}

impl Deref for ContentKey {
    type Target = [u8; CONTENT_KEY_SIZE];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<[u8; CONTENT_KEY_SIZE]> for ContentKey {
    fn from(bytes: [u8; CONTENT_KEY_SIZE]) -> Self {
        ContentKey(bytes)
    }
}

impl ContentKey {
    /// Generate a new random key using a cryptographically secure RNG
    pub fn generate() -> Self {
        let mut buff = [0; CONTENT_KEY_SIZE];
        getrandom::getrandom(&mut buff).expect("failed to generate random bytes");
        Self(buff)
    }

    /// Create a key from a byte slice
    ///
    /// # Errors
    ///
    /// Returns an error if the slice length is not exactly `CONTENT_KEY_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, ContentKeyError> {
        if data.len() != CONTENT_KEY_SIZE {
            return Err(ContentKeyError::Malformed(format!(
                "invalid content key size, expected {}, got {}",
                CONTENT_KEY_SIZE,
                data.len()
            )));
        }
        let mut buff = [0; CONTENT_KEY_SIZE];
        buff.copy_from_slice(data);
        Ok(buff.into())
    }

    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// Encrypt a payload under a fresh random IV
    ///
    /// # Errors
    ///
    /// Returns an error if the system RNG or the cipher fails.
    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedPayload, ContentKeyError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(self.bytes()));

        let mut iv = [0u8; IV_SIZE];
        getrandom::getrandom(&mut iv)
            .map_err(|e| ContentKeyError::Encrypt(format!("failed to generate iv: {}", e)))?;

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
            .map_err(|_| ContentKeyError::Encrypt("aes-gcm encrypt error".into()))?;

        Ok(EncryptedPayload { iv, ciphertext })
    }

    /// Decrypt a payload, failing closed on any tag mismatch
    pub fn decrypt(&self, payload: &EncryptedPayload) -> Result<String, ContentKeyError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(self.bytes()));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&payload.iv), payload.ciphertext.as_ref())
            .map_err(|_| ContentKeyError::Authentication)?;
        Ok(String::from_utf8(plaintext)?)
    }
}

/// Ciphertext of a listing payload
///
/// Text form is `ivB64:ciphertextB64` (standard base64), where the ciphertext
/// carries the GCM tag in its last 16 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    iv: [u8; IV_SIZE],
    ciphertext: Vec<u8>,
}

impl EncryptedPayload {
    pub fn iv(&self) -> &[u8; IV_SIZE] {
        &self.iv
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// SHA-256 over the text form; fixed for the life of a listing
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.to_string().as_bytes()))
    }

    #[cfg(test)]
    pub(crate) fn ciphertext_mut(&mut self) -> &mut Vec<u8> {
        &mut self.ciphertext
    }
}

impl fmt::Display for EncryptedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            STANDARD.encode(self.iv),
            STANDARD.encode(&self.ciphertext)
        )
    }
}

impl FromStr for EncryptedPayload {
    type Err = ContentKeyError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (iv_b64, ct_b64) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| ContentKeyError::Malformed("missing ':' separator".into()))?;
        let iv_bytes = STANDARD
            .decode(iv_b64)
            .map_err(|_| ContentKeyError::Malformed("iv is not base64".into()))?;
        if iv_bytes.len() != IV_SIZE {
            return Err(ContentKeyError::Malformed(format!(
                "iv must be {} bytes, got {}",
                IV_SIZE,
                iv_bytes.len()
            )));
        }
        let ciphertext = STANDARD
            .decode(ct_b64)
            .map_err(|_| ContentKeyError::Malformed("ciphertext is not base64".into()))?;
        if ciphertext.len() < TAG_SIZE {
            return Err(ContentKeyError::Malformed(
                "ciphertext shorter than authentication tag".into(),
            ));
        }
        let mut iv = [0u8; IV_SIZE];
        iv.copy_from_slice(&iv_bytes);
        Ok(Self { iv, ciphertext })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let key = ContentKey::generate();
        let encrypted = key.encrypt("LICENSE-XYZ").unwrap();
        assert_eq!(key.decrypt(&encrypted).unwrap(), "LICENSE-XYZ");
    }

    #[test]
    fn test_text_form_roundtrip() {
        let key = ContentKey::generate();
        let encrypted = key.encrypt("https://example.com/download?token=abc").unwrap();
        let text = encrypted.to_string();
        let (iv, ct) = text.split_once(':').unwrap();
        assert_eq!(STANDARD.decode(iv).unwrap().len(), IV_SIZE);
        assert!(!ct.is_empty());

        let parsed: EncryptedPayload = text.parse().unwrap();
        assert_eq!(parsed, encrypted);
        assert_eq!(
            key.decrypt(&parsed).unwrap(),
            "https://example.com/download?token=abc"
        );
    }

    #[test]
    fn test_fresh_iv_per_encryption() {
        let key = ContentKey::generate();
        let a = key.encrypt("same").unwrap();
        let b = key.encrypt("same").unwrap();
        assert_ne!(a.iv(), b.iv());
        assert_ne!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_wrong_key_fails_closed() {
        let encrypted = ContentKey::generate().encrypt("secret").unwrap();
        let result = ContentKey::generate().decrypt(&encrypted);
        assert!(matches!(result, Err(ContentKeyError::Authentication)));
    }

    #[test]
    fn test_tamper_detection_every_byte() {
        let key = ContentKey::generate();
        let encrypted = key.encrypt("LICENSE-XYZ").unwrap();
        for i in 0..encrypted.ciphertext().len() {
            let mut tampered = encrypted.clone();
            tampered.ciphertext_mut()[i] ^= 0x01;
            assert!(
                matches!(key.decrypt(&tampered), Err(ContentKeyError::Authentication)),
                "flipping byte {} was not detected",
                i
            );
        }
    }

    #[test]
    fn test_empty_payload() {
        let key = ContentKey::generate();
        let encrypted = key.encrypt("").unwrap();
        assert_eq!(encrypted.ciphertext().len(), TAG_SIZE);
        assert_eq!(key.decrypt(&encrypted).unwrap(), "");
    }

    #[test]
    fn test_malformed_text_forms() {
        for bad in [
            "",
            "no-separator",
            "!!!:AAAA",
            "AAAA:AAAA",
            "AAAAAAAAAAAAAAAA:!!!",
            "AAAAAAAAAAAAAAAA:AAAA",
        ] {
            assert!(
                matches!(
                    bad.parse::<EncryptedPayload>(),
                    Err(ContentKeyError::Malformed(_))
                ),
                "{:?} should be malformed",
                bad
            );
        }
    }

    #[test]
    fn test_key_size_validation() {
        assert!(ContentKey::from_slice(&[1u8; 16]).is_err());
        assert!(ContentKey::from_slice(&[1u8; 64]).is_err());
        assert!(ContentKey::from_slice(&[1u8; CONTENT_KEY_SIZE]).is_ok());
    }

    #[test]
    fn test_digest_is_stable() {
        let encrypted = ContentKey::generate().encrypt("payload").unwrap();
        let reparsed: EncryptedPayload = encrypted.to_string().parse().unwrap();
        assert_eq!(encrypted.digest(), reparsed.digest());
        assert_eq!(encrypted.digest().len(), 64);
    }

    #[test]
    fn test_decrypt_known_answer() {
        // produced by WebCrypto AES-GCM with the key 00..1f and iv 00..0b
        let key: Vec<u8> = (0u8..32).collect();
        let key = ContentKey::from_slice(&key).unwrap();
        let payload: EncryptedPayload = "AAECAwQFBgcICQoL:C0uVXou2hzbVGM2mg9lKWQSdtA4rh74O/FqJ3bHWRiY="
            .parse()
            .unwrap();
        assert_eq!(payload.iv(), &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);
        assert_eq!(key.decrypt(&payload).unwrap(), "LICENSE-XYZ-2024");
    }
}
