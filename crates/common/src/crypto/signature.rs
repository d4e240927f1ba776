//! Wallet signature normalisation
//!
//! Key derivation is keyed on the bytes of a wallet signature over the listing
//! seed. Two wallet kinds produce those bytes:
//!
//! - **Native** Hedera account signers return a bare 64 byte signature
//!   (ED25519, or ECDSA `r || s`).
//! - **EVM personal-sign** returns 65 bytes, `r || s || v`.
//!
//! Both are reduced to the same 64 byte body before derivation. The recovery
//! byte `v` carries at most two bits of information that are already implied by
//! `r || s`, so dropping it keeps the derivation input canonical.

use std::fmt;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Size of a normalised signature body in bytes
pub const SIGNATURE_SIZE: usize = 64;
/// Size of an EVM personal-sign signature (`r || s || v`)
pub const EVM_SIGNATURE_SIZE: usize = 65;

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid signature length, expected 64 or 65 bytes, got {0}")]
    InvalidLength(usize),
    #[error("signature is neither hex nor base64")]
    Encoding,
}

/// Which wallet produced a signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureScheme {
    Native,
    EvmPersonalSign,
}

impl fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureScheme::Native => write!(f, "native"),
            SignatureScheme::EvmPersonalSign => write!(f, "evm-personal-sign"),
        }
    }
}

/// A wallet signature over `SIGN_PREFIX + seed`, normalised to 64 bytes
#[derive(Clone, PartialEq, Eq)]
pub struct SeedSignature {
    bytes: [u8; SIGNATURE_SIZE],
    scheme: SignatureScheme,
}

impl fmt::Debug for SeedSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // the signature is the key material for the derived pair
        f.debug_struct("SeedSignature")
            .field("scheme", &self.scheme)
            .finish_non_exhaustive()
    }
}

impl TryFrom<&[u8]> for SeedSignature {
    type Error = SignatureError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let scheme = match bytes.len() {
            SIGNATURE_SIZE => SignatureScheme::Native,
            EVM_SIGNATURE_SIZE => SignatureScheme::EvmPersonalSign,
            len => return Err(SignatureError::InvalidLength(len)),
        };
        let mut body = [0u8; SIGNATURE_SIZE];
        body.copy_from_slice(&bytes[..SIGNATURE_SIZE]);
        Ok(Self {
            bytes: body,
            scheme,
        })
    }
}

impl SeedSignature {
    /// Parse a signature from its text form
    ///
    /// Accepts `0x`-prefixed hex (EVM wallets), bare hex, and standard or
    /// URL-safe base64 (native wallets).
    pub fn parse(text: &str) -> Result<Self, SignatureError> {
        let text = text.trim();
        if let Some(hex) = text.strip_prefix("0x") {
            let bytes = hex::decode(hex).map_err(|_| SignatureError::Encoding)?;
            return Self::try_from(bytes.as_slice());
        }
        if let Ok(bytes) = hex::decode(text) {
            return Self::try_from(bytes.as_slice());
        }
        let bytes = STANDARD
            .decode(text)
            .or_else(|_| URL_SAFE_NO_PAD.decode(text.trim_end_matches('=')))
            .map_err(|_| SignatureError::Encoding)?;
        Self::try_from(bytes.as_slice())
    }

    /// The normalised 64 byte body fed into key derivation
    pub fn bytes(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.bytes
    }

    pub fn scheme(&self) -> SignatureScheme {
        self.scheme
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.bytes))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_native_signature_kept_verbatim() {
        let raw = [7u8; SIGNATURE_SIZE];
        let sig = SeedSignature::try_from(raw.as_slice()).unwrap();
        assert_eq!(sig.bytes(), &raw);
        assert_eq!(sig.scheme(), SignatureScheme::Native);
    }

    #[test]
    fn test_evm_recovery_byte_dropped() {
        let mut raw = [9u8; EVM_SIGNATURE_SIZE];
        raw[64] = 27;
        let v27 = SeedSignature::try_from(raw.as_slice()).unwrap();
        raw[64] = 28;
        let v28 = SeedSignature::try_from(raw.as_slice()).unwrap();
        assert_eq!(v27.scheme(), SignatureScheme::EvmPersonalSign);
        assert_eq!(v27.bytes(), v28.bytes());
        assert_eq!(v27.bytes(), &[9u8; SIGNATURE_SIZE]);
    }

    #[test]
    fn test_invalid_lengths_rejected() {
        for len in [0usize, 32, 63, 66, 128] {
            let raw = vec![1u8; len];
            assert!(matches!(
                SeedSignature::try_from(raw.as_slice()),
                Err(SignatureError::InvalidLength(l)) if l == len
            ));
        }
    }

    #[test]
    fn test_parse_text_forms() {
        let raw = [0xabu8; SIGNATURE_SIZE];
        let from_prefixed = SeedSignature::parse(&format!("0x{}", hex::encode(raw))).unwrap();
        let from_hex = SeedSignature::parse(&hex::encode(raw)).unwrap();
        let from_b64 = SeedSignature::parse(&STANDARD.encode(raw)).unwrap();
        let from_b64url = SeedSignature::parse(&URL_SAFE_NO_PAD.encode(raw)).unwrap();
        assert_eq!(from_prefixed, from_hex);
        assert_eq!(from_hex, from_b64);
        assert_eq!(from_b64, from_b64url);
        assert_eq!(from_hex.to_hex(), format!("0x{}", hex::encode(raw)));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            SeedSignature::parse("not a signature!"),
            Err(SignatureError::Encoding)
        ));
        assert!(matches!(
            SeedSignature::parse("0xzz"),
            Err(SignatureError::Encoding)
        ));
    }
}
