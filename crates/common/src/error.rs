use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crypto::{ContentKeyError, KeyError, SignatureError, WrappedKeyError};
use crate::seed::Seed;

/// Which step of opening a delivered envelope failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenStage {
    /// Obtaining or normalising the wallet signature, or deriving the key pair from it
    Signature,
    /// Unwrapping the buyer-addressed content key
    Unwrap,
    /// Decrypting the payload with the recovered content key
    Decrypt,
}

impl fmt::Display for OpenStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenStage::Signature => write!(f, "signature"),
            OpenStage::Unwrap => write!(f, "key unwrap"),
            OpenStage::Decrypt => write!(f, "payload decryption"),
        }
    }
}

/// Failure kinds surfaced by every protocol procedure
///
/// `UnwrapFailure` (wrong party) and `DecryptionFailure` (corrupted data) need
/// different remediation, so they are never folded together.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    #[error("key derivation exhausted: {0}")]
    KeyDerivationExhausted(String),
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("encryption failed: {0}")]
    EncryptionFailure(String),
    #[error("you are not authorized to unwrap this key")]
    UnwrapFailure,
    #[error("decryption failed: {0}")]
    DecryptionFailure(String),
    #[error("wallet signer failed: {0}")]
    SignerFailure(String),
    #[error("listing {0} not found in blob store")]
    ListingNotFound(Seed),
    #[error("network failure: {0}")]
    NetworkFailure(String),
    #[error("contract rejected: {0}")]
    ContractRejected(String),
    #[error("blob store rejected: {0}")]
    StorageRejected(String),
    #[error("{stage} failed: {source}")]
    Open {
        stage: OpenStage,
        source: Box<ProtocolError>,
    },
}

impl ProtocolError {
    /// Stable machine-readable name of the failure
    pub fn kind(&self) -> &'static str {
        match self {
            ProtocolError::InvalidSignature(_) => "invalid_signature",
            ProtocolError::KeyDerivationExhausted(_) => "key_derivation_exhausted",
            ProtocolError::InvalidPublicKey(_) => "invalid_public_key",
            ProtocolError::EncryptionFailure(_) => "encryption_failure",
            ProtocolError::UnwrapFailure => "unwrap_failure",
            ProtocolError::DecryptionFailure(_) => "decryption_failure",
            ProtocolError::SignerFailure(_) => "signer_failure",
            ProtocolError::ListingNotFound(_) => "listing_not_found",
            ProtocolError::NetworkFailure(_) => "network_failure",
            ProtocolError::ContractRejected(_) => "contract_rejected",
            ProtocolError::StorageRejected(_) => "storage_rejected",
            ProtocolError::Open { source, .. } => source.kind(),
        }
    }

    /// The failing step when opening an envelope, if this came from one
    pub fn stage(&self) -> Option<OpenStage> {
        match self {
            ProtocolError::Open { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Whether retrying the same call later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ProtocolError::NetworkFailure(_) => true,
            ProtocolError::Open { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    pub(crate) fn at(self, stage: OpenStage) -> Self {
        ProtocolError::Open {
            stage,
            source: Box::new(self),
        }
    }
}

impl From<SignatureError> for ProtocolError {
    fn from(err: SignatureError) -> Self {
        ProtocolError::InvalidSignature(err.to_string())
    }
}

impl From<KeyError> for ProtocolError {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::DerivationExhausted(_) => {
                ProtocolError::KeyDerivationExhausted(err.to_string())
            }
            KeyError::InvalidPublicKey(msg) => ProtocolError::InvalidPublicKey(msg),
            KeyError::InvalidPrivateKey(_) => {
                ProtocolError::InvalidSignature(err.to_string())
            }
        }
    }
}

impl From<ContentKeyError> for ProtocolError {
    fn from(err: ContentKeyError) -> Self {
        match err {
            ContentKeyError::Encrypt(msg) => ProtocolError::EncryptionFailure(msg),
            ContentKeyError::Authentication
            | ContentKeyError::Malformed(_)
            | ContentKeyError::Utf8(_) => ProtocolError::DecryptionFailure(err.to_string()),
        }
    }
}

impl From<WrappedKeyError> for ProtocolError {
    fn from(err: WrappedKeyError) -> Self {
        match err {
            WrappedKeyError::Wrap(msg) => ProtocolError::EncryptionFailure(msg),
            WrappedKeyError::Unauthorized => ProtocolError::UnwrapFailure,
            WrappedKeyError::Malformed(_) => ProtocolError::DecryptionFailure(err.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_unwrap_and_decrypt_stay_distinct() {
        let unwrap: ProtocolError = WrappedKeyError::Unauthorized.into();
        let decrypt: ProtocolError = ContentKeyError::Authentication.into();
        assert_eq!(unwrap.kind(), "unwrap_failure");
        assert_eq!(decrypt.kind(), "decryption_failure");
    }

    #[test]
    fn test_open_wraps_stage_and_kind() {
        let err = ProtocolError::UnwrapFailure.at(OpenStage::Unwrap);
        assert_eq!(err.stage(), Some(OpenStage::Unwrap));
        assert_eq!(err.kind(), "unwrap_failure");
        assert_eq!(
            err.to_string(),
            "key unwrap failed: you are not authorized to unwrap this key"
        );
    }

    #[test]
    fn test_only_network_failures_retry() {
        assert!(ProtocolError::NetworkFailure("timeout".into()).is_retryable());
        assert!(!ProtocolError::ContractRejected("revert".into()).is_retryable());
        assert!(!ProtocolError::UnwrapFailure.is_retryable());
    }

    #[test]
    fn test_derivation_exhausted_maps() {
        let err: ProtocolError = KeyError::DerivationExhausted(8).into();
        assert_eq!(err.kind(), "key_derivation_exhausted");
    }
}
