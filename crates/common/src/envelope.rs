//! Envelope encryption procedures
//!
//! These are the three pure steps of the handoff. No network and no wallet
//! prompts happen here; callers hand in signatures they already obtained.
//!
//! ```text
//!  create listing   build_envelope(payload, seller_pk)      -> payload ct, seller-wrapped key
//!  deliver          rewrap_key(seller-wrapped, seller_sk, buyer_pk) -> buyer-wrapped key
//!  reveal           open_envelope(buyer_sig, buyer-wrapped, payload ct) -> payload
//! ```

use crate::crypto::{ContentKey, EncryptedPayload, KeyPair, PublicKey, SecretKey, SeedSignature, WrappedKey};
use crate::error::{OpenStage, ProtocolError};

/// The encrypted payload of a listing together with its content key wrapped
/// for one recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub encrypted_payload: EncryptedPayload,
    pub wrapped_key: WrappedKey,
}

/// Reproduce a party's listing key pair from the raw bytes their wallet
/// returned when signing `SIGN_PREFIX + seed`
pub fn derive_key_pair(signature: &[u8]) -> Result<KeyPair, ProtocolError> {
    let signature = SeedSignature::try_from(signature)?;
    Ok(KeyPair::derive(&signature)?)
}

/// Encrypt `payload` under a fresh content key and wrap that key for `recipient`
///
/// The content key is dropped on return; only its wrapped form survives.
pub fn build_envelope(payload: &str, recipient: &PublicKey) -> Result<Envelope, ProtocolError> {
    let key = ContentKey::generate();
    let encrypted_payload = key.encrypt(payload)?;
    let wrapped_key = WrappedKey::wrap(&key, recipient)?;
    Ok(Envelope {
        encrypted_payload,
        wrapped_key,
    })
}

/// Move a content key from one recipient to another without touching the payload
///
/// # Errors
///
/// [`ProtocolError::UnwrapFailure`] if `own_secret` is not the key `wrapped`
/// was addressed to.
pub fn rewrap_key(
    wrapped: &WrappedKey,
    own_secret: &SecretKey,
    new_recipient: &PublicKey,
) -> Result<WrappedKey, ProtocolError> {
    let key = wrapped.unwrap(own_secret)?;
    Ok(WrappedKey::wrap(&key, new_recipient)?)
}

/// Recover the plaintext of a delivered listing
///
/// `signature` is the recipient's raw wallet signature over the listing seed.
/// Any failure is reported as [`ProtocolError::Open`] carrying the step that
/// failed, so a bad signature, a key addressed to someone else and corrupted
/// ciphertext are all told apart.
pub fn open_envelope(
    signature: &[u8],
    wrapped: &WrappedKey,
    encrypted_payload: &EncryptedPayload,
) -> Result<String, ProtocolError> {
    let pair = derive_key_pair(signature).map_err(|e| e.at(OpenStage::Signature))?;
    let key = wrapped
        .unwrap(&pair.secret)
        .map_err(|e| ProtocolError::from(e).at(OpenStage::Unwrap))?;
    key.decrypt(encrypted_payload)
        .map_err(|e| ProtocolError::from(e).at(OpenStage::Decrypt))
}
