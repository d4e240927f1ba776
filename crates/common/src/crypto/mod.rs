//! Cryptographic primitives for PayUnlock
//!
//! This module provides the building blocks of the secret delivery protocol:
//!
//! - **Signature normalisation**: wallet signatures from native and EVM wallets
//!   reduced to one canonical 64 byte body
//! - **Seed-derived key agreement**: secp256k1 key pairs recomputed on demand
//!   from a wallet signature over `SIGN_PREFIX + seed`
//! - **Payload encryption**: AES-256-GCM under a one-time `ContentKey`
//! - **Key wrapping**: ECIES (secp256k1 + HKDF-SHA256 + AES-256-GCM) sealing the
//!   content key to a single recipient
//!
//! # Security Model
//!
//! ## Listing Keys
//! No private key is ever stored. A party's key pair for a listing is a pure
//! function of their wallet signature over that listing's seed, so the wallet's
//! own custody guarantees are the only custody guarantees.
//!
//! ## Content Encryption
//! A listing's payload is encrypted exactly once. Its ciphertext (and therefore
//! its hash) is fixed from creation onward.
//!
//! ## Handoff
//! Delivering to a buyer only re-wraps the 32 byte content key: the seller
//! unwraps it with their own derived key and seals it again to the buyer's
//! on-chain public key.

mod content_key;
mod keys;
mod signature;
mod wrapped_key;

pub use content_key::{ContentKey, ContentKeyError, EncryptedPayload, CONTENT_KEY_SIZE, IV_SIZE};
pub use keys::{
    KeyError, KeyPair, PublicKey, SecretKey, MAX_DERIVATION_ATTEMPTS, PUBLIC_KEY_SIZE,
};
pub use signature::{
    SeedSignature, SignatureError, SignatureScheme, EVM_SIGNATURE_SIZE, SIGNATURE_SIZE,
};
pub use wrapped_key::{WrappedKey, WrappedKeyError, WRAPPED_KEY_SIZE};
