//! Per-listing seeds
//!
//! A seed is the compact, URL-safe encoding of a random v4 UUID. It names the
//! listing's document in the blob store and is the message every party signs
//! to re-derive their listing key pair. Seeds are public: they show up in
//! URLs and on chain as the product `fileId`.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Prefix prepended to the seed before it is handed to a wallet for signing
pub const SIGN_PREFIX: &str = "payunlock-";
/// Length of a UUID seed in its compact encoding (16 bytes, unpadded base64url)
pub const SEED_LEN: usize = 22;

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("seed is empty")]
    Empty,
    #[error("seed contains {0:?}; only ASCII letters, digits, '-' and '_' are allowed")]
    InvalidChar(char),
    #[error("seed is not a compact uuid: {0}")]
    NotUuid(String),
}

/// Opaque listing identifier
///
/// Seeds minted by [`Seed::generate`] are always compact UUIDs, but the
/// protocol only ever uses the seed verbatim, so any non-empty string over the
/// base64url alphabet is accepted through [`Seed::new`]. Seeds become a path
/// segment in the blob store, which is why nothing else gets through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Seed(String);

impl Seed {
    /// Mint a fresh seed from a random v4 UUID
    pub fn generate() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    /// Encode a UUID as a 22 character base64url seed
    pub fn from_uuid(uuid: Uuid) -> Self {
        Seed(URL_SAFE_NO_PAD.encode(uuid.as_bytes()))
    }

    /// Wrap an arbitrary seed string
    pub fn new(seed: impl Into<String>) -> Result<Self, SeedError> {
        let seed = seed.into();
        if seed.is_empty() {
            return Err(SeedError::Empty);
        }
        if let Some(c) = seed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(SeedError::InvalidChar(c));
        }
        Ok(Seed(seed))
    }

    /// Parse a seed that must be a compact UUID
    pub fn parse_uuid(seed: &str) -> Result<Self, SeedError> {
        let seed = Seed::new(seed)?;
        seed.to_uuid()?;
        Ok(seed)
    }

    /// Decode the seed back into the UUID it was minted from
    pub fn to_uuid(&self) -> Result<Uuid, SeedError> {
        if self.0.len() != SEED_LEN {
            return Err(SeedError::NotUuid(self.0.clone()));
        }
        let bytes = URL_SAFE_NO_PAD
            .decode(&self.0)
            .map_err(|_| SeedError::NotUuid(self.0.clone()))?;
        Uuid::from_slice(&bytes).map_err(|_| SeedError::NotUuid(self.0.clone()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The exact bytes a wallet is asked to sign for this seed
    pub fn sign_message(&self) -> Vec<u8> {
        format!("{}{}", SIGN_PREFIX, self.0).into_bytes()
    }

    /// Path of the listing document in the blob store
    pub fn blob_path(&self) -> String {
        format!("{}.json", self.0)
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Seed {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seed = String::deserialize(deserializer)?;
        Seed::new(seed).map_err(serde::de::Error::custom)
    }
}

impl std::str::FromStr for Seed {
    type Err = SeedError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Seed::new(s)
    }
}
