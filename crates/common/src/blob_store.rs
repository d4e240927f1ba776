use std::fmt;

use async_trait::async_trait;

use crate::error::ProtocolError;
use crate::listing::ListingDocument;
use crate::seed::Seed;

#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    #[error("no document for seed {0}")]
    NotFound(Seed),
    #[error("blob store unreachable: {0}")]
    Network(String),
    #[error("invalid listing document: {0}")]
    Invalid(String),
    /// The store refused the write, e.g. the path is already taken
    #[error("blob store rejected the document: {0}")]
    Rejected(String),
}

impl From<BlobStoreError> for ProtocolError {
    fn from(err: BlobStoreError) -> Self {
        match err {
            BlobStoreError::NotFound(seed) => ProtocolError::ListingNotFound(seed),
            BlobStoreError::Network(msg) => ProtocolError::NetworkFailure(msg),
            BlobStoreError::Invalid(msg) => ProtocolError::DecryptionFailure(msg),
            BlobStoreError::Rejected(msg) => ProtocolError::StorageRejected(msg),
        }
    }
}

/// Flat store of listing documents keyed by seed
///
/// Documents are immutable once published; the encrypted payload they carry
/// is never rewritten.
#[async_trait]
pub trait BlobStore: Send + Sync + fmt::Debug {
    /// Fetch the document at `{seed}.json`
    async fn fetch(&self, seed: &Seed) -> Result<ListingDocument, BlobStoreError>;

    /// Write the document at `{seed}.json`
    async fn publish(&self, seed: &Seed, document: &ListingDocument)
        -> Result<(), BlobStoreError>;
}
