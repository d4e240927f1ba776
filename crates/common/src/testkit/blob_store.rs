use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::blob_store::{BlobStore, BlobStoreError};
use crate::listing::ListingDocument;
use crate::seed::Seed;

/// In-memory blob store keyed by seed
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    inner: Arc<Mutex<MemoryBlobStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryBlobStoreInner {
    documents: HashMap<Seed, ListingDocument>,
    offline: bool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the store were unreachable
    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().offline = offline;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn fetch(&self, seed: &Seed) -> Result<ListingDocument, BlobStoreError> {
        let inner = self.inner.lock();
        if inner.offline {
            return Err(BlobStoreError::Network("blob store offline".into()));
        }
        inner
            .documents
            .get(seed)
            .cloned()
            .ok_or_else(|| BlobStoreError::NotFound(seed.clone()))
    }

    async fn publish(
        &self,
        seed: &Seed,
        document: &ListingDocument,
    ) -> Result<(), BlobStoreError> {
        let mut inner = self.inner.lock();
        if inner.offline {
            return Err(BlobStoreError::Network("blob store offline".into()));
        }
        // published documents are immutable
        if inner.documents.contains_key(seed) {
            return Err(BlobStoreError::Rejected(format!(
                "document {} already published",
                seed.blob_path()
            )));
        }
        inner.documents.insert(seed.clone(), document.clone());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ProtocolError;

    fn document(name: &str) -> ListingDocument {
        ListingDocument {
            name: name.into(),
            description: "d".into(),
            token_id: "0.0.0".into(),
            price: "1".into(),
            encrypted_payload: "iv:ct".into(),
            encrypted_key: "key".into(),
            public_key: "pk".into(),
            seller: "0.0.1".into(),
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_republish_is_rejected() {
        let store = MemoryBlobStore::new();
        let seed = Seed::new("abc123").unwrap();
        store.publish(&seed, &document("first")).await.unwrap();

        let err = store.publish(&seed, &document("second")).await.unwrap_err();
        assert!(matches!(err, BlobStoreError::Rejected(_)));
        assert_eq!(ProtocolError::from(err).kind(), "storage_rejected");
        assert_eq!(store.fetch(&seed).await.unwrap().name, "first");
    }
}
