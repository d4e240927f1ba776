use clap::Args;

use common::blob_store::{BlobStore, BlobStoreError};
use common::seed::Seed;

#[derive(Args, Debug, Clone)]
pub struct Fetch {
    #[arg(long)]
    pub seed: Seed,
}

#[derive(Debug, thiserror::Error)]
pub enum ListingFetchError {
    #[error("{0}")]
    Store(#[from] BlobStoreError),
    #[error("failed to render document: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Fetch {
    type Error = ListingFetchError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let document = ctx.store.fetch(&self.seed).await?;
        Ok(serde_json::to_string_pretty(&document)?)
    }
}
