use clap::Args;

use common::blob_store::{BlobStore, BlobStoreError};
use common::crypto::{SeedSignature, SignatureError, WrappedKeyError};
use common::envelope::open_envelope;
use common::error::ProtocolError;
use common::seed::Seed;

use crate::cli::ops::{parse_wrapped_key, sign_seed, WalletError};

/// Fetch a listing and decrypt its payload
///
/// Without `--wrapped-key` this opens the seller's copy from the document;
/// a buyer passes the key the seller delivered on chain.
#[derive(Args, Debug, Clone)]
pub struct OpenListing {
    #[arg(long)]
    pub seed: Seed,

    /// Content key wrapped for us, 0x hex or base64
    #[arg(long)]
    pub wrapped_key: Option<String>,

    /// Use this seed signature instead of asking the local wallet
    #[arg(long)]
    pub signature: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListingOpenError {
    #[error("{0}")]
    Store(#[from] BlobStoreError),
    #[error("{0}")]
    Wallet(#[from] WalletError),
    #[error("invalid signature: {0}")]
    Signature(#[from] SignatureError),
    #[error("invalid wrapped key: {0}")]
    WrappedKey(#[from] WrappedKeyError),
    #[error("{0}")]
    Protocol(#[from] ProtocolError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for OpenListing {
    type Error = ListingOpenError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let document = ctx.store.fetch(&self.seed).await?;
        let payload = document.encrypted_payload()?;
        let wrapped = match &self.wrapped_key {
            Some(text) => parse_wrapped_key(text)?,
            None => document.wrapped_key()?,
        };

        let signature = match &self.signature {
            Some(text) => SeedSignature::parse(text)?.bytes().to_vec(),
            None => sign_seed(ctx, &self.seed).await?,
        };

        Ok(open_envelope(&signature, &wrapped, &payload)?)
    }
}
