use clap::Args;
use time::OffsetDateTime;

use common::blob_store::{BlobStore, BlobStoreError};
use common::envelope::{build_envelope, derive_key_pair};
use common::error::ProtocolError;
use common::listing::ListingDocument;
use common::seed::Seed;
use common::signer::WalletSigner;
use payunlock_cli::state::StateError;

use crate::cli::ops::{sign_seed, WalletError};

/// Seal a payload to the local wallet and publish its listing document
///
/// This only writes the document; `listing create` also registers the product
/// on the escrow contract. The printed seed is the `fileId` it goes under.
#[derive(Args, Debug, Clone)]
pub struct Publish {
    #[arg(long)]
    pub name: String,

    #[arg(long, default_value = "")]
    pub description: String,

    /// Display price, in whole units of the token
    #[arg(long)]
    pub price: String,

    /// Hedera token id the price is in
    #[arg(long, default_value = "0.0.0")]
    pub token_id: String,

    /// Secret text delivered to the buyer
    #[arg(long)]
    pub payload: String,

    /// Publish under this seed instead of a fresh one
    #[arg(long)]
    pub seed: Option<Seed>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListingPublishError {
    #[error("{0}")]
    Wallet(#[from] WalletError),
    #[error("{0}")]
    State(#[from] StateError),
    #[error("{0}")]
    Protocol(#[from] ProtocolError),
    #[error("{0}")]
    Store(#[from] BlobStoreError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Publish {
    type Error = ListingPublishError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let seed = self.seed.clone().unwrap_or_else(Seed::generate);
        let seller = ctx.state()?.load_wallet()?;

        let pair = derive_key_pair(&sign_seed(ctx, &seed).await?)?;
        let envelope = build_envelope(&self.payload, &pair.public)?;

        let document = ListingDocument {
            name: self.name.clone(),
            description: self.description.clone(),
            token_id: self.token_id.clone(),
            price: self.price.clone(),
            encrypted_payload: envelope.encrypted_payload.to_string(),
            encrypted_key: envelope.wrapped_key.to_base64(),
            public_key: pair.public.to_base64(),
            seller: seller.address(),
            created_at: Some(OffsetDateTime::now_utc()),
        };
        ctx.store.publish(&seed, &document).await?;
        tracing::info!("published listing {} for {}", seed, document.seller);

        let network = ctx.config.network.config();
        let currency = network
            .token(&self.token_id)
            .map(|token| token.symbol.clone())
            .unwrap_or_else(|| self.token_id.clone());
        Ok(format!(
            "seed:       {}\ndocument:   {}{}\nprice:      {} {}\npublic_key: {}",
            seed,
            ctx.store.cdn_base_url,
            seed.blob_path(),
            self.price,
            currency,
            pair.public.to_hex(),
        ))
    }
}
