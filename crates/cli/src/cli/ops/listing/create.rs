use clap::Args;

use common::lifecycle::{ListingDraft, Seller};
use common::listing::ZERO_ADDRESS;
use common::seed::Seed;

use crate::cli::ops::ChainError;

/// Seal a payload, publish its listing document and register it on chain
#[derive(Args, Debug, Clone)]
pub struct Create {
    #[arg(long)]
    pub name: String,

    #[arg(long, default_value = "")]
    pub description: String,

    /// Price in whole units of the currency, e.g. 12.5
    #[arg(long)]
    pub price: String,

    /// Hedera token id the price is in
    #[arg(long, default_value = "0.0.0")]
    pub token_id: String,

    /// ERC-20 address of the currency, the zero address for HBAR
    #[arg(long, default_value = ZERO_ADDRESS)]
    pub currency: String,

    /// Secret text delivered to the buyer
    #[arg(long)]
    pub payload: String,

    /// List under this seed instead of a fresh one; retrying with the same
    /// seed reuses a document published by an earlier failed attempt
    #[arg(long)]
    pub seed: Option<Seed>,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Create {
    type Error = ChainError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let wallet = ctx.state()?.load_wallet()?;
        let escrow = ctx.escrow_as(&wallet)?;
        let seller = Seller::new(wallet, escrow, ctx.store.clone());

        let draft = ListingDraft {
            name: self.name.clone(),
            description: self.description.clone(),
            token_id: self.token_id.clone(),
            currency: self.currency.clone(),
            price: self.price.clone(),
            payload: self.payload.clone(),
        };
        let seed = self.seed.clone().unwrap_or_else(Seed::generate);
        let listing = seller.create_listing_with_seed(seed, draft).await?;

        let network = ctx.config.network.config();
        Ok(format!(
            "id:       {}\nseed:     {}\ndocument: {}{}\ntx:       {}",
            listing.id,
            listing.seed,
            ctx.store.cdn_base_url,
            listing.seed.blob_path(),
            network.transaction_url(&listing.tx_hash),
        ))
    }
}
