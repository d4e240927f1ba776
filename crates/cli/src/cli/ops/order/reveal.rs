use clap::Args;

use common::lifecycle::{Buyer, Seller};

use super::wallet_and_escrow;
use crate::cli::ops::ChainError;

/// Decrypt a product's payload without touching the chain
#[derive(Args, Debug, Clone)]
pub struct Reveal {
    #[arg(long)]
    pub id: u64,

    /// Open our own listing with the seller key instead of a delivered copy
    #[arg(long)]
    pub seller: bool,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Reveal {
    type Error = ChainError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (wallet, escrow) = wallet_and_escrow(ctx)?;
        let plaintext = if self.seller {
            Seller::new(wallet, escrow, ctx.store.clone())
                .reveal(self.id)
                .await?
        } else {
            Buyer::new(wallet, escrow, ctx.store.clone())
                .reveal(self.id)
                .await?
        };
        Ok(plaintext)
    }
}
