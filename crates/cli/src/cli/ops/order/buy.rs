use clap::Args;

use common::lifecycle::Buyer;

use super::{tx_line, wallet_and_escrow};
use crate::cli::ops::ChainError;

/// Pay for a product, locking the price in escrow
///
/// ERC-20 products need an allowance for the escrow contract set beforehand.
#[derive(Args, Debug, Clone)]
pub struct Buy {
    #[arg(long)]
    pub id: u64,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Buy {
    type Error = ChainError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (wallet, escrow) = wallet_and_escrow(ctx)?;
        let tx_hash = Buyer::new(wallet, escrow, ctx.store.clone())
            .purchase(self.id)
            .await?;
        Ok(format!("purchased product {}\n{}", self.id, tx_line(ctx, &tx_hash)))
    }
}
