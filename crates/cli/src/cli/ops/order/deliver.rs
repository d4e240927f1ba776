use clap::Args;

use common::lifecycle::Seller;

use super::{tx_line, wallet_and_escrow};
use crate::cli::ops::ChainError;

/// Rewrap the content key for the paying buyer and submit it
#[derive(Args, Debug, Clone)]
pub struct Deliver {
    #[arg(long)]
    pub id: u64,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Deliver {
    type Error = ChainError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (wallet, escrow) = wallet_and_escrow(ctx)?;
        let tx_hash = Seller::new(wallet, escrow, ctx.store.clone())
            .deliver(self.id)
            .await?;
        Ok(format!("delivered product {}\n{}", self.id, tx_line(ctx, &tx_hash)))
    }
}
