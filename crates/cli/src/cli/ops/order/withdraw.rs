use clap::Args;

use common::lifecycle::Seller;

use super::{tx_line, wallet_and_escrow};
use crate::cli::ops::ChainError;

/// Collect payment for a confirmed order, or one whose confirm window lapsed
#[derive(Args, Debug, Clone)]
pub struct Withdraw {
    #[arg(long)]
    pub id: u64,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Withdraw {
    type Error = ChainError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (wallet, escrow) = wallet_and_escrow(ctx)?;
        let tx_hash = Seller::new(wallet, escrow, ctx.store.clone())
            .withdraw(self.id)
            .await?;
        Ok(format!("withdrew product {}\n{}", self.id, tx_line(ctx, &tx_hash)))
    }
}
