use clap::Args;

use common::lifecycle::Buyer;

use super::{tx_line, wallet_and_escrow};
use crate::cli::ops::ChainError;

/// Return the escrowed payment of an undelivered order to the buyer
///
/// Either party may submit it; the contract decides whether it is allowed yet.
#[derive(Args, Debug, Clone)]
pub struct Refund {
    #[arg(long)]
    pub id: u64,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Refund {
    type Error = ChainError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (wallet, escrow) = wallet_and_escrow(ctx)?;
        let tx_hash = Buyer::new(wallet, escrow, ctx.store.clone())
            .refund(self.id)
            .await?;
        Ok(format!("refunded product {}\n{}", self.id, tx_line(ctx, &tx_hash)))
    }
}
