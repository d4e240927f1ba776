use clap::Args;

use common::lifecycle::Buyer;

use super::{tx_line, wallet_and_escrow};
use crate::cli::ops::ChainError;

/// Decrypt the delivered payload and confirm receipt, releasing payment
#[derive(Args, Debug, Clone)]
pub struct Confirm {
    #[arg(long)]
    pub id: u64,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Confirm {
    type Error = ChainError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (wallet, escrow) = wallet_and_escrow(ctx)?;
        let confirmation = Buyer::new(wallet, escrow, ctx.store.clone())
            .confirm(self.id)
            .await?;
        Ok(format!(
            "{}\n{}",
            confirmation.plaintext,
            tx_line(ctx, &confirmation.tx_hash)
        ))
    }
}
