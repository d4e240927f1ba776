//! Moving a product through the escrow: pay, deliver, confirm, settle

use clap::{Args, Subcommand};

use common::signer::LocalWallet;
use payunlock_cli::rpc::RpcEscrow;

use crate::cli::op::OpContext;
use crate::cli::ops::ChainError;

pub mod buy;
pub mod confirm;
pub mod deliver;
pub mod refund;
pub mod reveal;
pub mod withdraw;

crate::command_enum! {
    (Buy, buy::Buy),
    (Deliver, deliver::Deliver),
    (Reveal, reveal::Reveal),
    (Confirm, confirm::Confirm),
    (Refund, refund::Refund),
    (Withdraw, withdraw::Withdraw),
}

pub type OrderCommand = Command;

/// Escrow orders for a product id
#[derive(Args, Debug, Clone)]
pub struct Order {
    #[command(subcommand)]
    pub command: OrderCommand,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Order {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

/// The local wallet and the escrow contract it transacts with
pub(crate) fn wallet_and_escrow(ctx: &OpContext) -> Result<(LocalWallet, RpcEscrow), ChainError> {
    let wallet = ctx.state()?.load_wallet()?;
    let escrow = ctx.escrow_as(&wallet)?;
    Ok((wallet, escrow))
}

/// `tx: <hash>` followed by the explorer link
pub(crate) fn tx_line(ctx: &OpContext, tx_hash: &str) -> String {
    format!(
        "tx: {}",
        ctx.config.network.config().transaction_url(tx_hash)
    )
}
