use clap::{Args, Subcommand};

pub mod create;
pub mod fetch;
pub mod ls;
pub mod open;
pub mod publish;
pub mod show;

use crate::cli::op::Op;

crate::command_enum! {
    (Ls, ls::Ls),
    (Show, show::Show),
    (Create, create::Create),
    (Fetch, fetch::Fetch),
    (Publish, publish::Publish),
    (Open, open::OpenListing),
}

// Rename the generated Command to ListingCommand for clarity
pub type ListingCommand = Command;

/// Products on the escrow contract and their listing documents
#[derive(Args, Debug, Clone)]
pub struct Listing {
    #[command(subcommand)]
    pub command: ListingCommand,
}

#[async_trait::async_trait]
impl Op for Listing {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}
