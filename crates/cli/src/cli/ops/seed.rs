use clap::Args;
use uuid::Uuid;

use common::seed::{Seed, SeedError};

/// Mint a listing seed, or decode one back to its UUID
#[derive(Args, Debug, Clone)]
pub struct Mint {
    /// Encode this UUID instead of a random one
    #[arg(long, group = "source")]
    pub uuid: Option<Uuid>,

    /// Decode an existing seed back into its UUID
    #[arg(long, group = "source")]
    pub decode: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SeedOpError {
    #[error("{0}")]
    Seed(#[from] SeedError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Mint {
    type Error = SeedOpError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        if let Some(seed) = &self.decode {
            return Ok(Seed::parse_uuid(seed)?.to_uuid()?.to_string());
        }
        let seed = match self.uuid {
            Some(uuid) => Seed::from_uuid(uuid),
            None => Seed::generate(),
        };
        Ok(seed.to_string())
    }
}
