use clap::Args;

use common::crypto::{SeedSignature, SignatureError};
use common::seed::Seed;

use super::{sign_seed, WalletError};

/// Sign `payunlock-{seed}` with the local wallet
#[derive(Args, Debug, Clone)]
pub struct Sign {
    #[arg(long)]
    pub seed: Seed,
}

#[derive(Debug, thiserror::Error)]
pub enum SignError {
    #[error("{0}")]
    Wallet(#[from] WalletError),
    #[error("wallet returned an unusable signature: {0}")]
    Signature(#[from] SignatureError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Sign {
    type Error = SignError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let raw = sign_seed(ctx, &self.seed).await?;
        let signature = SeedSignature::try_from(raw.as_slice())?;
        Ok(format!(
            "scheme:     {}\nsignature:  0x{}\nnormalised: {}",
            signature.scheme(),
            hex::encode(&raw),
            signature.to_hex()
        ))
    }
}
