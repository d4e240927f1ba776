use clap::Args;

use common::crypto::{KeyError, WrappedKeyError};
use common::envelope::{derive_key_pair, rewrap_key};
use common::error::ProtocolError;
use common::seed::Seed;

use super::{parse_public_key, parse_wrapped_key, sign_seed, WalletError};

/// Hand a content key over to a buyer
///
/// Unwraps with the local wallet's key for the seed and seals the key again
/// to the recipient. The encrypted payload is not touched.
#[derive(Args, Debug, Clone)]
pub struct Rewrap {
    #[arg(long)]
    pub seed: Seed,

    /// Key currently wrapped for us, 0x hex or base64
    #[arg(long)]
    pub wrapped_key: String,

    /// Buyer's public key, 0x hex or base64
    #[arg(long)]
    pub recipient: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RewrapError {
    #[error("{0}")]
    Wallet(#[from] WalletError),
    #[error("invalid wrapped key: {0}")]
    WrappedKey(#[from] WrappedKeyError),
    #[error("invalid recipient: {0}")]
    Recipient(#[from] KeyError),
    #[error("{0}")]
    Protocol(#[from] ProtocolError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Rewrap {
    type Error = RewrapError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let wrapped = parse_wrapped_key(&self.wrapped_key)?;
        let recipient = parse_public_key(&self.recipient)?;

        let own = derive_key_pair(&sign_seed(ctx, &self.seed).await?)?;
        let rewrapped = rewrap_key(&wrapped, &own.secret, &recipient)?;
        tracing::info!("rewrapped key for seed {} to {}", self.seed, recipient.to_hex());

        Ok(format!(
            "wrapped_key:     {}\nwrapped_key_hex: {}",
            rewrapped.to_base64(),
            rewrapped.to_hex()
        ))
    }
}
