use clap::Args;

use common::crypto::KeyError;
use common::envelope::{build_envelope, derive_key_pair};
use common::error::ProtocolError;
use common::seed::Seed;

use super::{parse_public_key, sign_seed, WalletError};

/// Encrypt a payload and wrap its key for one recipient
#[derive(Args, Debug, Clone)]
pub struct Seal {
    /// Secret text to encrypt
    #[arg(long)]
    pub payload: String,

    /// Seal to the local wallet's key for this seed (or use --recipient)
    #[arg(long, group = "recipient_source")]
    pub seed: Option<Seed>,

    /// Seal to this public key, 0x hex or base64 (or use --seed)
    #[arg(long, group = "recipient_source")]
    pub recipient: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SealError {
    #[error("{0}")]
    Wallet(#[from] WalletError),
    #[error("invalid recipient: {0}")]
    Recipient(#[from] KeyError),
    #[error("{0}")]
    Protocol(#[from] ProtocolError),
    #[error("Either --seed or --recipient must be provided")]
    NoRecipient,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Seal {
    type Error = SealError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let recipient = if let Some(seed) = &self.seed {
            derive_key_pair(&sign_seed(ctx, seed).await?)?.public
        } else if let Some(text) = &self.recipient {
            parse_public_key(text)?
        } else {
            return Err(SealError::NoRecipient);
        };

        let envelope = build_envelope(&self.payload, &recipient)?;
        tracing::info!(
            "sealed payload {} for {}",
            envelope.encrypted_payload.digest(),
            recipient.to_hex()
        );

        Ok(format!(
            "encrypted_payload: {}\nwrapped_key:       {}\nwrapped_key_hex:   {}",
            envelope.encrypted_payload,
            envelope.wrapped_key.to_base64(),
            envelope.wrapped_key.to_hex()
        ))
    }
}
