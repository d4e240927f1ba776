use clap::Args;

use common::crypto::{SeedSignature, SignatureError};
use common::envelope::derive_key_pair;
use common::error::ProtocolError;
use common::seed::Seed;

use super::{sign_seed, WalletError};

/// Derive a listing key pair from a seed signature
#[derive(Args, Debug, Clone)]
pub struct Keygen {
    /// Sign this seed with the local wallet (or use --signature)
    #[arg(long, group = "signature_source")]
    pub seed: Option<Seed>,

    /// A signature produced elsewhere, hex or base64 (or use --seed)
    #[arg(long, group = "signature_source")]
    pub signature: Option<String>,

    /// Also print the private key
    #[arg(long)]
    pub reveal_secret: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum KeygenError {
    #[error("{0}")]
    Wallet(#[from] WalletError),
    #[error("invalid signature: {0}")]
    Signature(#[from] SignatureError),
    #[error("{0}")]
    Protocol(#[from] ProtocolError),
    #[error("Either --seed or --signature must be provided")]
    NoSignatureSource,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Keygen {
    type Error = KeygenError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let raw = if let Some(seed) = &self.seed {
            sign_seed(ctx, seed).await?
        } else if let Some(text) = &self.signature {
            SeedSignature::parse(text)?.bytes().to_vec()
        } else {
            return Err(KeygenError::NoSignatureSource);
        };

        let pair = derive_key_pair(&raw)?;
        let mut lines = vec![
            format!("public_key:        {}", pair.public.to_hex()),
            format!("public_key_base64: {}", pair.public.to_base64()),
        ];
        if self.reveal_secret {
            lines.push(format!("secret_key:        {}", pair.secret.to_hex()));
        }
        Ok(lines.join("\n"))
    }
}
