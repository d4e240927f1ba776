use clap::Args;

use common::crypto::{ContentKeyError, EncryptedPayload, SeedSignature, SignatureError, WrappedKeyError};
use common::envelope::open_envelope;
use common::error::ProtocolError;
use common::seed::Seed;

use super::{parse_wrapped_key, sign_seed, WalletError};

/// Decrypt a payload with a key wrapped for us
#[derive(Args, Debug, Clone)]
pub struct Open {
    /// Sign this seed with the local wallet (or use --signature)
    #[arg(long, group = "signature_source")]
    pub seed: Option<Seed>,

    /// Content key wrapped for us, 0x hex or base64
    #[arg(long)]
    pub wrapped_key: String,

    /// Encrypted payload, `ivB64:ciphertextB64`
    #[arg(long)]
    pub payload: String,

    /// A seed signature produced elsewhere, hex or base64 (or use --seed)
    #[arg(long, group = "signature_source")]
    pub signature: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error("{0}")]
    Wallet(#[from] WalletError),
    #[error("invalid signature: {0}")]
    Signature(#[from] SignatureError),
    #[error("invalid wrapped key: {0}")]
    WrappedKey(#[from] WrappedKeyError),
    #[error("invalid payload: {0}")]
    Payload(#[from] ContentKeyError),
    #[error("{0}")]
    Protocol(#[from] ProtocolError),
    #[error("Either --seed or --signature must be provided")]
    NoSignatureSource,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Open {
    type Error = OpenError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let wrapped = parse_wrapped_key(&self.wrapped_key)?;
        let payload: EncryptedPayload = self.payload.parse()?;

        let signature = if let Some(text) = &self.signature {
            SeedSignature::parse(text)?.bytes().to_vec()
        } else if let Some(seed) = &self.seed {
            sign_seed(ctx, seed).await?
        } else {
            return Err(OpenError::NoSignatureSource);
        };

        Ok(open_envelope(&signature, &wrapped, &payload)?)
    }
}
