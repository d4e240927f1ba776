use clap::{Args, ValueEnum};

use common::crypto::SignatureScheme;
use common::network::Network;
use common::signer::WalletSigner;
use payunlock_cli::state::{AppConfig, AppState, StateError};

/// Which kind of local wallet key to generate
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletKind {
    /// Ed25519, signs the raw message
    Native,
    /// secp256k1, signs the EIP-191 personal message digest
    Evm,
}

impl From<WalletKind> for SignatureScheme {
    fn from(kind: WalletKind) -> Self {
        match kind {
            WalletKind::Native => SignatureScheme::Native,
            WalletKind::Evm => SignatureScheme::EvmPersonalSign,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Hedera network the escrow contract lives on
    #[arg(long, default_value = "testnet")]
    pub network: Network,

    /// Kind of wallet key to generate
    #[arg(long, value_enum, default_value = "evm")]
    pub wallet: WalletKind,

    /// Timeout for blob store requests, in seconds
    #[arg(long, default_value_t = 10)]
    pub request_timeout_secs: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("{0}")]
    State(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        // --cdn-url / --upload-url / --rpc-url overrides already live in ctx.config
        let config = AppConfig {
            network: self.network,
            request_timeout_secs: self.request_timeout_secs,
            ..ctx.config.clone()
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config), self.wallet.into())?;
        let wallet = state.load_wallet()?;
        tracing::info!("initialized {}", state.payunlock_dir.display());

        let mut lines = vec![format!(
            "Initialized payunlock directory at {}",
            state.payunlock_dir.display()
        )];
        lines.push(format!("  wallet:  {} ({})", wallet.address(), wallet.scheme()));
        lines.push(format!("  network: {}", state.config.network));
        lines.push(format!("  cdn:     {}", state.config.cdn_base_url));
        lines.push(format!("  upload:  {}", state.config.upload_url));
        if let Some(rpc_url) = &state.config.rpc_url {
            lines.push(format!("  relay:   {}", rpc_url));
        }
        Ok(lines.join("\n"))
    }
}
