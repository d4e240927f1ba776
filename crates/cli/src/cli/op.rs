use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use common::signer::LocalWallet;

use crate::cli::ops::ChainError;
use payunlock_cli::http::{ApiError, CdnClient};
use payunlock_cli::rpc::{JsonRpcClient, RpcError, RpcEscrow};
use payunlock_cli::state::{AppConfig, AppState, StateError};

/// Resolve the effective configuration.
///
/// Priority: explicit `--cdn-url` / `--upload-url` / `--rpc-url` flags > config file > defaults.
/// An uninitialized directory is not an error here; read-only commands work
/// without a wallet.
pub fn resolve_config(
    config_path: Option<PathBuf>,
    cdn_url: Option<Url>,
    upload_url: Option<Url>,
    rpc_url: Option<Url>,
) -> AppConfig {
    let mut config = AppState::load(config_path)
        .map(|state| state.config)
        .unwrap_or_default();
    if let Some(url) = cdn_url {
        config.cdn_base_url = url;
    }
    if let Some(url) = upload_url {
        config.upload_url = url;
    }
    if let Some(url) = rpc_url {
        config.rpc_url = Some(url);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use payunlock_cli::state::DEFAULT_CDN_BASE_URL;

    #[test]
    fn test_resolve_config_explicit_wins() {
        let explicit = Url::parse("http://example.com:9999/blobs/").unwrap();
        let config = resolve_config(None, Some(explicit.clone()), None, None);
        assert_eq!(config.cdn_base_url, explicit);

        let relay = Url::parse("http://127.0.0.1:7546/").unwrap();
        let config = resolve_config(None, None, None, Some(relay.clone()));
        assert_eq!(config.relay_url().unwrap(), relay);
    }

    #[test]
    fn test_resolve_config_falls_back_to_default() {
        let config = resolve_config(Some(PathBuf::from("/nonexistent")), None, None, None);
        assert_eq!(config.cdn_base_url.as_str(), DEFAULT_CDN_BASE_URL);
        assert_eq!(config.upload_url.port(), Some(3000));
        assert_eq!(config.relay_url().unwrap().as_str(), "https://testnet.hashio.io/api");
    }
}

#[derive(Debug, Clone)]
pub struct OpContext {
    /// Blob store client built from the resolved config
    pub store: CdnClient,
    /// Relay client for the escrow contract
    pub rpc: JsonRpcClient,
    /// Resolved configuration
    pub config: AppConfig,
    /// Optional custom config path (defaults to ~/.payunlock)
    pub config_path: Option<PathBuf>,
}

impl OpContext {
    pub fn new(config: AppConfig, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let rpc = JsonRpcClient::new(
            &config.relay_url()?,
            Duration::from_secs(config.request_timeout_secs),
        )?;
        Ok(Self {
            store: CdnClient::from_config(&config)?,
            rpc,
            config,
            config_path,
        })
    }

    pub fn state(&self) -> Result<AppState, StateError> {
        AppState::load(self.config_path.clone())
    }

    /// The escrow contract on the configured network, read only
    pub fn escrow(&self) -> Result<RpcEscrow, RpcError> {
        RpcEscrow::new(self.rpc.clone(), &self.config.network.config())
    }

    /// The escrow contract, transacting as `wallet`
    pub fn escrow_as(&self, wallet: &LocalWallet) -> Result<RpcEscrow, ChainError> {
        Ok(self.escrow()?.with_wallet(wallet)?)
    }
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Output;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::cli::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::cli::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::cli::op::Op for Command {
            type Output = OpOutput;
            type Error = OpError;

            async fn execute(&self, ctx: &$crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(OpOutput::$variant)
                                .map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        OpOutput::$variant(output) => write!(f, "{}", output),
                    )*
                }
            }
        }
    };
}
