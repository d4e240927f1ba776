use std::{fs, path::PathBuf};

use common::network::Network;
use common::signer::LocalWallet;
use common::crypto::SignatureScheme;
use serde::{Deserialize, Serialize};
use url::Url;

pub const APP_NAME: &str = "payunlock";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const WALLET_FILE_NAME: &str = "wallet.pem";

pub const DEFAULT_CDN_BASE_URL: &str = "https://algoosh.b-cdn.net/payunlock/";
pub const DEFAULT_UPLOAD_URL: &str = "http://localhost:3000/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Hedera network the escrow contract lives on
    #[serde(default)]
    pub network: Network,
    /// Where listing documents are read from (`{base}/{seed}.json`)
    #[serde(default = "default_cdn_base_url")]
    pub cdn_base_url: Url,
    /// Companion upload service that writes listing documents
    #[serde(default = "default_upload_url")]
    pub upload_url: Url,
    /// Timeout for blob store requests, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// JSON-RPC relay to use instead of the network's default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<Url>,
}

fn default_cdn_base_url() -> Url {
    Url::parse(DEFAULT_CDN_BASE_URL).expect("hardcoded URL must parse")
}

fn default_upload_url() -> Url {
    Url::parse(DEFAULT_UPLOAD_URL).expect("hardcoded URL must parse")
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            cdn_base_url: default_cdn_base_url(),
            upload_url: default_upload_url(),
            request_timeout_secs: default_request_timeout_secs(),
            rpc_url: None,
        }
    }
}

impl AppConfig {
    /// The relay escrow calls go through
    pub fn relay_url(&self) -> Result<Url, url::ParseError> {
        match &self.rpc_url {
            Some(url) => Ok(url.clone()),
            None => Url::parse(&self.network.config().api_url),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the payunlock directory (~/.payunlock)
    pub payunlock_dir: PathBuf,
    /// Path to the local wallet PEM file
    pub wallet_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the payunlock directory path (custom or default ~/.payunlock)
    pub fn payunlock_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new state directory with a fresh local wallet
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
        scheme: SignatureScheme,
    ) -> Result<Self, StateError> {
        let payunlock_dir = Self::payunlock_dir(custom_path)?;

        if payunlock_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&payunlock_dir)?;

        // Generate and save the wallet key
        let wallet = LocalWallet::generate(scheme);
        let wallet_path = payunlock_dir.join(WALLET_FILE_NAME);
        fs::write(&wallet_path, wallet.to_pem())?;

        let config = config.unwrap_or_default();
        let config_path = payunlock_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        Ok(Self {
            payunlock_dir,
            wallet_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the payunlock directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let payunlock_dir = Self::payunlock_dir(custom_path)?;

        if !payunlock_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let wallet_path = payunlock_dir.join(WALLET_FILE_NAME);
        let config_path = payunlock_dir.join(CONFIG_FILE_NAME);

        if !wallet_path.exists() {
            return Err(StateError::MissingFile(WALLET_FILE_NAME.to_string()));
        }
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            payunlock_dir,
            wallet_path,
            config_path,
            config,
        })
    }

    /// Load the local wallet from the wallet file
    pub fn load_wallet(&self) -> Result<LocalWallet, StateError> {
        let pem = fs::read_to_string(&self.wallet_path)?;
        LocalWallet::from_pem(&pem).map_err(|e| StateError::InvalidKey(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("payunlock directory not initialized. Run 'payunlock init' first")]
    NotInitialized,

    #[error("payunlock directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
