//! Hedera network endpoints and the deployed escrow contract

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Address of the escrow contract on both networks
pub const ESCROW_CONTRACT_ADDRESS: &str = "0x953aFC7f6d3201D7D76BB146542E144b31504Ac5";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Testnet,
    Mainnet,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Testnet => write!(f, "testnet"),
            Network::Mainnet => write!(f, "mainnet"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown network {0:?}, expected testnet or mainnet")]
pub struct UnknownNetwork(String);

impl FromStr for Network {
    type Err = UnknownNetwork;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "testnet" => Ok(Network::Testnet),
            "mainnet" => Ok(Network::Mainnet),
            _ => Err(UnknownNetwork(s.to_string())),
        }
    }
}

/// A currency a listing can be priced in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Hedera token id, `0.0.0` for HBAR
    pub id: String,
    pub name: String,
    pub decimals: u32,
    pub symbol: String,
}

impl TokenConfig {
    pub fn hbar() -> Self {
        Self {
            id: "0.0.0".into(),
            name: "HBAR".into(),
            decimals: crate::listing::HBAR_DECIMALS,
            symbol: "HBAR".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub network: Network,
    /// EIP-155 chain id the relay signs transactions for
    pub chain_id: u64,
    /// JSON-RPC relay
    pub api_url: String,
    pub explorer_base_url: String,
    pub mirror_node_url: String,
    pub contract_address: String,
    pub supported_tokens: Vec<TokenConfig>,
}

impl Network {
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Mainnet => 295,
            Network::Testnet => 296,
        }
    }

    pub fn config(&self) -> NetworkConfig {
        let name = self.to_string();
        NetworkConfig {
            network: *self,
            chain_id: self.chain_id(),
            api_url: format!("https://{}.hashio.io/api", name),
            explorer_base_url: format!("https://hashscan.io/{}", name),
            mirror_node_url: format!("https://{}.mirrornode.hedera.com", name),
            contract_address: ESCROW_CONTRACT_ADDRESS.to_string(),
            supported_tokens: vec![TokenConfig::hbar()],
        }
    }
}

impl NetworkConfig {
    pub fn token(&self, id: &str) -> Option<&TokenConfig> {
        self.supported_tokens.iter().find(|t| t.id == id)
    }

    /// Explorer link for a transaction hash
    pub fn transaction_url(&self, tx_hash: &str) -> String {
        format!("{}/transaction/{}", self.explorer_base_url, tx_hash)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_network_endpoints() {
        let testnet = Network::Testnet.config();
        assert_eq!(testnet.api_url, "https://testnet.hashio.io/api");
        assert_eq!(testnet.mirror_node_url, "https://testnet.mirrornode.hedera.com");
        let mainnet = Network::Mainnet.config();
        assert_eq!(mainnet.explorer_base_url, "https://hashscan.io/mainnet");
        assert_eq!(mainnet.contract_address, ESCROW_CONTRACT_ADDRESS);
        assert_eq!(testnet.chain_id, 296);
        assert_eq!(mainnet.chain_id, 295);
    }

    #[test]
    fn test_parse_network() {
        assert_eq!("Mainnet".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!(Network::default(), Network::Testnet);
        assert!("devnet".parse::<Network>().is_err());
    }

    #[test]
    fn test_hbar_token() {
        let config = Network::Testnet.config();
        let hbar = config.token("0.0.0").unwrap();
        assert_eq!(hbar.decimals, 8);
        assert!(config.token("0.0.42").is_none());
    }
}
