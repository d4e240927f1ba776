use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::listing::ProductRecord;
use crate::seed::Seed;

/// Hash of a mined transaction
pub type TxHash = String;

#[derive(Debug, thiserror::Error)]
pub enum EscrowError {
    /// The transaction reverted; the reason is surfaced verbatim
    #[error("transaction reverted: {0}")]
    Rejected(String),
    #[error("product {0} does not exist")]
    UnknownProduct(u64),
    /// The record exists but cannot be read into a [`ProductRecord`]
    #[error("product {id} has an unreadable record: {reason}")]
    InvalidRecord { id: u64, reason: String },
    /// The relay or the chain could not be reached
    #[error("network error: {0}")]
    Network(String),
}

impl From<EscrowError> for ProtocolError {
    fn from(err: EscrowError) -> Self {
        match err {
            EscrowError::Network(msg) => ProtocolError::NetworkFailure(msg),
            EscrowError::Rejected(msg) => ProtocolError::ContractRejected(msg),
            EscrowError::UnknownProduct(_) | EscrowError::InvalidRecord { .. } => {
                ProtocolError::ContractRejected(err.to_string())
            }
        }
    }
}

/// Outcome of `createProduct`, the id comes from the `ProductCreated` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub id: u64,
    pub tx_hash: TxHash,
}

/// The escrow contract, connected as one account
///
/// The contract is the single source of truth for a product's status and for
/// who may call what. Implementations submit transactions as the connected
/// account and return once they are mined. All key arguments are the
/// `0x`-prefixed hex the contract stores.
#[async_trait]
pub trait EscrowContract: Send + Sync + fmt::Debug {
    /// Account transactions are submitted from
    fn account(&self) -> String;

    async fn product(&self, id: u64) -> Result<ProductRecord, EscrowError>;

    /// Number of products created so far; ids are `0..next_id`
    async fn next_id(&self) -> Result<u64, EscrowError>;

    /// `DEFAULT_SEND_CODE_WINDOW` in seconds
    async fn default_send_code_window(&self) -> Result<u64, EscrowError>;

    /// `DEFAULT_CONFIRM_WINDOW` in seconds
    async fn default_confirm_window(&self) -> Result<u64, EscrowError>;

    /// List a product
    ///
    /// # Arguments
    /// * `file_id` - The listing seed
    /// * `price` - Price in the currency's base units
    /// * `currency` - ERC-20 address, or the zero address for HBAR
    /// * `seller_pub_key` - Seller's derived public key
    async fn create_product(
        &self,
        file_id: &Seed,
        price: u128,
        currency: &str,
        seller_pub_key: &str,
    ) -> Result<ProductCreated, EscrowError>;

    /// Pay in HBAR, recording the buyer's derived public key
    async fn buy_with_hbar(
        &self,
        id: u64,
        expected_price: u128,
        buyer_pub_key: &str,
    ) -> Result<TxHash, EscrowError>;

    /// Pay in the product's ERC-20 currency
    async fn buy_with_erc20(
        &self,
        id: u64,
        expected_price: u128,
        buyer_pub_key: &str,
    ) -> Result<TxHash, EscrowError>;

    /// Seller delivers the content key wrapped for the buyer
    async fn send_code(&self, id: u64, encrypted_sym_key: &str) -> Result<TxHash, EscrowError>;

    /// Buyer acknowledges receipt
    async fn confirm_completed(&self, id: u64) -> Result<TxHash, EscrowError>;

    async fn refund_buyer(&self, id: u64) -> Result<TxHash, EscrowError>;

    async fn withdraw_seller(&self, id: u64) -> Result<TxHash, EscrowError>;

    /// Seller collects once the buyer let the confirm window lapse
    async fn withdraw_seller_after_confirm_timeout(&self, id: u64)
        -> Result<TxHash, EscrowError>;
}
