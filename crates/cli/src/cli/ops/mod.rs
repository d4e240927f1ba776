pub mod health;
pub mod init;
pub mod keygen;
pub mod listing;
pub mod open;
pub mod order;
pub mod rewrap;
pub mod seal;
pub mod seed;
pub mod sign;
pub mod version;

pub use health::Health;
pub use init::Init;
pub use keygen::Keygen;
pub use listing::Listing;
pub use open::Open;
pub use order::Order;
pub use rewrap::Rewrap;
pub use seal::Seal;
pub use seed::Mint;
pub use sign::Sign;
pub use version::Version;

use common::crypto::{KeyError, PublicKey, WrappedKey, WrappedKeyError};
use common::error::ProtocolError;
use common::escrow::EscrowError;
use common::seed::Seed;
use common::signer::{SignerError, WalletSigner};
use payunlock_cli::rpc::RpcError;
use payunlock_cli::state::StateError;

use crate::cli::op::OpContext;

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("{0}")]
    State(#[from] StateError),
    #[error("wallet error: {0}")]
    Signer(#[from] SignerError),
}

/// Failures of commands that talk to the escrow contract
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("{0}")]
    Wallet(#[from] WalletError),
    #[error("{0}")]
    State(#[from] StateError),
    #[error("relay error: {0}")]
    Rpc(#[from] RpcError),
    #[error("{0}")]
    Escrow(#[from] EscrowError),
    #[error("{0}")]
    Protocol(#[from] ProtocolError),
}

/// Ask the local wallet to sign `SIGN_PREFIX + seed`, returning the raw signature
pub async fn sign_seed(ctx: &OpContext, seed: &Seed) -> Result<Vec<u8>, WalletError> {
    let wallet = ctx.state()?.load_wallet()?;
    tracing::debug!("signing seed {} with {} wallet", seed, wallet.scheme());
    Ok(wallet.sign(&seed.sign_message()).await?)
}

/// Public keys come as `0x` hex from the contract or base64 from documents
pub fn parse_public_key(text: &str) -> Result<PublicKey, KeyError> {
    let text = text.trim();
    if text.starts_with("0x") {
        return PublicKey::from_hex(text);
    }
    PublicKey::from_base64(text).or_else(|_| PublicKey::from_hex(text))
}

/// Wrapped keys come as `0x` hex from the contract or base64 from documents
pub fn parse_wrapped_key(text: &str) -> Result<WrappedKey, WrappedKeyError> {
    let text = text.trim();
    if text.starts_with("0x") {
        return WrappedKey::from_hex(text);
    }
    WrappedKey::from_base64(text)
}
