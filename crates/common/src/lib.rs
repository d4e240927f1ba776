/**
 * Collaborator trait for the flat store of
 *  per-seed listing documents.
 */
pub mod blob_store;
/**
 * Cryptographic types and operations.
 *  - Wallet signature normalisation
 *  - Seed-derived secp256k1 key pairs
 *  - Payload encryption and key wrapping
 */
pub mod crypto;
/**
 * The three envelope procedures: build,
 *  re-wrap and open.
 */
pub mod envelope;
pub mod error;
/**
 * Collaborator trait for the on-chain
 *  escrow contract.
 */
pub mod escrow;
/**
 * Seller and buyer flows that tie wallet,
 *  contract, blob store and envelopes together.
 */
pub mod lifecycle;
pub mod listing;
pub mod network;
pub mod seed;
pub mod signer;
/**
 * In-memory escrow and blob store for
 *  exercising the lifecycle without a chain.
 */
pub mod testkit;

/// Version of the protocol library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use crate::blob_store::{BlobStore, BlobStoreError};
    pub use crate::crypto::{
        ContentKey, EncryptedPayload, KeyPair, PublicKey, SecretKey, SeedSignature,
        SignatureScheme, WrappedKey,
    };
    pub use crate::envelope::{build_envelope, derive_key_pair, open_envelope, rewrap_key, Envelope};
    pub use crate::error::{OpenStage, ProtocolError};
    pub use crate::escrow::{EscrowContract, EscrowError, ProductCreated, TxHash};
    pub use crate::lifecycle::{
        load_products, Buyer, Confirmation, CreatedListing, ListingDraft, ProductSummary, Seller,
    };
    pub use crate::listing::{ListingDocument, ProductRecord, ProductStatus, ZERO_ADDRESS};
    pub use crate::network::{Network, NetworkConfig, TokenConfig};
    pub use crate::seed::{Seed, SIGN_PREFIX};
    pub use crate::signer::{Ed25519Signer, EvmSigner, LocalWallet, SignerError, WalletSigner};
}
