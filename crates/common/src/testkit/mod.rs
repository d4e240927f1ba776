/// In-process stand-ins for the escrow contract and the blob store
///
/// `MemoryEscrow` is one shared chain. Every party connects to it as their own
/// account and gets a handle implementing [`EscrowContract`]; the chain checks
/// status transitions and caller identity the way the deployed contract does,
/// so lifecycle code can be exercised end to end without a network.
///
/// # Example
///
/// ```rust,ignore
/// use common::testkit::{MemoryBlobStore, MemoryEscrow};
///
/// let chain = MemoryEscrow::new();
/// let seller_escrow = chain.connect("0xseller");
/// let buyer_escrow = chain.connect("0xbuyer");
/// let store = MemoryBlobStore::new();
/// ```
mod blob_store;
mod escrow;

pub use blob_store::MemoryBlobStore;
pub use escrow::{EscrowHandle, MemoryEscrow, DEFAULT_CONFIRM_WINDOW, DEFAULT_SEND_CODE_WINDOW};
