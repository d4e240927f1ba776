//! Shared test utilities for lifecycle integration tests
#![allow(dead_code)]

use common::lifecycle::{Buyer, ListingDraft, Seller};
use common::listing::ZERO_ADDRESS;
use common::signer::{Ed25519Signer, EvmSigner, WalletSigner};
use common::testkit::{EscrowHandle, MemoryBlobStore, MemoryEscrow};

pub const SELLER_ACCOUNT: &str = "0.0.1001";
pub const SELLER_KEY: [u8; 32] = [0x11; 32];
pub const BUYER_KEY: [u8; 32] = [0x22; 32];

pub type TestSeller = Seller<Ed25519Signer, EscrowHandle, MemoryBlobStore>;
pub type TestBuyer = Buyer<EvmSigner, EscrowHandle, MemoryBlobStore>;

/// One chain and one blob store shared by every party
pub struct Market {
    pub chain: MemoryEscrow,
    pub store: MemoryBlobStore,
}

impl Market {
    pub fn new() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("common=debug")
            .with_test_writer()
            .try_init();
        Self {
            chain: MemoryEscrow::new(),
            store: MemoryBlobStore::new(),
        }
    }

    /// The seller, on a native Hedera wallet
    pub fn seller(&self) -> TestSeller {
        Seller::new(
            Ed25519Signer::new(SELLER_KEY, SELLER_ACCOUNT),
            self.chain.connect(SELLER_ACCOUNT),
            self.store.clone(),
        )
    }

    /// The buyer, on an EVM wallet
    pub fn buyer(&self) -> TestBuyer {
        self.buyer_with_key(BUYER_KEY)
    }

    pub fn buyer_with_key(&self, key: [u8; 32]) -> TestBuyer {
        let wallet = EvmSigner::new(key).unwrap();
        let account = wallet.address();
        Buyer::new(wallet, self.chain.connect(account), self.store.clone())
    }
}

pub fn draft(payload: &str) -> ListingDraft {
    ListingDraft {
        name: "Game key".to_string(),
        description: "Activation key, region free".to_string(),
        token_id: "0.0.0".to_string(),
        currency: ZERO_ADDRESS.to_string(),
        price: "12.5".to_string(),
        payload: payload.to_string(),
    }
}
