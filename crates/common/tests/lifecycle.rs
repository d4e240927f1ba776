//! Integration tests for the seller/buyer lifecycle against the in-memory chain

mod common;

use ::common::blob_store::BlobStore;
use ::common::error::{OpenStage, ProtocolError};
use ::common::escrow::EscrowContract;
use ::common::lifecycle::load_products;
use ::common::listing::ProductStatus;
use ::common::seed::Seed;
use ::common::testkit::{DEFAULT_CONFIRM_WINDOW, DEFAULT_SEND_CODE_WINDOW};

#[tokio::test]
async fn test_full_lifecycle() {
    let market = common::Market::new();
    let seller = market.seller();
    let buyer = market.buyer();

    let listing = seller
        .create_listing_with_seed(Seed::new("abc123").unwrap(), common::draft("LICENSE-XYZ"))
        .await
        .unwrap();
    assert_eq!(listing.seed.as_str(), "abc123");
    assert_eq!(listing.document.seller, common::SELLER_ACCOUNT);

    let escrow = market.chain.connect("0.0.observer");
    let record = escrow.product(listing.id).await.unwrap();
    assert_eq!(record.status, ProductStatus::Initial);
    assert_eq!(record.price, 1_250_000_000);
    assert_eq!(record.formatted_price(), "12.5");

    buyer.purchase(listing.id).await.unwrap();
    seller.deliver(listing.id).await.unwrap();

    // viewing before confirming leaves the chain untouched
    assert_eq!(buyer.reveal(listing.id).await.unwrap(), "LICENSE-XYZ");
    assert_eq!(
        escrow.product(listing.id).await.unwrap().status,
        ProductStatus::CodeSent
    );

    let confirmation = buyer.confirm(listing.id).await.unwrap();
    assert_eq!(confirmation.plaintext, "LICENSE-XYZ");
    seller.withdraw(listing.id).await.unwrap();

    let record = escrow.product(listing.id).await.unwrap();
    assert_eq!(record.status, ProductStatus::CompletedPaidOut);
    // the payload stored at creation is the one that was decrypted
    let document = market.store.fetch(&listing.seed).await.unwrap();
    assert_eq!(document.encrypted_payload, listing.document.encrypted_payload);
}

#[tokio::test]
async fn test_seller_can_read_own_listing() {
    let market = common::Market::new();
    let seller = market.seller();
    let listing = seller
        .create_listing(common::draft("https://example.com/dl?t=1"))
        .await
        .unwrap();
    assert_eq!(
        seller.reveal(listing.id).await.unwrap(),
        "https://example.com/dl?t=1"
    );
}

#[tokio::test]
async fn test_steps_refused_out_of_order() {
    let market = common::Market::new();
    let seller = market.seller();
    let buyer = market.buyer();
    let listing = seller.create_listing(common::draft("secret")).await.unwrap();

    let err = seller.deliver(listing.id).await.unwrap_err();
    assert_eq!(err.kind(), "contract_rejected");
    let err = buyer.confirm(listing.id).await.unwrap_err();
    assert_eq!(err.kind(), "contract_rejected");

    buyer.purchase(listing.id).await.unwrap();
    assert_eq!(
        buyer.purchase(listing.id).await.unwrap_err().kind(),
        "contract_rejected"
    );

    seller.deliver(listing.id).await.unwrap();
    // the status gate allows exactly one delivery
    assert_eq!(
        seller.deliver(listing.id).await.unwrap_err().kind(),
        "contract_rejected"
    );
}

#[tokio::test]
async fn test_wrong_wallet_cannot_deliver() {
    let market = common::Market::new();
    let seller = market.seller();
    let listing = seller.create_listing(common::draft("secret")).await.unwrap();
    market.buyer().purchase(listing.id).await.unwrap();

    // a different wallet bound to the seller account derives a different key
    let impostor = ::common::lifecycle::Seller::new(
        ::common::signer::Ed25519Signer::new([0x99; 32], common::SELLER_ACCOUNT),
        market.chain.connect(common::SELLER_ACCOUNT),
        market.store.clone(),
    );
    let err = impostor.deliver(listing.id).await.unwrap_err();
    assert!(matches!(err, ProtocolError::UnwrapFailure));
}

#[tokio::test]
async fn test_other_buyer_cannot_open_delivery() {
    let market = common::Market::new();
    let seller = market.seller();
    let buyer = market.buyer();
    let listing = seller.create_listing(common::draft("secret")).await.unwrap();
    buyer.purchase(listing.id).await.unwrap();
    seller.deliver(listing.id).await.unwrap();

    let stranger = market.buyer_with_key([0x33; 32]);
    let err = stranger.reveal(listing.id).await.unwrap_err();
    assert_eq!(err.stage(), Some(OpenStage::Unwrap));
    assert!(matches!(
        err,
        ProtocolError::Open { ref source, .. } if matches!(**source, ProtocolError::UnwrapFailure)
    ));
    // confirmation is the buyer's alone, and fails before any transaction
    assert!(stranger.confirm(listing.id).await.is_err());
    assert_eq!(
        market
            .chain
            .connect("0.0.observer")
            .product(listing.id)
            .await
            .unwrap()
            .status,
        ProductStatus::CodeSent
    );
}

#[tokio::test]
async fn test_blob_store_outage_is_retryable() {
    let market = common::Market::new();
    let seller = market.seller();
    let buyer = market.buyer();
    let listing = seller.create_listing(common::draft("secret")).await.unwrap();
    buyer.purchase(listing.id).await.unwrap();

    market.store.set_offline(true);
    let err = seller.deliver(listing.id).await.unwrap_err();
    assert_eq!(err.kind(), "network_failure");
    assert!(err.is_retryable());

    market.store.set_offline(false);
    seller.deliver(listing.id).await.unwrap();
    assert_eq!(buyer.reveal(listing.id).await.unwrap(), "secret");
}

#[tokio::test]
async fn test_refund_and_timeout_paths() {
    let market = common::Market::new();
    let seller = market.seller();
    let buyer = market.buyer();

    let refunded = seller.create_listing(common::draft("a")).await.unwrap();
    buyer.purchase(refunded.id).await.unwrap();
    assert!(buyer.refund(refunded.id).await.is_err());
    market.chain.advance(DEFAULT_SEND_CODE_WINDOW + 1);
    buyer.refund(refunded.id).await.unwrap();

    let lapsed = seller.create_listing(common::draft("b")).await.unwrap();
    buyer.purchase(lapsed.id).await.unwrap();
    seller.deliver(lapsed.id).await.unwrap();
    assert!(seller.withdraw(lapsed.id).await.is_err());
    market.chain.advance(DEFAULT_CONFIRM_WINDOW + 1);
    seller.withdraw(lapsed.id).await.unwrap();
}

#[tokio::test]
async fn test_load_products_falls_back_without_document() {
    let market = common::Market::new();
    let seller = market.seller();
    seller.create_listing(common::draft("a")).await.unwrap();

    // a product registered by some other client that never published its document
    let orphan = Seed::new("orphan").unwrap();
    market
        .chain
        .connect("0.0.2002")
        .create_product(&orphan, 100_000_000, ::common::listing::ZERO_ADDRESS, "0x02aa")
        .await
        .unwrap();

    let products = load_products(&market.chain.connect("0.0.observer"), &market.store)
        .await
        .unwrap();
    assert_eq!(products.len(), 2);
    assert_eq!(products[0].name, "Game key");
    assert_eq!(products[0].price, "12.5");
    assert_eq!(products[1].name, "Product 1");
    assert_eq!(products[1].description, "Product with ID orphan");
    assert_eq!(products[1].price, "1");
}

#[tokio::test]
async fn test_zero_price_rejected_before_publishing() {
    let market = common::Market::new();
    let mut draft = common::draft("a");
    draft.price = "0".to_string();

    let err = market.seller().create_listing(draft).await.unwrap_err();
    assert_eq!(err.kind(), "contract_rejected");
    assert_eq!(market.store.len(), 0);
}

#[tokio::test]
async fn test_create_retry_reuses_published_document() {
    let market = common::Market::new();
    let seller = market.seller();
    let seed = Seed::new("retry-me").unwrap();

    // the document goes up, then the chain is unreachable
    market.chain.set_offline(true);
    let err = seller
        .create_listing_with_seed(seed.clone(), common::draft("LICENSE-XYZ"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "network_failure");
    assert!(err.is_retryable());
    assert_eq!(market.store.len(), 1);
    let first = market.store.fetch(&seed).await.unwrap();

    market.chain.set_offline(false);
    let listing = seller
        .create_listing_with_seed(seed.clone(), common::draft("LICENSE-XYZ"))
        .await
        .unwrap();
    assert_eq!(market.store.len(), 1);
    assert_eq!(listing.document, first);

    // the reused document still opens for a buyer
    let buyer = market.buyer();
    buyer.purchase(listing.id).await.unwrap();
    seller.deliver(listing.id).await.unwrap();
    assert_eq!(buyer.reveal(listing.id).await.unwrap(), "LICENSE-XYZ");
}

#[tokio::test]
async fn test_taken_seed_with_other_content_is_storage_rejected() {
    let market = common::Market::new();
    let seller = market.seller();
    let seed = Seed::new("taken").unwrap();
    seller
        .create_listing_with_seed(seed.clone(), common::draft("first"))
        .await
        .unwrap();

    let err = seller
        .create_listing_with_seed(seed.clone(), common::draft("second"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "storage_rejected");

    // another seller cannot claim the document either
    let intruder = ::common::lifecycle::Seller::new(
        ::common::signer::Ed25519Signer::new([0x33; 32], "0.0.3003"),
        market.chain.connect("0.0.3003"),
        market.store.clone(),
    );
    let err = intruder
        .create_listing_with_seed(seed, common::draft("first"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "storage_rejected");
    assert_eq!(market.store.len(), 1);
    assert_eq!(
        market
            .chain
            .connect("0.0.observer")
            .next_id()
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_load_products_skips_unreadable_record() {
    let market = common::Market::new();
    let seller = market.seller();
    seller.create_listing(common::draft("a")).await.unwrap();
    seller.create_listing(common::draft("b")).await.unwrap();
    market.chain.set_raw_file_id(0, "../other");

    let products = load_products(&market.chain.connect("0.0.observer"), &market.store)
        .await
        .unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].id, 1);

    market.chain.set_offline(true);
    let err = load_products(&market.chain.connect("0.0.observer"), &market.store)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "network_failure");
}
