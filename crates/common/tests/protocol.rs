//! Integration tests for the envelope procedures driven by real wallet signatures

use common::crypto::{ContentKey, EncryptedPayload, SecretKey, WrappedKey};
use common::envelope::{build_envelope, derive_key_pair, open_envelope, rewrap_key};
use common::error::{OpenStage, ProtocolError};
use common::seed::Seed;
use common::signer::{Ed25519Signer, EvmSigner, WalletSigner};

async fn sign(wallet: &impl WalletSigner, seed: &str) -> Vec<u8> {
    wallet
        .sign(&Seed::new(seed).unwrap().sign_message())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_lifecycle_scenario() {
    let seller_wallet = Ed25519Signer::new([1u8; 32], "0.0.1001");
    let buyer_wallet = EvmSigner::new([2u8; 32]).unwrap();

    // seller lists
    let seller_sig = sign(&seller_wallet, "abc123").await;
    let seller = derive_key_pair(&seller_sig).unwrap();
    let envelope = build_envelope("LICENSE-XYZ", &seller.public).unwrap();

    // buyer pays with their own derived key
    let buyer_sig = sign(&buyer_wallet, "abc123").await;
    let buyer = derive_key_pair(&buyer_sig).unwrap();
    assert_ne!(seller.public, buyer.public);

    // seller reproduces their key from a fresh prompt and hands off
    let seller_again = derive_key_pair(&sign(&seller_wallet, "abc123").await).unwrap();
    assert_eq!(seller_again, seller);
    let for_buyer = rewrap_key(&envelope.wrapped_key, &seller_again.secret, &buyer.public).unwrap();

    // buyer reproduces their key and decrypts the untouched payload
    let plaintext = open_envelope(
        &sign(&buyer_wallet, "abc123").await,
        &for_buyer,
        &envelope.encrypted_payload,
    )
    .unwrap();
    assert_eq!(plaintext, "LICENSE-XYZ");
}

#[tokio::test]
async fn test_wrong_seed_signature_is_rejected() {
    let seller_wallet = Ed25519Signer::new([1u8; 32], "0.0.1001");
    let buyer_wallet = EvmSigner::new([2u8; 32]).unwrap();

    let seller = derive_key_pair(&sign(&seller_wallet, "abc123").await).unwrap();
    let buyer = derive_key_pair(&sign(&buyer_wallet, "abc123").await).unwrap();
    let envelope = build_envelope("LICENSE-XYZ", &seller.public).unwrap();
    let for_buyer = rewrap_key(&envelope.wrapped_key, &seller.secret, &buyer.public).unwrap();

    let wrong_sig = sign(&buyer_wallet, "abc124").await;
    let wrong = derive_key_pair(&wrong_sig).unwrap();
    assert_ne!(wrong, buyer);

    let err = open_envelope(&wrong_sig, &for_buyer, &envelope.encrypted_payload).unwrap_err();
    assert_eq!(err.stage(), Some(OpenStage::Unwrap));
    assert_eq!(err.kind(), "unwrap_failure");
}

#[tokio::test]
async fn test_derivation_is_deterministic_per_wallet_and_seed() {
    let wallet = EvmSigner::new([7u8; 32]).unwrap();
    let a = derive_key_pair(&sign(&wallet, "j960qFveTyWSxpEgutgmvg").await).unwrap();
    let b = derive_key_pair(&sign(&wallet, "j960qFveTyWSxpEgutgmvg").await).unwrap();
    assert_eq!(a.public.to_bytes(), b.public.to_bytes());
    assert_eq!(a.secret.to_bytes(), b.secret.to_bytes());

    let other_seed = derive_key_pair(&sign(&wallet, "other").await).unwrap();
    assert_ne!(a.public, other_seed.public);
}

#[test]
fn test_rewrap_chain_preserves_content_key() {
    let key = ContentKey::generate();
    let parties: Vec<SecretKey> = (0..4).map(|_| SecretKey::generate()).collect();

    let mut wrapped = WrappedKey::wrap(&key, &parties[0].public()).unwrap();
    for pair in parties.windows(2) {
        wrapped = rewrap_key(&wrapped, &pair[0], &pair[1].public()).unwrap();
    }
    let last = parties.last().unwrap();
    assert_eq!(wrapped.unwrap(last).unwrap(), key);
    // earlier holders are locked out once it moved on
    assert!(matches!(
        rewrap_key(&wrapped, &parties[0], &parties[0].public()),
        Err(ProtocolError::UnwrapFailure)
    ));
}

#[test]
fn test_wrong_key_never_yields_a_key() {
    let key = ContentKey::generate();
    let owner = SecretKey::generate();
    let wrapped = WrappedKey::wrap(&key, &owner.public()).unwrap();
    for _ in 0..32 {
        let intruder = SecretKey::generate();
        let err: ProtocolError = wrapped.unwrap(&intruder).unwrap_err().into();
        assert!(matches!(err, ProtocolError::UnwrapFailure));
    }
}

#[test]
fn test_tampered_wrapped_key_detected() {
    let owner = SecretKey::generate();
    let wrapped = WrappedKey::wrap(&ContentKey::generate(), &owner.public()).unwrap();
    // flip a byte in the sealed key and in the tag
    for index in [wrapped.bytes().len() - 1, 65 + 16] {
        let mut bytes = wrapped.bytes().to_vec();
        bytes[index] ^= 0x80;
        let tampered = WrappedKey::try_from(bytes.as_slice()).unwrap();
        assert!(tampered.unwrap(&owner).is_err());
    }
    // a truncated key is malformed, not an authorization failure
    let truncated = &wrapped.bytes()[..100];
    let err: ProtocolError = WrappedKey::try_from(truncated).unwrap_err().into();
    assert_eq!(err.kind(), "decryption_failure");
}

#[test]
fn test_open_known_envelope() {
    // wrapped for the key derived from a signature of 64 bytes of 0x07,
    // sealed and encrypted outside this crate
    let wrapped = WrappedKey::from_hex(
        "0x04bb50e2d89a4ed70663d080659fe0ad4b9bc3e06c17a227433966cb59ceee020decddbf6e00192011648d13b1c00af770c0c1bb609d4d3a5c98a43772e0e18ef4a0a1a2a3a4a5a6a7a8a9aaabacadaeafd62606393344025b0192b807a2d2b100a25c440e9ab964994ef4c8e31f85d64b9e78c6bcddee26f36396412325aec04a",
    )
    .unwrap();
    let payload: EncryptedPayload = "AAECAwQFBgcICQoL:C0uVXou2hzbVGM2mg9lKWQSdtA4rh74O/FqJ3bHWRiY="
        .parse()
        .unwrap();

    assert_eq!(
        open_envelope(&[7u8; 64], &wrapped, &payload).unwrap(),
        "LICENSE-XYZ-2024"
    );

    let err = open_envelope(&[8u8; 64], &wrapped, &payload).unwrap_err();
    assert_eq!(err.stage(), Some(OpenStage::Unwrap));
    assert_eq!(err.kind(), "unwrap_failure");
}
