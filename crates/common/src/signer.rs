//! Wallet signers
//!
//! The protocol never holds a long-lived private key of its own; it asks a
//! wallet to sign `SIGN_PREFIX + seed` and derives the listing key pair from
//! the answer. [`WalletSigner`] is that seam. Browser wallets live on the
//! other side of it in production; the local signers here back the CLI and
//! tests.

use std::fmt;

use async_trait::async_trait;
use ed25519_dalek::Signer as _;
use sha3::{Digest, Keccak256};

use crate::crypto::SignatureScheme;
use crate::error::ProtocolError;

const ED25519_PEM_TAG: &str = "ED25519 PRIVATE KEY";
const SECP256K1_PEM_TAG: &str = "SECP256K1 PRIVATE KEY";
const WALLET_KEY_SIZE: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    /// The user dismissed or abandoned the prompt
    #[error("signature request rejected: {0}")]
    Rejected(String),
    #[error("wallet unavailable: {0}")]
    Unavailable(String),
    #[error("invalid wallet key: {0}")]
    InvalidKey(String),
}

impl From<SignerError> for ProtocolError {
    fn from(err: SignerError) -> Self {
        ProtocolError::SignerFailure(err.to_string())
    }
}

#[async_trait]
pub trait WalletSigner: Send + Sync + fmt::Debug {
    /// Sign an arbitrary message
    ///
    /// # Returns
    /// * `Ok(Vec<u8>)` - The raw bytes the wallet produced: 64 for native
    ///   signers, 65 (`r || s || v`) for EVM personal-sign
    /// * `Err(SignerError)` - The prompt was cancelled or the wallet failed;
    ///   nothing is retained either way
    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignerError>;

    /// Account the wallet signs for; this is what the escrow contract sees as caller
    fn address(&self) -> String;

    fn scheme(&self) -> SignatureScheme;
}

/// A Hedera native account key
pub struct Ed25519Signer {
    key: ed25519_dalek::SigningKey,
    account_id: String,
}

impl fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}

impl Ed25519Signer {
    pub fn new(key: [u8; WALLET_KEY_SIZE], account_id: impl Into<String>) -> Self {
        Self {
            key: ed25519_dalek::SigningKey::from_bytes(&key),
            account_id: account_id.into(),
        }
    }

    /// Fresh random key; the account id defaults to the hex public key
    pub fn generate() -> Self {
        let key = random_key();
        let signer = Self::new(key, String::new());
        let account_id = format!("0x{}", hex::encode(signer.key.verifying_key().as_bytes()));
        Self {
            account_id,
            ..signer
        }
    }

    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = account_id.into();
        self
    }

    pub fn verifying_key(&self) -> ed25519_dalek::VerifyingKey {
        self.key.verifying_key()
    }

    pub fn to_pem(&self) -> String {
        pem::encode(&pem::Pem::new(ED25519_PEM_TAG, self.key.to_bytes().to_vec()))
    }
}

#[async_trait]
impl WalletSigner for Ed25519Signer {
    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignerError> {
        Ok(self.key.sign(message).to_bytes().to_vec())
    }

    fn address(&self) -> String {
        self.account_id.clone()
    }

    fn scheme(&self) -> SignatureScheme {
        SignatureScheme::Native
    }
}

/// An EVM account key answering `personal_sign`
pub struct EvmSigner {
    key: k256::ecdsa::SigningKey,
}

impl fmt::Debug for EvmSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvmSigner")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

impl EvmSigner {
    pub fn new(key: [u8; WALLET_KEY_SIZE]) -> Result<Self, SignerError> {
        let key = k256::ecdsa::SigningKey::from_slice(&key)
            .map_err(|_| SignerError::InvalidKey("scalar out of range".into()))?;
        Ok(Self { key })
    }

    pub fn generate() -> Self {
        loop {
            if let Ok(signer) = Self::new(random_key()) {
                return signer;
            }
        }
    }

    pub fn to_pem(&self) -> String {
        pem::encode(&pem::Pem::new(SECP256K1_PEM_TAG, self.key.to_bytes().to_vec()))
    }

    /// Raw account key, for signing transactions from the same account
    pub fn to_bytes(&self) -> [u8; WALLET_KEY_SIZE] {
        self.key.to_bytes().into()
    }
}

/// EIP-191 digest: `keccak256("\x19Ethereum Signed Message:\n" || len || message)`
pub fn personal_sign_digest(message: &[u8]) -> [u8; 32] {
    Keccak256::new()
        .chain_update(format!("\x19Ethereum Signed Message:\n{}", message.len()))
        .chain_update(message)
        .finalize()
        .into()
}

#[async_trait]
impl WalletSigner for EvmSigner {
    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignerError> {
        let digest = personal_sign_digest(message);
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(&digest)
            .map_err(|e| SignerError::Unavailable(e.to_string()))?;
        let mut out = signature.to_bytes().to_vec();
        out.push(recovery_id.to_byte() + 27);
        Ok(out)
    }

    fn address(&self) -> String {
        let point = self.key.verifying_key().to_encoded_point(false);
        let hash = Keccak256::digest(&point.as_bytes()[1..]);
        format!("0x{}", hex::encode(&hash[12..]))
    }

    fn scheme(&self) -> SignatureScheme {
        SignatureScheme::EvmPersonalSign
    }
}

/// A signer whose key is held in a local PEM file
#[derive(Debug)]
pub enum LocalWallet {
    Native(Ed25519Signer),
    Evm(EvmSigner),
}

impl LocalWallet {
    pub fn generate(scheme: SignatureScheme) -> Self {
        match scheme {
            SignatureScheme::Native => LocalWallet::Native(Ed25519Signer::generate()),
            SignatureScheme::EvmPersonalSign => LocalWallet::Evm(EvmSigner::generate()),
        }
    }

    pub fn to_pem(&self) -> String {
        match self {
            LocalWallet::Native(signer) => signer.to_pem(),
            LocalWallet::Evm(signer) => signer.to_pem(),
        }
    }

    /// The EVM account key, if this wallet has one
    pub fn as_evm(&self) -> Option<&EvmSigner> {
        match self {
            LocalWallet::Native(_) => None,
            LocalWallet::Evm(signer) => Some(signer),
        }
    }

    /// Load a wallet key, picking the scheme from the PEM tag
    pub fn from_pem(pem_str: &str) -> Result<Self, SignerError> {
        let pem = pem::parse(pem_str)
            .map_err(|e| SignerError::InvalidKey(format!("failed to parse PEM: {}", e)))?;

        let contents = pem.contents();
        if contents.len() != WALLET_KEY_SIZE {
            return Err(SignerError::InvalidKey(format!(
                "invalid key size in PEM, expected {}, got {}",
                WALLET_KEY_SIZE,
                contents.len()
            )));
        }
        let mut key = [0u8; WALLET_KEY_SIZE];
        key.copy_from_slice(contents);

        match pem.tag() {
            ED25519_PEM_TAG => {
                let signer = Ed25519Signer::new(key, String::new());
                let account_id =
                    format!("0x{}", hex::encode(signer.verifying_key().as_bytes()));
                Ok(LocalWallet::Native(signer.with_account_id(account_id)))
            }
            SECP256K1_PEM_TAG => Ok(LocalWallet::Evm(EvmSigner::new(key)?)),
            other => Err(SignerError::InvalidKey(format!(
                "invalid PEM tag {:?}, expected {} or {}",
                other, ED25519_PEM_TAG, SECP256K1_PEM_TAG
            ))),
        }
    }
}

#[async_trait]
impl WalletSigner for LocalWallet {
    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignerError> {
        match self {
            LocalWallet::Native(signer) => signer.sign(message).await,
            LocalWallet::Evm(signer) => signer.sign(message).await,
        }
    }

    fn address(&self) -> String {
        match self {
            LocalWallet::Native(signer) => signer.address(),
            LocalWallet::Evm(signer) => signer.address(),
        }
    }

    fn scheme(&self) -> SignatureScheme {
        match self {
            LocalWallet::Native(signer) => signer.scheme(),
            LocalWallet::Evm(signer) => signer.scheme(),
        }
    }
}

fn random_key() -> [u8; WALLET_KEY_SIZE] {
    let mut key = [0u8; WALLET_KEY_SIZE];
    getrandom::getrandom(&mut key).expect("failed to generate random bytes");
    key
}
