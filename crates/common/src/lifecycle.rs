//! Product lifecycle as seen by each party
//!
//! Every step re-derives the acting party's key pair from a fresh wallet
//! signature, consults the on-chain record before touching any key material,
//! and only then runs the envelope procedure and submits its transaction. The
//! contract's status field is the gate that keeps a step from happening twice.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::blob_store::{BlobStore, BlobStoreError};
use crate::crypto::KeyPair;
use crate::envelope::{build_envelope, derive_key_pair, open_envelope, rewrap_key};
use crate::error::{OpenStage, ProtocolError};
use crate::escrow::{EscrowContract, EscrowError, TxHash};
use crate::listing::{
    decimals_for, format_units, is_hbar, parse_units, ListingDocument, ProductRecord,
    ProductStatus,
};
use crate::seed::Seed;
use crate::signer::WalletSigner;

/// What a seller fills in to list a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingDraft {
    pub name: String,
    pub description: String,
    /// Hedera token id of the currency, `0.0.0` for HBAR
    pub token_id: String,
    /// Currency address passed to the contract
    pub currency: String,
    /// Decimal price, e.g. `"12.5"`
    pub price: String,
    /// The secret being sold
    pub payload: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedListing {
    pub id: u64,
    pub seed: Seed,
    pub tx_hash: TxHash,
    pub document: ListingDocument,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub plaintext: String,
    pub tx_hash: TxHash,
}

/// One row of the storefront
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub price: String,
    pub seller: String,
    pub buyer: String,
    pub file_id: Seed,
    pub status: ProductStatus,
}

fn require_status(
    id: u64,
    record: &ProductRecord,
    allowed: &[ProductStatus],
    step: &str,
) -> Result<(), ProtocolError> {
    if allowed.contains(&record.status) {
        return Ok(());
    }
    Err(ProtocolError::ContractRejected(format!(
        "cannot {} product {} while it is {}",
        step, id, record.status
    )))
}

/// Ask the wallet for its signature over the seed and derive the listing key pair
async fn derive_for<W: WalletSigner>(wallet: &W, seed: &Seed) -> Result<KeyPair, ProtocolError> {
    let signature = wallet.sign(&seed.sign_message()).await?;
    derive_key_pair(&signature)
}

/// The selling side of the protocol
#[derive(Debug)]
pub struct Seller<W, E, B> {
    wallet: W,
    escrow: E,
    store: B,
}

impl<W, E, B> Seller<W, E, B>
where
    W: WalletSigner,
    E: EscrowContract,
    B: BlobStore,
{
    pub fn new(wallet: W, escrow: E, store: B) -> Self {
        Self {
            wallet,
            escrow,
            store,
        }
    }

    /// Encrypt the payload for ourselves, publish the listing document and
    /// register the product on chain
    ///
    /// The document goes up first so a product never exists on chain without
    /// one. If registering then fails, calling again with the same seed and
    /// draft reuses the published document instead of writing a second one.
    pub async fn create_listing(&self, draft: ListingDraft) -> Result<CreatedListing, ProtocolError> {
        self.create_listing_with_seed(Seed::generate(), draft).await
    }

    pub async fn create_listing_with_seed(
        &self,
        seed: Seed,
        draft: ListingDraft,
    ) -> Result<CreatedListing, ProtocolError> {
        let price = parse_units(&draft.price, decimals_for(&draft.currency))
            .map_err(|e| ProtocolError::ContractRejected(e.to_string()))?;
        if price == 0 {
            return Err(ProtocolError::ContractRejected("price must be positive".into()));
        }

        let signature = self.wallet.sign(&seed.sign_message()).await?;
        let pair = derive_key_pair(&signature)?;

        let document = match self.store.fetch(&seed).await {
            Ok(existing) => {
                self.check_reusable(&seed, &existing, &signature, &pair, &draft)?;
                tracing::info!("Reusing published listing document {}", seed.blob_path());
                existing
            }
            Err(BlobStoreError::NotFound(_)) => {
                let envelope = build_envelope(&draft.payload, &pair.public)?;
                tracing::debug!(
                    "Built envelope for {} (payload digest {})",
                    seed,
                    envelope.encrypted_payload.digest()
                );

                let document = ListingDocument {
                    name: draft.name,
                    description: draft.description,
                    token_id: draft.token_id,
                    price: draft.price,
                    encrypted_payload: envelope.encrypted_payload.to_string(),
                    encrypted_key: envelope.wrapped_key.to_base64(),
                    public_key: pair.public.to_base64(),
                    seller: self.wallet.address(),
                    created_at: Some(OffsetDateTime::now_utc()),
                };
                self.store.publish(&seed, &document).await?;
                tracing::info!("Published listing document {}", seed.blob_path());
                document
            }
            Err(e) => return Err(e.into()),
        };

        let created = self
            .escrow
            .create_product(&seed, price, &draft.currency, &pair.public.to_hex())
            .await?;
        tracing::info!("Created product {} for seed {}", created.id, seed);

        Ok(CreatedListing {
            id: created.id,
            seed,
            tx_hash: created.tx_hash,
            document,
        })
    }

    /// A document already at `seed` may only stand in for a new one when it
    /// is ours and carries exactly this draft
    fn check_reusable(
        &self,
        seed: &Seed,
        existing: &ListingDocument,
        signature: &[u8],
        pair: &KeyPair,
        draft: &ListingDraft,
    ) -> Result<(), ProtocolError> {
        let taken = || {
            ProtocolError::StorageRejected(format!(
                "{} is already published with different content",
                seed.blob_path()
            ))
        };

        if existing.seller != self.wallet.address() || existing.public_key != pair.public.to_base64()
        {
            return Err(taken());
        }
        if existing.name != draft.name
            || existing.description != draft.description
            || existing.token_id != draft.token_id
            || existing.price != draft.price
        {
            return Err(taken());
        }

        let wrapped = existing.wrapped_key().map_err(|_| taken())?;
        let payload = existing.encrypted_payload().map_err(|_| taken())?;
        match open_envelope(signature, &wrapped, &payload) {
            Ok(plaintext) if plaintext == draft.payload => Ok(()),
            _ => Err(taken()),
        }
    }

    /// Hand the content key to the buyer recorded on chain
    pub async fn deliver(&self, id: u64) -> Result<TxHash, ProtocolError> {
        let record = self.escrow.product(id).await?;
        require_status(id, &record, &[ProductStatus::Paid], "deliver")?;
        let buyer_public = record.buyer_public_key()?;

        let pair = derive_for(&self.wallet, &record.file_id).await?;
        if pair.public != record.seller_public_key()? {
            tracing::warn!(
                "Wallet {} does not reproduce the seller key of product {}",
                self.wallet.address(),
                id
            );
            return Err(ProtocolError::UnwrapFailure);
        }

        let document = self.store.fetch(&record.file_id).await?;
        let wrapped = rewrap_key(&document.wrapped_key()?, &pair.secret, &buyer_public)?;

        let tx_hash = self.escrow.send_code(id, &wrapped.to_hex()).await?;
        tracing::info!("Delivered product {} to {}", id, record.buyer);
        Ok(tx_hash)
    }

    /// Decrypt our own listing, e.g. to check what was listed
    pub async fn reveal(&self, id: u64) -> Result<String, ProtocolError> {
        let record = self.escrow.product(id).await?;
        let document = self.store.fetch(&record.file_id).await?;
        let signature = self
            .wallet
            .sign(&record.file_id.sign_message())
            .await
            .map_err(|e| ProtocolError::from(e).at(OpenStage::Signature))?;
        let wrapped = document
            .wrapped_key()
            .map_err(|e| e.at(OpenStage::Unwrap))?;
        let payload = document
            .encrypted_payload()
            .map_err(|e| e.at(OpenStage::Decrypt))?;
        open_envelope(&signature, &wrapped, &payload)
    }

    /// Refund a paid order instead of delivering
    pub async fn refund(&self, id: u64) -> Result<TxHash, ProtocolError> {
        let record = self.escrow.product(id).await?;
        require_status(id, &record, &[ProductStatus::Paid], "refund")?;
        Ok(self.escrow.refund_buyer(id).await?)
    }

    /// Collect payment once the buyer confirmed, or once the confirm window lapsed
    pub async fn withdraw(&self, id: u64) -> Result<TxHash, ProtocolError> {
        let record = self.escrow.product(id).await?;
        require_status(
            id,
            &record,
            &[ProductStatus::Completed, ProductStatus::CodeSent],
            "withdraw",
        )?;
        let tx_hash = match record.status {
            ProductStatus::Completed => self.escrow.withdraw_seller(id).await?,
            _ => self.escrow.withdraw_seller_after_confirm_timeout(id).await?,
        };
        tracing::info!("Withdrew payment for product {}", id);
        Ok(tx_hash)
    }
}

/// The buying side of the protocol
#[derive(Debug)]
pub struct Buyer<W, E, B> {
    wallet: W,
    escrow: E,
    store: B,
}

impl<W, E, B> Buyer<W, E, B>
where
    W: WalletSigner,
    E: EscrowContract,
    B: BlobStore,
{
    pub fn new(wallet: W, escrow: E, store: B) -> Self {
        Self {
            wallet,
            escrow,
            store,
        }
    }

    /// Pay for a product, registering our derived public key with the payment
    pub async fn purchase(&self, id: u64) -> Result<TxHash, ProtocolError> {
        let record = self.escrow.product(id).await?;
        require_status(id, &record, &[ProductStatus::Initial], "purchase")?;

        let pair = derive_for(&self.wallet, &record.file_id).await?;
        let public = pair.public.to_hex();
        let tx_hash = if is_hbar(&record.currency) {
            self.escrow.buy_with_hbar(id, record.price, &public).await?
        } else {
            self.escrow.buy_with_erc20(id, record.price, &public).await?
        };
        tracing::info!(
            "Purchased product {} for {}",
            id,
            format_units(record.price, decimals_for(&record.currency))
        );
        Ok(tx_hash)
    }

    /// Decrypt the delivered payload without confirming receipt
    pub async fn reveal(&self, id: u64) -> Result<String, ProtocolError> {
        let record = self.escrow.product(id).await?;
        require_status(
            id,
            &record,
            &[
                ProductStatus::CodeSent,
                ProductStatus::Completed,
                ProductStatus::CompletedPaidOut,
            ],
            "reveal",
        )?;
        self.open(&record).await
    }

    /// Decrypt the delivered payload, then confirm receipt on chain
    ///
    /// Nothing is submitted unless decryption succeeded.
    pub async fn confirm(&self, id: u64) -> Result<Confirmation, ProtocolError> {
        let record = self.escrow.product(id).await?;
        require_status(id, &record, &[ProductStatus::CodeSent], "confirm")?;
        let plaintext = self.open(&record).await?;
        let tx_hash = self.escrow.confirm_completed(id).await?;
        tracing::info!("Confirmed receipt of product {}", id);
        Ok(Confirmation { plaintext, tx_hash })
    }

    /// Reclaim payment when the seller never delivered
    pub async fn refund(&self, id: u64) -> Result<TxHash, ProtocolError> {
        let record = self.escrow.product(id).await?;
        require_status(id, &record, &[ProductStatus::Paid], "refund")?;
        Ok(self.escrow.refund_buyer(id).await?)
    }

    async fn open(&self, record: &ProductRecord) -> Result<String, ProtocolError> {
        let document = self.store.fetch(&record.file_id).await?;
        let signature = self
            .wallet
            .sign(&record.file_id.sign_message())
            .await
            .map_err(|e| ProtocolError::from(e).at(OpenStage::Signature))?;
        let wrapped = record.wrapped_key().map_err(|e| e.at(OpenStage::Unwrap))?;
        let payload = document
            .encrypted_payload()
            .map_err(|e| e.at(OpenStage::Decrypt))?;
        open_envelope(&signature, &wrapped, &payload)
    }
}

/// Every product on chain joined with its listing document
///
/// A missing or unreachable document does not hide the product; it is shown
/// with placeholder text instead. A record that cannot be read at all, e.g.
/// one whose `fileId` is not a valid seed, is skipped. Only a network failure
/// on the chain side aborts the listing.
pub async fn load_products<E, B>(escrow: &E, store: &B) -> Result<Vec<ProductSummary>, ProtocolError>
where
    E: EscrowContract,
    B: BlobStore,
{
    let next_id = escrow.next_id().await?;
    let mut products = Vec::with_capacity(next_id as usize);
    for id in 0..next_id {
        let record = match escrow.product(id).await {
            Ok(record) => record,
            Err(EscrowError::Network(msg)) => return Err(ProtocolError::NetworkFailure(msg)),
            Err(e) => {
                tracing::warn!("Skipping product {}: {}", id, e);
                continue;
            }
        };
        let (name, description) = match store.fetch(&record.file_id).await {
            Ok(document) => (document.name, document.description),
            Err(e) => {
                tracing::warn!("Failed to load document for product {}: {}", id, e);
                (
                    format!("Product {}", id),
                    format!("Product with ID {}", record.file_id),
                )
            }
        };
        products.push(ProductSummary {
            id,
            name,
            description,
            price: record.formatted_price(),
            seller: record.seller,
            buyer: record.buyer,
            file_id: record.file_id,
            status: record.status,
        });
    }
    Ok(products)
}
