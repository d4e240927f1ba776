use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use time::OffsetDateTime;

use crate::escrow::{EscrowContract, EscrowError, ProductCreated, TxHash};
use crate::listing::{is_hbar, ProductRecord, ProductStatus};
use crate::seed::Seed;

/// Seconds a seller has to deliver after payment
pub const DEFAULT_SEND_CODE_WINDOW: u64 = 3 * 24 * 60 * 60;
/// Seconds a buyer has to confirm after delivery
pub const DEFAULT_CONFIRM_WINDOW: u64 = 3 * 24 * 60 * 60;

/// Shared in-memory chain holding every product record
#[derive(Debug, Clone)]
pub struct MemoryEscrow {
    inner: Arc<Mutex<MemoryEscrowInner>>,
}

#[derive(Debug)]
struct MemoryEscrowInner {
    products: Vec<ProductRecord>,
    /// Unix seconds; only moves when a test advances it
    now: u64,
    tx_count: u64,
    offline: bool,
    /// Records whose raw `fileId` no longer parses, keyed by product id
    unreadable: HashMap<u64, String>,
}

impl Default for MemoryEscrow {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEscrow {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryEscrowInner {
                products: Vec::new(),
                now: OffsetDateTime::now_utc().unix_timestamp().max(0) as u64,
                tx_count: 0,
                offline: false,
                unreadable: HashMap::new(),
            })),
        }
    }

    /// A handle that submits transactions as `account`
    pub fn connect(&self, account: impl Into<String>) -> EscrowHandle {
        EscrowHandle {
            chain: self.clone(),
            account: account.into(),
        }
    }

    /// Move the chain clock forward
    pub fn advance(&self, seconds: u64) {
        self.inner.lock().now += seconds;
    }

    /// Make every call fail as if the relay were unreachable
    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().offline = offline;
    }

    /// Make product `id` read back with `file_id` as its raw `fileId`, the
    /// way a record written by another client with a malformed seed looks
    pub fn set_raw_file_id(&self, id: u64, file_id: impl Into<String>) {
        self.inner.lock().unreadable.insert(id, file_id.into());
    }

    fn transact<T>(
        &self,
        id: u64,
        f: impl FnOnce(&mut ProductRecord, u64) -> Result<T, EscrowError>,
    ) -> Result<TxHash, EscrowError> {
        let mut inner = self.inner.lock();
        if inner.offline {
            return Err(EscrowError::Network("relay unreachable".into()));
        }
        let now = inner.now;
        let product = inner
            .products
            .get_mut(id as usize)
            .ok_or(EscrowError::UnknownProduct(id))?;

        // apply to a copy so a revert leaves the record untouched
        let mut updated = product.clone();
        f(&mut updated, now)?;
        *product = updated;

        inner.tx_count += 1;
        Ok(format!("0x{:064x}", inner.tx_count))
    }
}

/// One account's connection to a [`MemoryEscrow`]
#[derive(Debug, Clone)]
pub struct EscrowHandle {
    chain: MemoryEscrow,
    account: String,
}

fn same_account(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

fn require(condition: bool, reason: &str) -> Result<(), EscrowError> {
    if condition {
        Ok(())
    } else {
        Err(EscrowError::Rejected(reason.to_string()))
    }
}

impl EscrowHandle {
    fn buy(
        &self,
        id: u64,
        expected_price: u128,
        buyer_pub_key: &str,
        hbar: bool,
    ) -> Result<TxHash, EscrowError> {
        let account = self.account.clone();
        let buyer_pub_key = buyer_pub_key.to_string();
        self.chain.transact(id, move |product, now| {
            require(product.status == ProductStatus::Initial, "product not available")?;
            require(is_hbar(&product.currency) == hbar, "wrong payment currency")?;
            require(product.price == expected_price, "price mismatch")?;
            require(!same_account(&product.seller, &account), "seller cannot buy")?;
            require(!buyer_pub_key.is_empty(), "missing buyer public key")?;
            product.buyer = account;
            product.buyer_pub_key = buyer_pub_key;
            product.status = ProductStatus::Paid;
            product.paid_at = now;
            Ok(())
        })
    }
}

#[async_trait]
impl EscrowContract for EscrowHandle {
    fn account(&self) -> String {
        self.account.clone()
    }

    async fn product(&self, id: u64) -> Result<ProductRecord, EscrowError> {
        let inner = self.chain.inner.lock();
        if inner.offline {
            return Err(EscrowError::Network("relay unreachable".into()));
        }
        if let Some(raw) = inner.unreadable.get(&id) {
            return Err(EscrowError::InvalidRecord {
                id,
                reason: format!("fileId {:?} is not a valid seed", raw),
            });
        }
        inner
            .products
            .get(id as usize)
            .cloned()
            .ok_or(EscrowError::UnknownProduct(id))
    }

    async fn next_id(&self) -> Result<u64, EscrowError> {
        let inner = self.chain.inner.lock();
        if inner.offline {
            return Err(EscrowError::Network("relay unreachable".into()));
        }
        Ok(inner.products.len() as u64)
    }

    async fn default_send_code_window(&self) -> Result<u64, EscrowError> {
        Ok(DEFAULT_SEND_CODE_WINDOW)
    }

    async fn default_confirm_window(&self) -> Result<u64, EscrowError> {
        Ok(DEFAULT_CONFIRM_WINDOW)
    }

    async fn create_product(
        &self,
        file_id: &Seed,
        price: u128,
        currency: &str,
        seller_pub_key: &str,
    ) -> Result<ProductCreated, EscrowError> {
        let mut inner = self.chain.inner.lock();
        if inner.offline {
            return Err(EscrowError::Network("relay unreachable".into()));
        }
        require(price > 0, "price must be positive")?;
        require(!seller_pub_key.is_empty(), "missing seller public key")?;

        let id = inner.products.len() as u64;
        inner.products.push(ProductRecord {
            seller: self.account.clone(),
            price,
            currency: currency.to_string(),
            status: ProductStatus::Initial,
            file_id: file_id.clone(),
            buyer: String::new(),
            seller_pub_key: seller_pub_key.to_string(),
            buyer_pub_key: String::new(),
            encrypted_sym_key: String::new(),
            send_code_window: DEFAULT_SEND_CODE_WINDOW,
            confirm_window: DEFAULT_CONFIRM_WINDOW,
            paid_at: 0,
            code_sent_at: 0,
        });
        inner.tx_count += 1;
        Ok(ProductCreated {
            id,
            tx_hash: format!("0x{:064x}", inner.tx_count),
        })
    }

    async fn buy_with_hbar(
        &self,
        id: u64,
        expected_price: u128,
        buyer_pub_key: &str,
    ) -> Result<TxHash, EscrowError> {
        self.buy(id, expected_price, buyer_pub_key, true)
    }

    async fn buy_with_erc20(
        &self,
        id: u64,
        expected_price: u128,
        buyer_pub_key: &str,
    ) -> Result<TxHash, EscrowError> {
        self.buy(id, expected_price, buyer_pub_key, false)
    }

    async fn send_code(&self, id: u64, encrypted_sym_key: &str) -> Result<TxHash, EscrowError> {
        let account = self.account.clone();
        let key = encrypted_sym_key.to_string();
        self.chain.transact(id, move |product, now| {
            require(same_account(&product.seller, &account), "only seller")?;
            require(product.status == ProductStatus::Paid, "product not paid")?;
            require(
                now <= product.paid_at + product.send_code_window,
                "send code window expired",
            )?;
            require(!key.is_empty(), "missing encrypted key")?;
            product.encrypted_sym_key = key;
            product.status = ProductStatus::CodeSent;
            product.code_sent_at = now;
            Ok(())
        })
    }

    async fn confirm_completed(&self, id: u64) -> Result<TxHash, EscrowError> {
        let account = self.account.clone();
        self.chain.transact(id, move |product, _| {
            require(same_account(&product.buyer, &account), "only buyer")?;
            require(product.status == ProductStatus::CodeSent, "code not sent")?;
            product.status = ProductStatus::Completed;
            Ok(())
        })
    }

    async fn refund_buyer(&self, id: u64) -> Result<TxHash, EscrowError> {
        let account = self.account.clone();
        self.chain.transact(id, move |product, now| {
            require(product.status == ProductStatus::Paid, "product not paid")?;
            let by_seller = same_account(&product.seller, &account);
            let by_buyer_after_timeout = same_account(&product.buyer, &account)
                && now > product.paid_at + product.send_code_window;
            require(by_seller || by_buyer_after_timeout, "refund not allowed")?;
            product.status = ProductStatus::Refunded;
            Ok(())
        })
    }

    async fn withdraw_seller(&self, id: u64) -> Result<TxHash, EscrowError> {
        let account = self.account.clone();
        self.chain.transact(id, move |product, _| {
            require(same_account(&product.seller, &account), "only seller")?;
            require(product.status == ProductStatus::Completed, "not completed")?;
            product.status = ProductStatus::CompletedPaidOut;
            Ok(())
        })
    }

    async fn withdraw_seller_after_confirm_timeout(
        &self,
        id: u64,
    ) -> Result<TxHash, EscrowError> {
        let account = self.account.clone();
        self.chain.transact(id, move |product, now| {
            require(same_account(&product.seller, &account), "only seller")?;
            require(product.status == ProductStatus::CodeSent, "code not sent")?;
            require(
                now > product.code_sent_at + product.confirm_window,
                "confirm window still open",
            )?;
            product.status = ProductStatus::CompletedPaidOut;
            Ok(())
        })
    }
}
