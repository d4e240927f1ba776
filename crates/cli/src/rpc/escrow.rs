use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use ethers::abi::{decode, encode, short_signature, ParamType, Token};
use ethers::signers::{LocalWallet as EvmAccount, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest, H256, U256, U64};
use serde::Deserialize;
use serde_json::json;

use common::escrow::{EscrowContract, EscrowError, ProductCreated, TxHash};
use common::listing::{ProductRecord, ProductStatus};
use common::network::NetworkConfig;
use common::seed::Seed;
use common::signer::{LocalWallet, WalletSigner};

use super::{JsonRpcClient, RpcError};

/// The relay takes `value` in weibars while the contract sees tinybars
pub const WEIBARS_PER_TINYBAR: u64 = 10_000_000_000;

/// Selector of Solidity's `Error(string)` revert payload
const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

const DEFAULT_RECEIPT_POLL: Duration = Duration::from_secs(1);
const DEFAULT_RECEIPT_ATTEMPTS: u32 = 60;

/// Receipt fields we read; relays differ in which of the rest they fill in
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Receipt {
    transaction_hash: H256,
    #[serde(default)]
    status: Option<U64>,
    #[serde(default)]
    logs: Vec<Log>,
}

#[derive(Debug, Clone, Deserialize)]
struct Log {
    address: Address,
    #[serde(default)]
    topics: Vec<H256>,
    #[serde(default)]
    data: Bytes,
}

/// The escrow contract behind a JSON-RPC relay
///
/// Reads need nothing but the relay. Writes are signed with the local wallet's
/// secp256k1 key as legacy EIP-155 transactions, so an Ed25519 wallet can
/// browse but not transact.
#[derive(Clone)]
pub struct RpcEscrow {
    rpc: JsonRpcClient,
    contract: Address,
    chain_id: u64,
    account: String,
    signer: Option<EvmAccount>,
    receipt_poll: Duration,
    receipt_attempts: u32,
}

impl fmt::Debug for RpcEscrow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcEscrow")
            .field("relay", &self.rpc.url.as_str())
            .field("contract", &self.contract)
            .field("chain_id", &self.chain_id)
            .field("account", &self.account)
            .field("can_sign", &self.signer.is_some())
            .finish()
    }
}

impl RpcEscrow {
    /// A read-only connection to `network`'s escrow contract
    pub fn new(rpc: JsonRpcClient, network: &NetworkConfig) -> Result<Self, RpcError> {
        let contract = parse_address(&network.contract_address)?;
        Ok(Self {
            rpc,
            contract,
            chain_id: network.chain_id,
            account: format!("{:?}", Address::zero()),
            signer: None,
            receipt_poll: DEFAULT_RECEIPT_POLL,
            receipt_attempts: DEFAULT_RECEIPT_ATTEMPTS,
        })
    }

    /// Act as `wallet`; only an EVM wallet can submit transactions
    pub fn with_wallet(mut self, wallet: &LocalWallet) -> Result<Self, EscrowError> {
        self.account = wallet.address();
        self.signer = match wallet.as_evm() {
            Some(evm) => Some(
                EvmAccount::from_bytes(&evm.to_bytes())
                    .map_err(|e| EscrowError::Rejected(format!("unusable wallet key: {}", e)))?
                    .with_chain_id(self.chain_id),
            ),
            None => None,
        };
        Ok(self)
    }

    /// How often and how many times to ask for a receipt before giving up
    pub fn with_receipt_polling(mut self, interval: Duration, attempts: u32) -> Self {
        self.receipt_poll = interval;
        self.receipt_attempts = attempts;
        self
    }

    async fn call(&self, data: Vec<u8>) -> Result<Vec<u8>, EscrowError> {
        let params = json!([{ "to": self.contract, "data": Bytes::from(data) }, "latest"]);
        let out: Bytes = self.rpc.request("eth_call", params).await?;
        Ok(out.to_vec())
    }

    async fn call_uint(&self, function: &str) -> Result<U256, EscrowError> {
        let out = self.call(calldata(function, &[], &[])).await?;
        decode(&[ParamType::Uint(256)], &out)
            .ok()
            .and_then(|tokens| tokens.into_iter().next())
            .and_then(Token::into_uint)
            .ok_or_else(|| EscrowError::Rejected(format!("{} returned {} bytes", function, out.len())))
    }

    /// Sign and submit a call to the contract, then wait for it to be mined
    async fn transact(&self, function: &str, data: Vec<u8>, value: U256) -> Result<Receipt, EscrowError> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            EscrowError::Rejected(format!(
                "{} needs a secp256k1 wallet; create one with `payunlock init --wallet evm`",
                function
            ))
        })?;
        let from = signer.address();

        let nonce: U256 = self
            .rpc
            .request("eth_getTransactionCount", json!([from, "pending"]))
            .await?;
        let gas_price: U256 = self.rpc.request("eth_gasPrice", json!([])).await?;
        let request = TransactionRequest::new()
            .from(from)
            .to(self.contract)
            .data(data)
            .value(value)
            .nonce(nonce)
            .gas_price(gas_price)
            .chain_id(self.chain_id);

        // a revert shows up here, before anything is paid for
        let estimate: U256 = self
            .rpc
            .request("eth_estimateGas", json!([request]))
            .await?;
        let tx: TypedTransaction = request.gas(estimate + estimate / 5).into();

        let signature = signer
            .sign_transaction_sync(&tx)
            .map_err(|e| EscrowError::Rejected(format!("failed to sign {}: {}", function, e)))?;
        let raw = tx.rlp_signed(&signature);
        let tx_hash: H256 = self
            .rpc
            .request("eth_sendRawTransaction", json!([raw]))
            .await?;
        tracing::info!("Submitted {} as {:?}", function, tx_hash);

        let receipt = self.wait_for_receipt(tx_hash).await?;
        if receipt.status == Some(U64::zero()) {
            return Err(EscrowError::Rejected(format!(
                "{} reverted in {:?}",
                function, receipt.transaction_hash
            )));
        }
        Ok(receipt)
    }

    async fn wait_for_receipt(&self, tx_hash: H256) -> Result<Receipt, EscrowError> {
        for attempt in 0..self.receipt_attempts {
            let receipt: Option<Receipt> = self
                .rpc
                .request("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;
            if let Some(receipt) = receipt {
                return Ok(receipt);
            }
            tracing::debug!("{:?} not mined yet (attempt {})", tx_hash, attempt + 1);
            tokio::time::sleep(self.receipt_poll).await;
        }
        Err(EscrowError::Network(format!(
            "{:?} was not mined after {} receipt polls",
            tx_hash, self.receipt_attempts
        )))
    }

    async fn transact_id(&self, function: &str, id: u64) -> Result<TxHash, EscrowError> {
        let data = calldata(function, &[ParamType::Uint(256)], &[Token::Uint(id.into())]);
        let receipt = self.transact(function, data, U256::zero()).await?;
        Ok(format!("{:?}", receipt.transaction_hash))
    }

    async fn buy(
        &self,
        function: &str,
        id: u64,
        expected_price: u128,
        buyer_pub_key: &str,
        value: U256,
    ) -> Result<TxHash, EscrowError> {
        let data = calldata(
            function,
            &[ParamType::Uint(256), ParamType::Uint(256), ParamType::Bytes],
            &[
                Token::Uint(id.into()),
                Token::Uint(U256::from(expected_price)),
                Token::Bytes(parse_hex(buyer_pub_key)?),
            ],
        );
        let receipt = self.transact(function, data, value).await?;
        Ok(format!("{:?}", receipt.transaction_hash))
    }
}

#[async_trait]
impl EscrowContract for RpcEscrow {
    fn account(&self) -> String {
        self.account.clone()
    }

    async fn product(&self, id: u64) -> Result<ProductRecord, EscrowError> {
        let out = self
            .call(calldata("products", &[ParamType::Uint(256)], &[Token::Uint(id.into())]))
            .await?;
        let tokens = decode(&product_fields(), &out).map_err(|e| EscrowError::InvalidRecord {
            id,
            reason: e.to_string(),
        })?;
        product_from_tokens(id, tokens)
    }

    async fn next_id(&self) -> Result<u64, EscrowError> {
        let next = self.call_uint("nextId").await?;
        u64::try_from(next).map_err(|_| EscrowError::Rejected(format!("nextId {} out of range", next)))
    }

    async fn default_send_code_window(&self) -> Result<u64, EscrowError> {
        let window = self.call_uint("DEFAULT_SEND_CODE_WINDOW").await?;
        u64::try_from(window).map_err(|_| EscrowError::Rejected(format!("window {} out of range", window)))
    }

    async fn default_confirm_window(&self) -> Result<u64, EscrowError> {
        let window = self.call_uint("DEFAULT_CONFIRM_WINDOW").await?;
        u64::try_from(window).map_err(|_| EscrowError::Rejected(format!("window {} out of range", window)))
    }

    async fn create_product(
        &self,
        file_id: &Seed,
        price: u128,
        currency: &str,
        seller_pub_key: &str,
    ) -> Result<ProductCreated, EscrowError> {
        let currency = parse_address(currency).map_err(|e| EscrowError::Rejected(e.to_string()))?;
        let data = calldata(
            "createProduct",
            &[
                ParamType::String,
                ParamType::Uint(256),
                ParamType::Address,
                ParamType::Bytes,
            ],
            &[
                Token::String(file_id.to_string()),
                Token::Uint(U256::from(price)),
                Token::Address(currency),
                Token::Bytes(parse_hex(seller_pub_key)?),
            ],
        );
        let receipt = self.transact("createProduct", data, U256::zero()).await?;
        let tx_hash = format!("{:?}", receipt.transaction_hash);
        let id = created_id(self.contract, &receipt.logs).ok_or_else(|| {
            EscrowError::Rejected(format!("no ProductCreated event in {}", tx_hash))
        })?;
        Ok(ProductCreated { id, tx_hash })
    }

    async fn buy_with_hbar(
        &self,
        id: u64,
        expected_price: u128,
        buyer_pub_key: &str,
    ) -> Result<TxHash, EscrowError> {
        let value = U256::from(expected_price) * U256::from(WEIBARS_PER_TINYBAR);
        self.buy("buyWithHBAR", id, expected_price, buyer_pub_key, value)
            .await
    }

    async fn buy_with_erc20(
        &self,
        id: u64,
        expected_price: u128,
        buyer_pub_key: &str,
    ) -> Result<TxHash, EscrowError> {
        self.buy("buyWithERC20", id, expected_price, buyer_pub_key, U256::zero())
            .await
    }

    async fn send_code(&self, id: u64, encrypted_sym_key: &str) -> Result<TxHash, EscrowError> {
        let data = calldata(
            "sendCode",
            &[ParamType::Uint(256), ParamType::Bytes],
            &[Token::Uint(id.into()), Token::Bytes(parse_hex(encrypted_sym_key)?)],
        );
        let receipt = self.transact("sendCode", data, U256::zero()).await?;
        Ok(format!("{:?}", receipt.transaction_hash))
    }

    async fn confirm_completed(&self, id: u64) -> Result<TxHash, EscrowError> {
        self.transact_id("confirmCompleted", id).await
    }

    async fn refund_buyer(&self, id: u64) -> Result<TxHash, EscrowError> {
        self.transact_id("refundBuyer", id).await
    }

    async fn withdraw_seller(&self, id: u64) -> Result<TxHash, EscrowError> {
        self.transact_id("withdrawSeller", id).await
    }

    async fn withdraw_seller_after_confirm_timeout(
        &self,
        id: u64,
    ) -> Result<TxHash, EscrowError> {
        self.transact_id("withdrawSellerAfterConfirmTimeout", id).await
    }
}

impl From<RpcError> for EscrowError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Rpc { message, data, .. } => {
                let reason = data
                    .as_ref()
                    .and_then(|data| data.as_str())
                    .and_then(revert_reason);
                EscrowError::Rejected(reason.unwrap_or(message))
            }
            RpcError::HttpStatus(status, body)
                if status.is_client_error() && status != reqwest::StatusCode::TOO_MANY_REQUESTS =>
            {
                EscrowError::Rejected(format!("{}: {}", status, body))
            }
            RpcError::InvalidAddress(_) => EscrowError::Rejected(err.to_string()),
            other => EscrowError::Network(other.to_string()),
        }
    }
}

/// The message of an `Error(string)` revert, from its `0x` hex payload
pub fn revert_reason(data: &str) -> Option<String> {
    let bytes = hex::decode(data.trim().trim_start_matches("0x")).ok()?;
    let payload = bytes.strip_prefix(&ERROR_STRING_SELECTOR[..])?;
    decode(&[ParamType::String], payload)
        .ok()?
        .into_iter()
        .next()?
        .into_string()
}

fn calldata(function: &str, params: &[ParamType], tokens: &[Token]) -> Vec<u8> {
    let mut data = short_signature(function, params).to_vec();
    data.extend(encode(tokens));
    data
}

/// Outputs of the public `products(uint256)` getter, in declaration order
fn product_fields() -> Vec<ParamType> {
    vec![
        ParamType::Address,   // seller
        ParamType::Uint(256), // price
        ParamType::Address,   // currency
        ParamType::Uint(8),   // status
        ParamType::String,    // fileId
        ParamType::Address,   // buyer
        ParamType::Bytes,     // sellerPubKey
        ParamType::Bytes,     // buyerPubKey
        ParamType::Bytes,     // encryptedSymKey
        ParamType::Uint(256), // sendCodeWindow
        ParamType::Uint(256), // confirmWindow
        ParamType::Uint(256), // paidAt
        ParamType::Uint(256), // codeSentAt
    ]
}

fn product_from_tokens(id: u64, tokens: Vec<Token>) -> Result<ProductRecord, EscrowError> {
    let invalid = |reason: &str| EscrowError::InvalidRecord {
        id,
        reason: reason.to_string(),
    };
    let [seller, price, currency, status, file_id, buyer, seller_pub_key, buyer_pub_key, encrypted_sym_key, send_code_window, confirm_window, paid_at, code_sent_at]: [Token; 13] =
        tokens
            .try_into()
            .map_err(|_| invalid("unexpected number of fields"))?;

    let address = |token: Token, name: &str| {
        token
            .into_address()
            .map(|a| format!("{:?}", a))
            .ok_or_else(|| invalid(name))
    };
    let bytes = |token: Token, name: &str| {
        token
            .into_bytes()
            .map(|b| if b.is_empty() { String::new() } else { format!("0x{}", hex::encode(b)) })
            .ok_or_else(|| invalid(name))
    };
    let uint = |token: Token, name: &str| token.into_uint().ok_or_else(|| invalid(name));
    let seconds = |token: Token, name: &str| {
        uint(token, name).and_then(|v| u64::try_from(v).map_err(|_| invalid(name)))
    };

    let raw_file_id = file_id.into_string().ok_or_else(|| invalid("fileId"))?;
    let file_id = Seed::new(raw_file_id.as_str()).map_err(|e| EscrowError::InvalidRecord {
        id,
        reason: format!("fileId {:?}: {}", raw_file_id, e),
    })?;
    let status = uint(status, "status")
        .and_then(|v| u8::try_from(v).map_err(|_| invalid("status")))?;

    Ok(ProductRecord {
        seller: address(seller, "seller")?,
        price: uint(price, "price").and_then(|v| u128::try_from(v).map_err(|_| invalid("price")))?,
        currency: address(currency, "currency")?,
        status: ProductStatus::from(status),
        file_id,
        buyer: address(buyer, "buyer")?,
        seller_pub_key: bytes(seller_pub_key, "sellerPubKey")?,
        buyer_pub_key: bytes(buyer_pub_key, "buyerPubKey")?,
        encrypted_sym_key: bytes(encrypted_sym_key, "encryptedSymKey")?,
        send_code_window: seconds(send_code_window, "sendCodeWindow")?,
        confirm_window: seconds(confirm_window, "confirmWindow")?,
        paid_at: seconds(paid_at, "paidAt")?,
        code_sent_at: seconds(code_sent_at, "codeSentAt")?,
    })
}

/// Id of the product a `createProduct` receipt created
///
/// `ProductCreated` indexes the id, so it is the first topic after the event
/// signature; an unindexed id is the first data word instead.
fn created_id(contract: Address, logs: &[Log]) -> Option<u64> {
    let log = logs.iter().find(|log| log.address == contract)?;
    let word = match log.topics.get(1) {
        Some(topic) => U256::from_big_endian(topic.as_bytes()),
        None if log.data.len() >= 32 => U256::from_big_endian(&log.data[..32]),
        None => return None,
    };
    u64::try_from(word).ok()
}

fn parse_address(text: &str) -> Result<Address, RpcError> {
    text.trim()
        .parse::<Address>()
        .map_err(|_| RpcError::InvalidAddress(text.to_string()))
}

fn parse_hex(text: &str) -> Result<Vec<u8>, EscrowError> {
    hex::decode(text.trim().trim_start_matches("0x"))
        .map_err(|_| EscrowError::Rejected(format!("not 0x hex: {:?}", text)))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_selectors_match_contract_abi() {
        assert_eq!(hex::encode(short_signature("nextId", &[])), "61b8ce8c");
        assert_eq!(
            hex::encode(short_signature("products", &[ParamType::Uint(256)])),
            "7acc0b20"
        );
    }

    #[test]
    fn test_revert_reason_decodes_error_string() {
        let mut data = ERROR_STRING_SELECTOR.to_vec();
        data.extend(encode(&[Token::String("price mismatch".into())]));
        assert_eq!(
            revert_reason(&format!("0x{}", hex::encode(&data))).as_deref(),
            Some("price mismatch")
        );
        assert_eq!(revert_reason("0x"), None);
        assert_eq!(revert_reason("0x12345678"), None);
    }

    #[test]
    fn test_created_id_from_topic_or_data() {
        let contract = Address::repeat_byte(0x95);
        let other = Log {
            address: Address::repeat_byte(0x01),
            topics: vec![H256::zero(), H256::from_low_u64_be(99)],
            data: Bytes::default(),
        };
        let indexed = Log {
            address: contract,
            topics: vec![H256::repeat_byte(0xee), H256::from_low_u64_be(7)],
            data: Bytes::default(),
        };
        assert_eq!(created_id(contract, &[other.clone(), indexed]), Some(7));

        let mut word = [0u8; 32];
        word[31] = 3;
        let unindexed = Log {
            address: contract,
            topics: vec![H256::repeat_byte(0xee)],
            data: Bytes::from(word.to_vec()),
        };
        assert_eq!(created_id(contract, &[unindexed]), Some(3));
        assert_eq!(created_id(contract, &[other]), None);
    }

    #[test]
    fn test_rpc_error_mapping() {
        let revert: EscrowError = RpcError::Rpc {
            code: 3,
            message: "execution reverted".into(),
            data: None,
        }
        .into();
        assert!(matches!(revert, EscrowError::Rejected(ref m) if m == "execution reverted"));

        let busy: EscrowError =
            RpcError::HttpStatus(reqwest::StatusCode::TOO_MANY_REQUESTS, String::new()).into();
        assert!(matches!(busy, EscrowError::Network(_)));
        let down: EscrowError =
            RpcError::HttpStatus(reqwest::StatusCode::BAD_GATEWAY, String::new()).into();
        assert!(matches!(down, EscrowError::Network(_)));
    }
}
