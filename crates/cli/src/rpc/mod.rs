//! JSON-RPC access to the Hedera EVM relay
//!
//! [`JsonRpcClient`] speaks plain JSON-RPC 2.0 over HTTP; [`RpcEscrow`] uses it
//! to read the escrow contract with `eth_call` and to submit signed legacy
//! transactions from a local secp256k1 wallet.

mod escrow;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

pub use escrow::{revert_reason, RpcEscrow, WEIBARS_PER_TINYBAR};

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("HTTP request failed: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("HTTP status {0}: {1}")]
    HttpStatus(StatusCode, String),
    /// The node answered with a JSON-RPC error object
    #[error("rpc error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<Value>,
    },
    #[error("invalid rpc response: {0}")]
    Body(#[from] serde_json::Error),
    #[error("invalid address {0:?}")]
    InvalidAddress(String),
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// A JSON-RPC 2.0 endpoint
#[derive(Debug, Clone)]
pub struct JsonRpcClient {
    pub url: Url,
    client: Client,
    next_id: Arc<AtomicU64>,
}

impl JsonRpcClient {
    pub fn new(url: &Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.clone(),
            client,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Call `method`, decoding `result` as `T`
    ///
    /// A `null` result decodes into `T` like any other value, so callers
    /// polling for something that may not exist yet ask for an `Option`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("rpc {} #{} {}", method, id, params);

        let response = self
            .client
            .post(self.url.clone())
            .json(&RpcRequest {
                jsonrpc: "2.0",
                id,
                method,
                params,
            })
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;

        // some relays pair an error object with a non-2xx status
        let parsed = serde_json::from_slice::<RpcResponse>(&body);
        if !status.is_success() {
            if let Ok(RpcResponse {
                error: Some(error), ..
            }) = parsed
            {
                return Err(error.into());
            }
            return Err(RpcError::HttpStatus(
                status,
                String::from_utf8_lossy(&body).into_owned(),
            ));
        }

        let parsed = parsed?;
        if let Some(error) = parsed.error {
            return Err(error.into());
        }
        Ok(serde_json::from_value(parsed.result.unwrap_or(Value::Null))?)
    }
}

impl From<RpcErrorObject> for RpcError {
    fn from(error: RpcErrorObject) -> Self {
        RpcError::Rpc {
            code: error.code,
            message: error.message,
            data: error.data,
        }
    }
}
