pub mod http;
pub mod logging;
pub mod rpc;
pub mod state;

pub use http::{ApiError, CdnClient};
pub use rpc::{JsonRpcClient, RpcError, RpcEscrow};
pub use state::{AppConfig, AppState, StateError};
