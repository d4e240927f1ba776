//! HTTP side of the listing blob store
//!
//! Reads go straight to the CDN (`GET {cdn}/{seed}.json`); writes go through
//! the companion upload service (`POST {upload}/api/cdn/json`).

mod client;
mod error;
pub mod requests;

pub use client::CdnClient;
pub use error::ApiError;

use reqwest::{Client, RequestBuilder};
use url::Url;

pub trait ApiRequest {
    type Response;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError>;
}
