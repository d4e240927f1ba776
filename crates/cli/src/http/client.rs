use std::time::Duration;

use async_trait::async_trait;
use common::blob_store::{BlobStore, BlobStoreError};
use common::listing::ListingDocument;
use common::seed::Seed;
use reqwest::{header::HeaderMap, header::HeaderValue, Client, Response};
use url::Url;

use super::error::ApiError;
use super::requests::{FetchListing, Ping, PublishListing};
use super::ApiRequest;
use crate::state::AppConfig;

/// Blob store backed by the CDN and the upload service
#[derive(Debug, Clone)]
pub struct CdnClient {
    pub cdn_base_url: Url,
    pub upload_url: Url,
    client: Client,
}

impl CdnClient {
    pub fn new(cdn_base_url: &Url, upload_url: &Url, timeout: Duration) -> Result<Self, ApiError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            cdn_base_url: with_trailing_slash(cdn_base_url),
            upload_url: with_trailing_slash(upload_url),
            client,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ApiError> {
        Self::new(
            &config.cdn_base_url,
            &config.upload_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    async fn send<T: ApiRequest>(&self, base_url: &Url, request: T) -> Result<Response, ApiError> {
        let response = request.build_request(base_url, &self.client)?.send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(ApiError::HttpStatus(
                response.status(),
                response.text().await?,
            ))
        }
    }

    pub async fn fetch_listing(&self, seed: &Seed) -> Result<ListingDocument, ApiError> {
        tracing::debug!("Fetching {} from {}", seed.blob_path(), self.cdn_base_url);
        let response = self
            .send(&self.cdn_base_url, FetchListing { seed: seed.clone() })
            .await?;
        // the CDN does not always label its content type, so parse the body ourselves
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn publish_listing(
        &self,
        seed: &Seed,
        document: &ListingDocument,
    ) -> Result<(), ApiError> {
        tracing::debug!("Publishing {} via {}", seed.blob_path(), self.upload_url);
        self.send(&self.upload_url, PublishListing::new(seed, document)?)
            .await?;
        Ok(())
    }

    /// Body of the upload service's liveness endpoint
    pub async fn ping(&self) -> Result<String, ApiError> {
        let response = self.send(&self.upload_url, Ping).await?;
        Ok(response.text().await?)
    }
}

/// `Url::join` drops the last path segment unless the base ends in `/`
fn with_trailing_slash(url: &Url) -> Url {
    let mut url = url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[async_trait]
impl BlobStore for CdnClient {
    async fn fetch(&self, seed: &Seed) -> Result<ListingDocument, BlobStoreError> {
        self.fetch_listing(seed)
            .await
            .map_err(|e| e.into_blob_store_error(seed))
    }

    async fn publish(
        &self,
        seed: &Seed,
        document: &ListingDocument,
    ) -> Result<(), BlobStoreError> {
        self.publish_listing(seed, document)
            .await
            .map_err(|e| e.into_publish_error(seed))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_base_urls_normalised() {
        let client = CdnClient::new(
            &Url::parse("https://algoosh.b-cdn.net/payunlock").unwrap(),
            &Url::parse("http://localhost:3000").unwrap(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.cdn_base_url.as_str(), "https://algoosh.b-cdn.net/payunlock/");
        assert_eq!(client.upload_url.as_str(), "http://localhost:3000/");
    }

    #[tokio::test]
    async fn test_unreachable_store_is_network_error() {
        // nothing listens on the discard port
        let client = CdnClient::new(
            &Url::parse("http://127.0.0.1:9/").unwrap(),
            &Url::parse("http://127.0.0.1:9/").unwrap(),
            Duration::from_secs(2),
        )
        .unwrap();
        let seed = Seed::new("abc123").unwrap();
        assert!(matches!(
            client.fetch(&seed).await,
            Err(BlobStoreError::Network(_))
        ));
    }

    #[test]
    fn test_status_mapping() {
        let seed = Seed::new("abc123").unwrap();
        assert!(matches!(
            ApiError::HttpStatus(reqwest::StatusCode::NOT_FOUND, String::new())
                .into_blob_store_error(&seed),
            BlobStoreError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::HttpStatus(reqwest::StatusCode::BAD_GATEWAY, String::new())
                .into_blob_store_error(&seed),
            BlobStoreError::Network(_)
        ));
        assert!(matches!(
            ApiError::HttpStatus(reqwest::StatusCode::BAD_REQUEST, String::new())
                .into_blob_store_error(&seed),
            BlobStoreError::Invalid(_)
        ));
        assert!(matches!(
            ApiError::HttpStatus(reqwest::StatusCode::CONFLICT, String::new())
                .into_publish_error(&seed),
            BlobStoreError::Rejected(_)
        ));
        assert!(matches!(
            ApiError::HttpStatus(reqwest::StatusCode::SERVICE_UNAVAILABLE, String::new())
                .into_publish_error(&seed),
            BlobStoreError::Network(_)
        ));
    }
}
