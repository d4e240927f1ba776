use common::blob_store::BlobStoreError;
use common::seed::Seed;
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("HTTP status {0}: {1}")]
    HttpStatus(StatusCode, String),
    #[error("invalid response body: {0}")]
    Body(#[from] serde_json::Error),
}

impl ApiError {
    /// Map onto the blob store taxonomy for a request about `seed`
    pub fn into_blob_store_error(self, seed: &Seed) -> BlobStoreError {
        match self {
            ApiError::HttpStatus(StatusCode::NOT_FOUND, _) => BlobStoreError::NotFound(seed.clone()),
            ApiError::HttpStatus(status, body) if status.is_client_error() => {
                BlobStoreError::Invalid(format!("{}: {}", status, body))
            }
            ApiError::Body(e) => BlobStoreError::Invalid(e.to_string()),
            ApiError::UrlParse(e) => BlobStoreError::Invalid(e.to_string()),
            other => BlobStoreError::Network(other.to_string()),
        }
    }

    /// Like [`ApiError::into_blob_store_error`], but a client error on a
    /// write means the upload service refused the document
    pub fn into_publish_error(self, seed: &Seed) -> BlobStoreError {
        match self {
            ApiError::HttpStatus(status, body) if status.is_client_error() => {
                BlobStoreError::Rejected(format!("{}: {}", status, body))
            }
            other => other.into_blob_store_error(seed),
        }
    }
}
