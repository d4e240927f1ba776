use common::listing::ListingDocument;
use common::seed::Seed;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use url::Url;

use super::{ApiError, ApiRequest};

/// `GET {cdn}/{seed}.json`
#[derive(Debug, Clone)]
pub struct FetchListing {
    pub seed: Seed,
}

impl ApiRequest for FetchListing {
    type Response = ListingDocument;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        // append as one encoded segment so the seed can never leave the prefix
        let mut url = base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::UrlParse(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push(&self.seed.blob_path());
        Ok(client.get(url))
    }
}

/// `POST {upload}/api/cdn/json` with `{path, content}`
#[derive(Debug, Clone, Serialize)]
pub struct PublishListing {
    pub path: String,
    /// The listing document, serialized
    pub content: String,
}

impl PublishListing {
    pub fn new(seed: &Seed, document: &ListingDocument) -> Result<Self, ApiError> {
        Ok(Self {
            path: seed.blob_path(),
            content: serde_json::to_string(document)?,
        })
    }
}

impl ApiRequest for PublishListing {
    type Response = ();

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let url = base_url.join("api/cdn/json")?;
        Ok(client.post(url).json(&self))
    }
}

/// Upload service liveness, `GET /` answers `OK`
#[derive(Debug, Clone)]
pub struct Ping;

impl ApiRequest for Ping {
    type Response = String;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        Ok(client.get(base_url.clone()))
    }
}
