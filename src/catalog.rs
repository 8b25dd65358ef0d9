use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::Artifact;
use crate::error::EtdbError;

/// Remote index of tomography records. The downloader treats the query side
/// as opaque: one call returns every artifact the index matched.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn list_artifacts(&self) -> Result<Vec<Artifact>, EtdbError>;
}

#[derive(Clone)]
pub struct HttpCatalogClient {
    client: Client,
    index_url: String,
}

impl HttpCatalogClient {
    pub const DEFAULT_INDEX_URL: &'static str = "https://etdb.caltech.edu/api/artifacts";

    pub fn new(index_url: &str) -> Result<Self, EtdbError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("etdb-dl/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| EtdbError::Catalog(err.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| EtdbError::Catalog(err.to_string()))?;

        Ok(Self {
            client,
            index_url: index_url.to_string(),
        })
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn list_artifacts(&self) -> Result<Vec<Artifact>, EtdbError> {
        let response = self
            .client
            .get(&self.index_url)
            .send()
            .await
            .map_err(|err| EtdbError::Catalog(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "catalog request failed".to_string());
            return Err(EtdbError::CatalogStatus { status, message });
        }

        response
            .json::<Vec<Artifact>>()
            .await
            .map_err(|err| EtdbError::Catalog(err.to_string()))
    }
}
