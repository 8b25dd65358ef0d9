use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::Client;

use crate::error::EtdbError;

/// Chunked byte stream for one remote file. Terminates with end-of-stream or
/// a single `Err` item; the pipeline treats either as final.
pub type ByteStream = BoxStream<'static, Result<Bytes, EtdbError>>;

/// Content-addressed source of file bytes, keyed by `location/filename`.
#[async_trait]
pub trait FileSource: Send + Sync {
    async fn open_read_stream(&self, remote_id: &str) -> Result<ByteStream, EtdbError>;
}

/// HTTPS gateway in front of the IPFS network holding the ETDB files.
#[derive(Clone)]
pub struct IpfsGateway {
    client: Client,
    base_url: String,
}

impl IpfsGateway {
    pub const DEFAULT_GATEWAY_URL: &'static str = "https://gateway.ipfs.io";

    pub fn new(base_url: &str) -> Result<Self, EtdbError> {
        let client = Client::builder()
            // Connect timeout only; transfers of large tomograms can run for
            // hours, so no overall request deadline.
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| EtdbError::Stream(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl FileSource for IpfsGateway {
    async fn open_read_stream(&self, remote_id: &str) -> Result<ByteStream, EtdbError> {
        let url = format!("{}/ipfs/{remote_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| EtdbError::Stream(err.to_string()))?;

        if !response.status().is_success() {
            return Err(EtdbError::Stream(format!(
                "gateway returned status {} for {remote_id}",
                response.status().as_u16()
            )));
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|err| EtdbError::Stream(err.to_string())))
            .boxed())
    }
}
