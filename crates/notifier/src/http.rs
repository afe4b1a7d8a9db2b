use crate::{HttpOutcome, Transport, TransportError};
use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport performing a single HTTP PUT per response.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client: reqwest::Client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::Client(err.to_string()))?;

        Ok(HttpTransport { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn put(&self, url: &str, body: String) -> Result<HttpOutcome, TransportError> {
        // The presigned URL is signed over an empty content type
        let response: reqwest::Response = self
            .client
            .put(url)
            .header(CONTENT_TYPE, "")
            .header(CONTENT_LENGTH, body.len())
            .body(body)
            .send()
            .await
            .map_err(|err| TransportError::Request(err.to_string()))?;

        let status: reqwest::StatusCode = response.status();
        let reason: String = status.canonical_reason().unwrap_or_default().to_string();

        if !status.is_success() {
            let body: String = response.text().await.unwrap_or_default();

            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(HttpOutcome {
            status: status.as_u16(),
            reason,
        })
    }
}
