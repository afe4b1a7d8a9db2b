use async_trait::async_trait;
use thiserror::Error;

pub mod completion;
pub mod http;

pub use completion::CompletionNotifier;
pub use http::HttpTransport;

/// Delivers a serialised completion response to the orchestrator's callback address.
///
/// A transport makes exactly one attempt. The address is single-use and expires,
/// so any failure is final.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn put(&self, url: &str, body: String) -> Result<HttpOutcome, TransportError>;
}

/// A successful response from the callback endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpOutcome {
    pub status: u16,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum TransportError {
    // The HTTP client could not be built
    #[error("failed to build http client: {0}")]
    Client(String),
    // Nothing came back from the endpoint
    #[error("request to callback endpoint failed: {0}")]
    Request(String),
    // The endpoint answered with something other than 2xx
    #[error("callback endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
}
