use serde::Serialize;

pub mod config;
pub mod env;
pub mod event;
pub mod response;

pub use event::{CorrelationIds, LifecycleEvent, RequestType, SecretValue, url_for_log};
pub use response::{CompletionResponse, ResponseStatus};

pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Value returned to the Lambda host once an invocation has finished.
///
/// `Response` reflects whether the completion callback was delivered,
/// not whether the resource operation itself succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InvocationResult {
    pub response: ResponseStatus,
}

impl InvocationResult {
    pub fn delivered(delivered: bool) -> Self {
        let response: ResponseStatus = match delivered {
            true => ResponseStatus::Success,
            false => ResponseStatus::Failed,
        };

        InvocationResult { response }
    }
}
