use crate::{HttpOutcome, Transport, TransportError};
use lambda_runtime::tracing;
use model::{CompletionResponse, CorrelationIds, ResponseStatus};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builds completion responses and hands them to a [`Transport`].
///
/// Notification failures are logged and reported through the return value,
/// never raised: there is no other channel left to report them on.
#[derive(Clone)]
pub struct CompletionNotifier {
    transport: Arc<dyn Transport>,
}

impl CompletionNotifier {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        CompletionNotifier { transport }
    }

    /// Send the response for `ids`. Returns whether the endpoint accepted it.
    pub async fn notify(
        &self,
        ids: &CorrelationIds,
        status: ResponseStatus,
        reason: &str,
        data: BTreeMap<String, String>,
        physical_resource_id: &str,
    ) -> bool {
        let response: CompletionResponse =
            CompletionResponse::new(ids, status, reason, physical_resource_id, data);

        let body: String = match serde_json::to_string(&response) {
            Ok(body) => body,
            Err(err) => {
                tracing::error!(request_id = %ids.request_id, "Failed to serialise response: {err}");
                return false;
            }
        };

        tracing::info!(response_url = ids.response_url_for_log(), "Response body: {body}");

        let result: Result<HttpOutcome, TransportError> =
            self.transport.put(&ids.response_url, body).await;

        match result {
            Ok(outcome) => {
                tracing::info!(status = outcome.status, "Status code: {}", outcome.reason);
                true
            }
            Err(err) => {
                tracing::error!(request_id = %ids.request_id, "Failed to send response: {err}");
                false
            }
        }
    }
}
