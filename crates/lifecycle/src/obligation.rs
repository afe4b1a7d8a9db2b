use crate::context::InvocationContext;
use crate::handler::{HandlerError, HandlerOutput};
use lambda_runtime::tracing;
use model::{CorrelationIds, ResponseStatus};
use notifier::CompletionNotifier;
use std::collections::BTreeMap;

/// The duty to answer the orchestrator for one event.
///
/// Created as soon as the correlation ids are known and consumed by
/// [`ResponseObligation::discharge`], which sends exactly one response.
/// Dropping it undischarged is a bug and is logged as such.
pub struct ResponseObligation {
    ids: CorrelationIds,
    log_stream_name: String,
    request_id: String,
    discharged: bool,
}

impl ResponseObligation {
    pub fn new(ids: CorrelationIds, ctx: &InvocationContext) -> Self {
        ResponseObligation {
            ids,
            log_stream_name: ctx.log_stream_name.clone(),
            request_id: ctx.request_id.clone(),
            discharged: false,
        }
    }

    /// Send the one response for this event. Returns whether it was delivered.
    pub async fn discharge(
        mut self,
        notifier: &CompletionNotifier,
        outcome: Result<HandlerOutput, HandlerError>,
    ) -> bool {
        self.discharged = true;

        let (status, reason, physical_resource_id, data) = match outcome {
            Ok(output) => (
                ResponseStatus::Success,
                self.success_reason(),
                self.physical_resource_id(output.physical_resource_id.as_deref()),
                output.data,
            ),
            Err(err) => {
                tracing::error!("Failed to handle {}: {err}", self.ids.logical_resource_id);
                (
                    ResponseStatus::Failed,
                    err.reason(),
                    self.physical_resource_id(None),
                    BTreeMap::new(),
                )
            }
        };

        notifier
            .notify(&self.ids, status, &reason, data, &physical_resource_id)
            .await
    }

    fn success_reason(&self) -> String {
        format!(
            "See the details in CloudWatch Log Stream: {}",
            self.log_stream_name
        )
    }

    /// First non-empty of: the id the event carried, the handler's own,
    /// the log stream, the invocation request id, the logical id.
    fn physical_resource_id(&self, supplied: Option<&str>) -> String {
        [
            self.ids.physical_resource_id.as_deref(),
            supplied,
            Some(self.log_stream_name.as_str()),
            Some(self.request_id.as_str()),
        ]
        .into_iter()
        .flatten()
        .find(|id: &&str| !id.is_empty())
        .unwrap_or(self.ids.logical_resource_id.as_str())
        .to_string()
    }
}

impl Drop for ResponseObligation {
    fn drop(&mut self) {
        if !self.discharged {
            tracing::error!(
                request_id = %self.ids.request_id,
                "No response was sent for {}",
                self.ids.logical_resource_id
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use test_utils::{
        LogCapture, RecordingTransport, TEST_REQUEST_ID, TEST_RESPONSE_URL, TEST_STACK_ID,
    };

    fn ids(physical_resource_id: Option<&str>) -> CorrelationIds {
        CorrelationIds {
            response_url: TEST_RESPONSE_URL.to_string(),
            stack_id: TEST_STACK_ID.to_string(),
            request_id: TEST_REQUEST_ID.to_string(),
            logical_resource_id: "DBInit".to_string(),
            physical_resource_id: physical_resource_id.map(str::to_string),
        }
    }

    fn ctx(log_stream_name: &str, request_id: &str) -> InvocationContext {
        InvocationContext {
            request_id: request_id.to_string(),
            log_stream_name: log_stream_name.to_string(),
            deadline: None,
        }
    }

    #[test]
    fn physical_id_prefers_event_value() {
        let obligation = ResponseObligation::new(ids(Some("existing")), &ctx("stream", "req"));
        assert_eq!("existing", obligation.physical_resource_id(Some("mine")));
        obligation.discharged_for_test();
    }

    #[test]
    fn physical_id_falls_through_empty_values() {
        let obligation = ResponseObligation::new(ids(Some("")), &ctx("stream", "req"));
        assert_eq!("mine", obligation.physical_resource_id(Some("mine")));
        assert_eq!("stream", obligation.physical_resource_id(None));
        obligation.discharged_for_test();

        let obligation = ResponseObligation::new(ids(None), &ctx("", "req"));
        assert_eq!("req", obligation.physical_resource_id(Some("")));
        obligation.discharged_for_test();

        let obligation = ResponseObligation::new(ids(None), &ctx("", ""));
        assert_eq!("DBInit", obligation.physical_resource_id(None));
        obligation.discharged_for_test();
    }

    #[test]
    fn dropping_without_a_response_is_logged() {
        let (capture, _guard) = LogCapture::install();

        drop(ResponseObligation::new(ids(None), &ctx("stream", "req")));

        let logs: String = capture.contents();
        assert!(logs.contains("ERROR"), "Expected an error record: {logs}");
        assert!(logs.contains("No response was sent for DBInit"));
        assert!(logs.contains(TEST_REQUEST_ID));
    }

    #[tokio::test]
    async fn discharged_obligation_drops_quietly() {
        let (capture, _guard) = LogCapture::install();
        let notifier: CompletionNotifier =
            CompletionNotifier::new(Arc::new(RecordingTransport::default()));

        ResponseObligation::new(ids(None), &ctx("stream", "req"))
            .discharge(&notifier, Ok(HandlerOutput::default()))
            .await;

        assert!(!capture.contents().contains("No response was sent"));
    }

    #[tokio::test]
    async fn discharge_sends_one_response() {
        let transport: Arc<RecordingTransport> = Arc::new(RecordingTransport::default());
        let notifier: CompletionNotifier = CompletionNotifier::new(transport.clone());
        let obligation = ResponseObligation::new(ids(None), &ctx("stream", "req"));

        let delivered: bool = obligation
            .discharge(&notifier, Ok(HandlerOutput::with_data("build_id", "ghost:0001")))
            .await;

        assert!(delivered);
        let puts = transport.puts();
        assert_eq!(1, puts.len());
        assert_eq!(TEST_RESPONSE_URL, puts[0].url);

        let body = puts[0].json();
        assert_eq!("SUCCESS", body["Status"]);
        assert_eq!("See the details in CloudWatch Log Stream: stream", body["Reason"]);
        assert_eq!("stream", body["PhysicalResourceId"]);
        assert_eq!("ghost:0001", body["Data"]["build_id"]);
    }

    #[tokio::test]
    async fn failure_reason_is_the_error_text() {
        let transport: Arc<RecordingTransport> = Arc::new(RecordingTransport::default());
        let notifier: CompletionNotifier = CompletionNotifier::new(transport.clone());
        let obligation = ResponseObligation::new(ids(Some("existing")), &ctx("stream", "req"));

        obligation
            .discharge(&notifier, Err(HandlerError::MissingProperty("Password")))
            .await;

        let body = transport.puts()[0].json();
        assert_eq!("FAILED", body["Status"]);
        assert_eq!("missing resource property Password", body["Reason"]);
        assert_eq!("existing", body["PhysicalResourceId"]);
        assert_eq!(serde_json::json!({}), body["Data"]);
    }

    #[tokio::test]
    async fn undelivered_response_is_reported() {
        let transport: Arc<RecordingTransport> =
            Arc::new(RecordingTransport::failing("connection reset"));
        let notifier: CompletionNotifier = CompletionNotifier::new(transport.clone());
        let obligation = ResponseObligation::new(ids(None), &ctx("stream", "req"));

        let delivered: bool = obligation.discharge(&notifier, Ok(HandlerOutput::default())).await;

        assert!(!delivered);
        assert_eq!(1, transport.puts().len());
    }

    impl ResponseObligation {
        fn discharged_for_test(mut self) {
            self.discharged = true;
        }
    }
}
