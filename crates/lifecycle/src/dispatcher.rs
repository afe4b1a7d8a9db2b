use crate::context::InvocationContext;
use crate::handler::{HandlerError, HandlerOutput, ResourceHandler, Secrets};
use crate::obligation::ResponseObligation;
use futures::FutureExt;
use lambda_runtime::tracing::{self, Instrument, Span};
use model::config::InvocationBudget;
use model::{CorrelationIds, Error, LifecycleEvent, RequestType};
use notifier::CompletionNotifier;
use serde::Deserialize;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

/// Routes lifecycle events to a [`ResourceHandler`] and guarantees that
/// every event whose correlation ids can be read gets exactly one response.
pub struct LifecycleDispatcher<H: ResourceHandler> {
    handler: H,
    notifier: CompletionNotifier,
    budget: InvocationBudget,
}

impl<H: ResourceHandler> LifecycleDispatcher<H> {
    pub fn new(handler: H, notifier: CompletionNotifier, budget: InvocationBudget) -> Self {
        LifecycleDispatcher {
            handler,
            notifier,
            budget,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Handle a raw payload from the host.
    ///
    /// A payload that is not a valid event is still answered with a failure
    /// if its correlation ids can be read. Otherwise there is nobody to
    /// answer and the error is returned to the host.
    pub async fn handle_value(&self, payload: Value, ctx: &InvocationContext) -> Result<bool, Error> {
        let parse_err: serde_json::Error = match LifecycleEvent::deserialize(&payload) {
            Ok(event) => return Ok(self.handle(event, ctx).await),
            Err(err) => err,
        };

        let ids: CorrelationIds = CorrelationIds::deserialize(&payload)
            .map_err(|err| format!("unusable lifecycle event: {err}"))?;
        tracing::error!(request_id = %ids.request_id, "Malformed event: {parse_err}");

        let obligation: ResponseObligation = ResponseObligation::new(ids, ctx);
        let delivered: bool = obligation
            .discharge(
                &self.notifier,
                Err(HandlerError::MalformedEvent(parse_err.to_string())),
            )
            .await;

        Ok(delivered)
    }

    /// Handle one event. Returns whether its response was delivered.
    pub async fn handle(&self, mut event: LifecycleEvent, ctx: &InvocationContext) -> bool {
        let secrets: Secrets = self.take_secrets(&mut event);
        let obligation: ResponseObligation =
            ResponseObligation::new(CorrelationIds::from(&event), ctx);

        let span: Span = tracing::span!(
            tracing::Level::INFO,
            "Lifecycle",
            handler = self.handler.name(),
            request_type = ?event.request_type,
            logical_resource_id = %event.logical_resource_id,
            request_id = %event.request_id
        );

        async {
            tracing::info!("Event: {:?}", loggable(&event));

            let limit: Duration = self.time_limit(ctx);
            let outcome: Result<HandlerOutput, HandlerError> =
                self.run(&event, &secrets, limit).await;

            obligation.discharge(&self.notifier, outcome).await
        }
        .instrument(span)
        .await
    }

    fn take_secrets(&self, event: &mut LifecycleEvent) -> Secrets {
        let mut secrets: Secrets = Secrets::default();

        for &key in self.handler.secret_properties() {
            if let Some(value) = event.take_secret(key) {
                secrets.insert(key, value);
            }
        }

        secrets
    }

    /// Run the action for the event, turning panics and overruns into errors.
    async fn run(
        &self,
        event: &LifecycleEvent,
        secrets: &Secrets,
        limit: Duration,
    ) -> Result<HandlerOutput, HandlerError> {
        let action = async {
            match event.request_type {
                RequestType::Create => self.handler.create(event, secrets).await,
                RequestType::Update => self.handler.update(event, secrets).await,
                RequestType::Delete => {
                    tracing::info!("Nothing to do on Delete");
                    Ok(HandlerOutput::default())
                }
            }
        };

        match tokio::time::timeout(limit, AssertUnwindSafe(action).catch_unwind()).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(panic)) => Err(HandlerError::Panicked(panic_message(panic.as_ref()))),
            Err(_) => Err(HandlerError::TimedOut(limit)),
        }
    }

    /// The configured budget, shortened to the host's deadline when that is sooner.
    fn time_limit(&self, ctx: &InvocationContext) -> Duration {
        let usable: Duration = self.budget.usable();

        match ctx.remaining() {
            Some(remaining) => usable.min(remaining.saturating_sub(self.budget.response_reserve)),
            None => usable,
        }
    }
}

/// The event as it may be logged, without the callback signature.
fn loggable(event: &LifecycleEvent) -> LifecycleEvent {
    let mut event: LifecycleEvent = event.clone();
    event.response_url = event.response_url_for_log().to_string();
    event
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
