use crate::context::InvocationContext;
use lambda_runtime::LambdaEvent;
use model::{Error, InvocationResult};
use serde_json::Value;

pub mod build;
pub mod context;
pub mod database;
pub mod dispatcher;
pub mod handler;
pub mod obligation;
pub mod settle;

pub use build::BuildTriggerHandler;
pub use database::DatabaseInitHandler;
pub use dispatcher::LifecycleDispatcher;
pub use handler::{HandlerError, HandlerOutput, ResourceHandler, Secrets};

/// Handle one invocation from the Lambda host, for use with `lambda_runtime::run()`.
///
/// The result reflects whether the completion response was delivered.
/// An error is returned only when the payload cannot be answered at all.
///
/// ```no_compile
/// let dispatcher = LifecycleDispatcher::new(handler, notifier, config.budget);
///
/// lambda_runtime::run(service_fn(async |event: LambdaEvent<Value>| {
///     lifecycle_fn(&dispatcher, event).await
/// }))
/// .await?;
/// ```
pub async fn lifecycle_fn<H: ResourceHandler>(
    dispatcher: &LifecycleDispatcher<H>,
    event: LambdaEvent<Value>,
) -> Result<InvocationResult, Error> {
    let (payload, context) = event.into_parts();
    let ctx: InvocationContext = InvocationContext::from(&context);

    let delivered: bool = dispatcher.handle_value(payload, &ctx).await?;

    Ok(InvocationResult::delivered(delivered))
}
