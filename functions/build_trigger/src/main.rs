use ::model::Error;
use ::model::config::BuildTriggerConfig;
use aws_config::{BehaviorVersion, ConfigLoader, SdkConfig};
use aws_types::region::Region;
use control_plane::CodeBuildTrigger;
use lambda_runtime::{LambdaEvent, service_fn, tracing};
use lifecycle::{BuildTriggerHandler, LifecycleDispatcher, lifecycle_fn};
use notifier::{CompletionNotifier, HttpTransport};
use serde_json::Value;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    let config: BuildTriggerConfig = BuildTriggerConfig::from_env()?;

    let mut loader: ConfigLoader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &config.region {
        loader = loader.region(Region::new(region.clone()));
    }
    let sdk_config: SdkConfig = loader.load().await;

    let trigger: CodeBuildTrigger = CodeBuildTrigger::new(aws_sdk_codebuild::Client::new(&sdk_config));
    // The PUT has to finish inside the time kept back for it
    let transport: HttpTransport = HttpTransport::with_timeout(config.budget.response_reserve)?;
    let notifier: CompletionNotifier = CompletionNotifier::new(Arc::new(transport));

    let dispatcher: LifecycleDispatcher<BuildTriggerHandler> = LifecycleDispatcher::new(
        BuildTriggerHandler::new(Arc::new(trigger)),
        notifier,
        config.budget,
    );

    lambda_runtime::run(service_fn(async |event: LambdaEvent<Value>| {
        lifecycle_fn(&dispatcher, event).await
    }))
    .await
}
