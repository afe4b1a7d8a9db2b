use ::model::Error;
use ::model::config::DatabaseConfig;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_types::region::Region;
use control_plane::RdsControlPlane;
use lambda_runtime::{LambdaEvent, service_fn, tracing};
use lifecycle::{DatabaseInitHandler, LifecycleDispatcher, lifecycle_fn};
use notifier::{CompletionNotifier, HttpTransport};
use provisioner::MySqlConnector;
use serde_json::Value;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    // Fail the cold start rather than every invocation
    let config: DatabaseConfig = DatabaseConfig::from_env()?;
    tracing::info!(
        instance_id = %config.instance_id,
        host = %config.host,
        "Settle policy {:?}, budget {:?}",
        config.settle,
        config.budget
    );

    let sdk_config: SdkConfig = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        .load()
        .await;
    let control_plane: RdsControlPlane = RdsControlPlane::new(aws_sdk_rds::Client::new(&sdk_config));

    let handler: DatabaseInitHandler = DatabaseInitHandler::new(
        &config,
        Arc::new(control_plane),
        Arc::new(MySqlConnector::new(&config)),
    )?;
    // The PUT has to finish inside the time kept back for it
    let transport: HttpTransport = HttpTransport::with_timeout(config.budget.response_reserve)?;
    let notifier: CompletionNotifier = CompletionNotifier::new(Arc::new(transport));

    let dispatcher: LifecycleDispatcher<DatabaseInitHandler> =
        LifecycleDispatcher::new(handler, notifier, config.budget);

    lambda_runtime::run(service_fn(async |event: LambdaEvent<Value>| {
        lifecycle_fn(&dispatcher, event).await
    }))
    .await
}
