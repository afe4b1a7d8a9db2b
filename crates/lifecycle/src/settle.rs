use control_plane::DatabaseControlPlane;
use lambda_runtime::tracing;
use model::config::SettlePolicy;
use std::time::Duration;
use tokio::time::Instant;

/// Wait for an instance modification to reach the data plane.
///
/// Never fails: a readiness check error counts as not ready, and once the
/// policy's maximum wait has passed the caller carries on regardless.
pub async fn await_propagation(
    policy: &SettlePolicy,
    control_plane: &dyn DatabaseControlPlane,
    instance_id: &str,
) {
    match *policy {
        SettlePolicy::FixedDelay(delay) => {
            tracing::info!("Waiting {delay:?} for {instance_id} to apply the change");
            tokio::time::sleep(delay).await;
        }
        SettlePolicy::PollUntilReady { interval, max_wait } => {
            poll_until_ready(control_plane, instance_id, interval, max_wait).await
        }
    }
}

async fn poll_until_ready(
    control_plane: &dyn DatabaseControlPlane,
    instance_id: &str,
    interval: Duration,
    max_wait: Duration,
) {
    let started: Instant = Instant::now();

    loop {
        match control_plane.iam_auth_ready(instance_id).await {
            Ok(true) => {
                tracing::info!("{instance_id} ready after {:?}", started.elapsed());
                return;
            }
            Ok(false) => tracing::debug!("{instance_id} not ready yet"),
            Err(err) => tracing::warn!("Readiness check for {instance_id} failed: {err}"),
        }

        let elapsed: Duration = started.elapsed();
        if elapsed >= max_wait {
            tracing::warn!("{instance_id} not ready after {max_wait:?}, continuing anyway");
            return;
        }

        tokio::time::sleep(interval.min(max_wait - elapsed)).await;
    }
}
