use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// What the dispatcher needs to know about the current invocation.
#[derive(Debug, Clone, Default)]
pub struct InvocationContext {
    pub request_id: String,
    pub log_stream_name: String,
    pub deadline: Option<SystemTime>,
}

impl InvocationContext {
    /// Wall-clock time left before the host stops the invocation.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|deadline: SystemTime| {
            deadline
                .duration_since(SystemTime::now())
                .unwrap_or(Duration::ZERO)
        })
    }
}

impl From<&lambda_runtime::Context> for InvocationContext {
    fn from(ctx: &lambda_runtime::Context) -> Self {
        // The runtime reports a zero deadline when none was given
        let deadline: Option<SystemTime> =
            (ctx.deadline > 0).then(|| UNIX_EPOCH + Duration::from_millis(ctx.deadline));

        InvocationContext {
            request_id: ctx.request_id.clone(),
            log_stream_name: ctx.env_config.log_stream.clone(),
            deadline,
        }
    }
}
