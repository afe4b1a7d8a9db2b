use async_trait::async_trait;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_types::error::display::DisplayErrorContext;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use std::fmt::{Debug, Display, Formatter};
use thiserror::Error;

pub mod codebuild;
pub mod rds;

pub use codebuild::CodeBuildTrigger;
pub use rds::RdsControlPlane;

/// Stable identifier of a database instance, independent of its hostname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbResourceId(pub String);

impl Display for DbResourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a started build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildId(pub String);

impl Display for BuildId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Administrative operations on a managed database instance.
#[async_trait]
pub trait DatabaseControlPlane: Send + Sync {
    /// Turn on IAM authentication, applied immediately.
    /// Succeeds when it is already enabled.
    async fn enable_iam_auth(&self, instance_id: &str) -> Result<DbResourceId, ControlPlaneError>;

    /// Whether the instance is available with IAM authentication in effect.
    async fn iam_auth_ready(&self, instance_id: &str) -> Result<bool, ControlPlaneError>;
}

/// Starts build jobs without waiting for them to finish.
#[async_trait]
pub trait BuildTrigger: Send + Sync {
    async fn start_build(&self, project_name: &str) -> Result<BuildId, ControlPlaneError>;
}

/// A control-plane call failed. Displays as the service's own message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ControlPlaneError {
    pub operation: &'static str,
    pub message: String,
}

impl ControlPlaneError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        ControlPlaneError {
            operation,
            message: message.into(),
        }
    }

    pub(crate) fn from_sdk<E, R>(operation: &'static str, err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: Debug,
    {
        let message: String = match err.as_service_error().and_then(|service| service.message()) {
            Some(message) => message.to_string(),
            None => DisplayErrorContext(&err).to_string(),
        };

        ControlPlaneError::new(operation, message)
    }
}
