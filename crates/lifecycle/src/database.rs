use crate::handler::{HandlerError, HandlerOutput, ResourceHandler, Secrets};
use crate::settle;
use async_trait::async_trait;
use control_plane::{DatabaseControlPlane, DbResourceId};
use lambda_runtime::tracing;
use model::config::{DatabaseConfig, SettlePolicy};
use model::{LifecycleEvent, SecretValue};
use provisioner::{Connector, PrincipalName, ProvisionError, StatementExecutor};
use std::sync::Arc;

/// Resource property carrying the admin password.
pub const PASSWORD_PROPERTY: &str = "Password";
/// Exported attribute holding the instance's resource id.
pub const DB_RESOURCE_ID_KEY: &str = "db_resource_id";

/// Turns on IAM authentication for an instance and provisions the
/// application principal inside it.
pub struct DatabaseInitHandler {
    control_plane: Arc<dyn DatabaseControlPlane>,
    connector: Arc<dyn Connector>,
    instance_id: String,
    principal: PrincipalName,
    settle: SettlePolicy,
}

impl DatabaseInitHandler {
    pub fn new(
        config: &DatabaseConfig,
        control_plane: Arc<dyn DatabaseControlPlane>,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, ProvisionError> {
        Ok(DatabaseInitHandler {
            control_plane,
            connector,
            instance_id: config.instance_id.clone(),
            principal: PrincipalName::parse(&config.principal)?,
            settle: config.settle,
        })
    }

    async fn initialise(&self, secrets: &Secrets) -> Result<HandlerOutput, HandlerError> {
        let password: &SecretValue = secrets
            .get(PASSWORD_PROPERTY)
            .filter(|password: &&SecretValue| !password.expose().is_empty())
            .ok_or(HandlerError::MissingProperty(PASSWORD_PROPERTY))?;

        let resource_id: DbResourceId = self
            .control_plane
            .enable_iam_auth(&self.instance_id)
            .await?;
        tracing::info!("IAM authentication requested for {resource_id}");

        settle::await_propagation(&self.settle, self.control_plane.as_ref(), &self.instance_id)
            .await;

        let mut connection: Box<dyn StatementExecutor> = self.connector.connect(password).await?;
        let provisioned: Result<(), ProvisionError> =
            provisioner::provision(connection.as_mut(), &self.principal).await;

        if let Err(err) = connection.close().await {
            tracing::warn!("Failed to close database connection: {err}");
        }
        provisioned?;

        Ok(HandlerOutput::with_data(DB_RESOURCE_ID_KEY, resource_id.0))
    }
}

#[async_trait]
impl ResourceHandler for DatabaseInitHandler {
    fn name(&self) -> &'static str {
        "init_db"
    }

    fn secret_properties(&self) -> &'static [&'static str] {
        &[PASSWORD_PROPERTY]
    }

    async fn create(
        &self,
        _event: &LifecycleEvent,
        secrets: &Secrets,
    ) -> Result<HandlerOutput, HandlerError> {
        self.initialise(secrets).await
    }

    // Every step is idempotent, so Update simply runs them again
    async fn update(
        &self,
        _event: &LifecycleEvent,
        secrets: &Secrets,
    ) -> Result<HandlerOutput, HandlerError> {
        self.initialise(secrets).await
    }
}
