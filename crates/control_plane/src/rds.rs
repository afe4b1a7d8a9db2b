use crate::{ControlPlaneError, DatabaseControlPlane, DbResourceId};
use async_trait::async_trait;
use aws_sdk_rds::operation::describe_db_instances::DescribeDbInstancesOutput;
use aws_sdk_rds::operation::modify_db_instance::ModifyDbInstanceOutput;
use aws_sdk_rds::types::DbInstance;
use lambda_runtime::tracing;

const AVAILABLE: &str = "available";

pub struct RdsControlPlane {
    rds_client: aws_sdk_rds::Client,
}

impl RdsControlPlane {
    pub fn new(rds_client: aws_sdk_rds::Client) -> Self {
        RdsControlPlane { rds_client }
    }
}

#[async_trait]
impl DatabaseControlPlane for RdsControlPlane {
    async fn enable_iam_auth(&self, instance_id: &str) -> Result<DbResourceId, ControlPlaneError> {
        // Modifying to the current value is accepted, which keeps this idempotent
        let output: ModifyDbInstanceOutput = self
            .rds_client
            .modify_db_instance()
            .db_instance_identifier(instance_id)
            .enable_iam_database_authentication(true)
            .apply_immediately(true)
            .send()
            .await
            .map_err(|err| ControlPlaneError::from_sdk("ModifyDBInstance", err))?;

        tracing::info!(instance_id, "RDS modify response: {:?}", output);

        let resource_id: &str = output
            .db_instance()
            .and_then(DbInstance::dbi_resource_id)
            .ok_or_else(|| {
                ControlPlaneError::new(
                    "ModifyDBInstance",
                    format!("no resource id returned for instance {instance_id}"),
                )
            })?;

        tracing::info!(instance_id, "DB resource id: {resource_id}");

        Ok(DbResourceId(resource_id.to_string()))
    }

    async fn iam_auth_ready(&self, instance_id: &str) -> Result<bool, ControlPlaneError> {
        let output: DescribeDbInstancesOutput = self
            .rds_client
            .describe_db_instances()
            .db_instance_identifier(instance_id)
            .send()
            .await
            .map_err(|err| ControlPlaneError::from_sdk("DescribeDBInstances", err))?;

        let instance: &DbInstance = output.db_instances().first().ok_or_else(|| {
            ControlPlaneError::new(
                "DescribeDBInstances",
                format!("instance {instance_id} not found"),
            )
        })?;

        Ok(is_ready(instance))
    }
}

fn is_ready(instance: &DbInstance) -> bool {
    let available: bool = instance.db_instance_status() == Some(AVAILABLE);
    let enabled: bool = instance.iam_database_authentication_enabled() == Some(true);
    let pending: bool = instance
        .pending_modified_values()
        .and_then(|pending| pending.iam_database_authentication_enabled())
        .is_some();

    available && enabled && !pending
}
