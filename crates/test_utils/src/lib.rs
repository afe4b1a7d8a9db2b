use async_trait::async_trait;
use control_plane::{
    BuildId, BuildTrigger, ControlPlaneError, DatabaseControlPlane, DbResourceId,
};
use model::config::{DatabaseConfig, InvocationBudget, SettlePolicy};
use model::{LifecycleEvent, RequestType};
use notifier::{HttpOutcome, Transport, TransportError};
use serde_json::{Value, json};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

mod database;
mod logs;

pub use database::{DatabaseState, FakeConnector, FakeDatabase, FakeExecutor};
pub use logs::LogCapture;

/// Test correlation values
pub const TEST_RESPONSE_URL: &str =
    "https://cloudformation-custom-resource-response.s3.amazonaws.com/stack?X-Amz-Signature=abc123";
pub const TEST_STACK_ID: &str = "arn:aws:cloudformation:ap-southeast-2:123456789012:stack/ghost/1";
pub const TEST_REQUEST_ID: &str = "5d478078-13e9-baf0-464a-7ef285ecc786";
pub const TEST_PHYSICAL_ID: &str = "2024/01/01/[$LATEST]0123456789abcdef";
pub const TEST_PASSWORD: &str = "s3cr3t-Pa55w0rd";
pub const TEST_RESOURCE_ID: &str = "db-ABCDEFGHIJKLMNOP";

/// Build an event with the given properties, as the orchestrator would send it.
pub fn lifecycle_event(
    request_type: RequestType,
    logical_resource_id: &str,
    properties: Value,
) -> LifecycleEvent {
    let mut event: Value = json!({
        "RequestType": request_type,
        "ResponseURL": TEST_RESPONSE_URL,
        "StackId": TEST_STACK_ID,
        "RequestId": TEST_REQUEST_ID,
        "LogicalResourceId": logical_resource_id,
        "ResourceProperties": properties,
    });

    if request_type != RequestType::Create {
        event["PhysicalResourceId"] = json!(TEST_PHYSICAL_ID);
    }

    serde_json::from_value(event).expect("Test event should parse")
}

/// Event for the database initialisation resource, carrying the admin password.
pub fn database_event(request_type: RequestType) -> LifecycleEvent {
    lifecycle_event(
        request_type,
        "DBInit",
        json!({ "Password": TEST_PASSWORD, "DBHost": "ghost.abc.rds.amazonaws.com" }),
    )
}

/// Event for the build trigger resource.
pub fn build_event(request_type: RequestType, project_name: &str) -> LifecycleEvent {
    lifecycle_event(
        request_type,
        "CodeBuildInit",
        json!({ "ProjectName": project_name }),
    )
}

/// A database configuration with a short fixed settle delay.
pub fn test_database_config() -> DatabaseConfig {
    DatabaseConfig {
        host: "ghost.abc.rds.amazonaws.com".to_string(),
        port: 3306,
        admin_user: "root".to_string(),
        database_name: "ghost".to_string(),
        instance_id: "ghost-db".to_string(),
        region: "ap-southeast-2".to_string(),
        principal: "ghost".to_string(),
        settle: SettlePolicy::FixedDelay(Duration::from_secs(90)),
        budget: InvocationBudget::default(),
    }
}

/// A single PUT seen by the [`RecordingTransport`].
#[derive(Debug, Clone)]
pub struct RecordedPut {
    pub url: String,
    pub body: String,
}

impl RecordedPut {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("Response body should be JSON")
    }
}

/// Transport which records every response instead of sending it.
#[derive(Default)]
pub struct RecordingTransport {
    puts: Mutex<Vec<RecordedPut>>,
    fail_with: Option<String>,
}

impl RecordingTransport {
    /// A transport whose every attempt fails with a request error.
    pub fn failing(message: &str) -> Self {
        RecordingTransport {
            puts: Mutex::default(),
            fail_with: Some(message.to_string()),
        }
    }

    pub fn puts(&self) -> Vec<RecordedPut> {
        self.puts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn put(&self, url: &str, body: String) -> Result<HttpOutcome, TransportError> {
        self.puts.lock().unwrap().push(RecordedPut {
            url: url.to_string(),
            body,
        });

        match &self.fail_with {
            Some(message) => Err(TransportError::Request(message.clone())),
            None => Ok(HttpOutcome {
                status: 200,
                reason: "OK".to_string(),
            }),
        }
    }
}

/// Control plane returning canned results and counting calls.
pub struct FakeControlPlane {
    enable_result: Result<String, String>,
    // Number of readiness checks answered `false` before reporting ready
    not_ready_checks: usize,
    enable_calls: AtomicUsize,
    ready_calls: AtomicUsize,
}

impl FakeControlPlane {
    pub fn succeeding(resource_id: &str) -> Self {
        Self::with_result(Ok(resource_id.to_string()))
    }

    pub fn failing(message: &str) -> Self {
        Self::with_result(Err(message.to_string()))
    }

    fn with_result(enable_result: Result<String, String>) -> Self {
        FakeControlPlane {
            enable_result,
            not_ready_checks: 0,
            enable_calls: AtomicUsize::new(0),
            ready_calls: AtomicUsize::new(0),
        }
    }

    /// Report not ready for the first `checks` readiness checks.
    pub fn ready_after(mut self, checks: usize) -> Self {
        self.not_ready_checks = checks;
        self
    }

    pub fn enable_calls(&self) -> usize {
        self.enable_calls.load(Ordering::SeqCst)
    }

    pub fn ready_calls(&self) -> usize {
        self.ready_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseControlPlane for FakeControlPlane {
    async fn enable_iam_auth(&self, _instance_id: &str) -> Result<DbResourceId, ControlPlaneError> {
        self.enable_calls.fetch_add(1, Ordering::SeqCst);

        self.enable_result
            .clone()
            .map(DbResourceId)
            .map_err(|message| ControlPlaneError::new("ModifyDBInstance", message))
    }

    async fn iam_auth_ready(&self, _instance_id: &str) -> Result<bool, ControlPlaneError> {
        let previous: usize = self.ready_calls.fetch_add(1, Ordering::SeqCst);

        Ok(previous >= self.not_ready_checks)
    }
}

/// Build trigger recording requested projects.
#[derive(Default)]
pub struct FakeBuildTrigger {
    projects: Mutex<Vec<String>>,
    fail_with: Option<String>,
}

impl FakeBuildTrigger {
    pub fn failing(message: &str) -> Self {
        FakeBuildTrigger {
            projects: Mutex::default(),
            fail_with: Some(message.to_string()),
        }
    }

    pub fn projects(&self) -> Vec<String> {
        self.projects.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildTrigger for FakeBuildTrigger {
    async fn start_build(&self, project_name: &str) -> Result<BuildId, ControlPlaneError> {
        self.projects.lock().unwrap().push(project_name.to_string());

        match &self.fail_with {
            Some(message) => Err(ControlPlaneError::new("StartBuild", message.clone())),
            None => Ok(BuildId(format!("{project_name}:0001"))),
        }
    }
}
