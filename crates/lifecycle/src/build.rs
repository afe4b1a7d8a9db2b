use crate::handler::{HandlerError, HandlerOutput, ResourceHandler, Secrets};
use async_trait::async_trait;
use control_plane::{BuildId, BuildTrigger};
use lambda_runtime::tracing;
use model::LifecycleEvent;
use std::sync::Arc;

/// Resource property naming the build project.
pub const PROJECT_NAME_PROPERTY: &str = "ProjectName";
/// Exported attribute holding the id of the started build.
pub const BUILD_ID_KEY: &str = "build_id";

/// Starts a build when the resource is created.
pub struct BuildTriggerHandler {
    trigger: Arc<dyn BuildTrigger>,
}

impl BuildTriggerHandler {
    pub fn new(trigger: Arc<dyn BuildTrigger>) -> Self {
        BuildTriggerHandler { trigger }
    }
}

#[async_trait]
impl ResourceHandler for BuildTriggerHandler {
    fn name(&self) -> &'static str {
        "build_trigger"
    }

    async fn create(
        &self,
        event: &LifecycleEvent,
        _secrets: &Secrets,
    ) -> Result<HandlerOutput, HandlerError> {
        let project_name: &str = event
            .property_str(PROJECT_NAME_PROPERTY)
            .filter(|name: &&str| !name.is_empty())
            .ok_or(HandlerError::MissingProperty(PROJECT_NAME_PROPERTY))?;

        let build_id: BuildId = self.trigger.start_build(project_name).await?;
        tracing::info!("Started build {build_id}");

        Ok(HandlerOutput::with_data(BUILD_ID_KEY, build_id.0))
    }

    async fn update(
        &self,
        _event: &LifecycleEvent,
        _secrets: &Secrets,
    ) -> Result<HandlerOutput, HandlerError> {
        tracing::info!("Builds are only started on Create");
        Ok(HandlerOutput::default())
    }
}
