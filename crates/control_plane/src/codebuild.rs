use crate::{BuildId, BuildTrigger, ControlPlaneError};
use async_trait::async_trait;
use aws_sdk_codebuild::operation::start_build::StartBuildOutput;
use lambda_runtime::tracing;

pub struct CodeBuildTrigger {
    codebuild_client: aws_sdk_codebuild::Client,
}

impl CodeBuildTrigger {
    pub fn new(codebuild_client: aws_sdk_codebuild::Client) -> Self {
        CodeBuildTrigger { codebuild_client }
    }
}

#[async_trait]
impl BuildTrigger for CodeBuildTrigger {
    async fn start_build(&self, project_name: &str) -> Result<BuildId, ControlPlaneError> {
        let output: StartBuildOutput = self
            .codebuild_client
            .start_build()
            .project_name(project_name)
            .send()
            .await
            .map_err(|err| ControlPlaneError::from_sdk("StartBuild", err))?;

        tracing::info!(project_name, "CodeBuild response: {:?}", output);

        // The build keeps running after we return
        let build_id: &str = output
            .build_value()
            .and_then(|build| build.id())
            .ok_or_else(|| {
                ControlPlaneError::new(
                    "StartBuild",
                    format!("no build id returned for project {project_name}"),
                )
            })?;

        Ok(BuildId(build_id.to_string()))
    }
}
