//! C# runtime

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::info;

use crate::errors::DeployError;
use crate::filesys::dir::Dir;
use crate::runtime::{copy_bot, eject_template, run_command, BotProject, RuntimeTemplate};
use crate::storage::layout::DIALOGS_DIR;

/// Publish output, relative to the runtime
pub const PUBLISH_DIR: &str = "bin/Release/netcoreapp3.1";

const DEPLOYMENT_FILE: &str = ".deployment";
const DEPLOYMENT_CONFIG: &str = "[config]\nSCM_DO_BUILD_DURING_DEPLOYMENT=false\n";

#[derive(Debug, Clone)]
pub struct DotnetRuntime {
    template_dir: PathBuf,
}

impl DotnetRuntime {
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
        }
    }
}

#[async_trait]
impl RuntimeTemplate for DotnetRuntime {
    fn name(&self) -> &str {
        "dotnet"
    }

    async fn build(&self, runtime_path: &Path, project: &BotProject) -> Result<(), DeployError> {
        info!("Building dotnet runtime for {}", project.name);
        run_command("dotnet", &["build"], runtime_path).await
    }

    async fn run(&self, runtime_path: &Path, project: &BotProject, port: u16) -> Result<Child, DeployError> {
        let urls = format!("http://0.0.0.0:{}", port);
        let bot_path = project.dir.to_string_lossy().into_owned();
        info!("Starting {} on {}", project.name, urls);

        Command::new("dotnet")
            .args(["run", "--urls", &urls, "--bot", &bot_path])
            .current_dir(runtime_path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DeployError::BuildError(format!("Failed to run dotnet: {}", e)))
    }

    async fn build_deploy(
        &self,
        runtime_path: &Path,
        project: &BotProject,
        profile: &str,
    ) -> Result<PathBuf, DeployError> {
        info!("Publishing dotnet runtime for {} ({})", project.name, profile);
        run_command(
            "dotnet",
            &["publish", "-c", "release", "-o", PUBLISH_DIR, "-v", "q"],
            runtime_path,
        )
        .await?;

        let publish = Dir::new(runtime_path.join(PUBLISH_DIR));
        let deployment = publish.file(DEPLOYMENT_FILE);
        if !deployment.exists().await {
            deployment.write_string(DEPLOYMENT_CONFIG).await?;
        }

        copy_bot(project, &publish.subdir(DIALOGS_DIR)).await?;
        Ok(publish.path().to_path_buf())
    }

    async fn eject(&self, _project: &BotProject, dest: &Path) -> Result<PathBuf, DeployError> {
        eject_template(&self.template_dir, dest).await
    }
}
