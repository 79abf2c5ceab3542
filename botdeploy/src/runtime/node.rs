//! JavaScript runtime

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::info;

use crate::errors::DeployError;
use crate::filesys::dir::Dir;
use crate::runtime::{copy_bot, eject_template, run_command, BotProject, RuntimeTemplate};
use crate::storage::layout::DIALOGS_DIR;

#[derive(Debug, Clone)]
pub struct NodeRuntime {
    template_dir: PathBuf,
}

impl NodeRuntime {
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
        }
    }
}

#[async_trait]
impl RuntimeTemplate for NodeRuntime {
    fn name(&self) -> &str {
        "node"
    }

    async fn build(&self, runtime_path: &Path, project: &BotProject) -> Result<(), DeployError> {
        info!("Building node runtime for {}", project.name);
        run_command("npm", &["install"], runtime_path).await?;
        run_command("npm", &["run", "build"], runtime_path).await
    }

    async fn run(&self, runtime_path: &Path, project: &BotProject, port: u16) -> Result<Child, DeployError> {
        info!("Starting {} on port {}", project.name, port);
        Command::new("npm")
            .args(["start", "--", "--port", &port.to_string()])
            .env("PORT", port.to_string())
            .env("BOT_PATH", &project.dir)
            .current_dir(runtime_path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DeployError::BuildError(format!("Failed to run npm: {}", e)))
    }

    async fn build_deploy(
        &self,
        runtime_path: &Path,
        project: &BotProject,
        profile: &str,
    ) -> Result<PathBuf, DeployError> {
        info!("Packaging node runtime for {} ({})", project.name, profile);
        self.build(runtime_path, project).await?;

        let runtime = Dir::new(runtime_path);
        copy_bot(project, &runtime.subdir(DIALOGS_DIR)).await?;
        Ok(runtime_path.to_path_buf())
    }

    async fn eject(&self, _project: &BotProject, dest: &Path) -> Result<PathBuf, DeployError> {
        eject_template(&self.template_dir, dest).await
    }
}
