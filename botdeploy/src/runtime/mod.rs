//! Runtime templates
//!
//! A runtime is the host application a bot's dialogs are packaged with. Each
//! flavor knows how to build it locally, run it, produce a deployable
//! artifact and eject a copy of its template into a bot project.

pub mod dotnet;
pub mod node;

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::debug;

use crate::errors::DeployError;
use crate::filesys::dir::Dir;

pub use dotnet::DotnetRuntime;
pub use node::NodeRuntime;

/// Directory a runtime is ejected into, relative to the destination
pub const RUNTIME_DIR: &str = "runtime";

/// A bot project to build and deploy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotProject {
    pub id: String,
    pub name: String,
    /// Directory holding the bot's dialogs, LU files and settings
    pub dir: PathBuf,
}

impl BotProject {
    pub fn new(id: impl Into<String>, name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            dir: dir.into(),
        }
    }
}

/// Host application template
#[async_trait]
pub trait RuntimeTemplate: Send + Sync {
    fn name(&self) -> &str;

    /// Build the runtime for local use
    async fn build(&self, runtime_path: &Path, project: &BotProject) -> Result<(), DeployError>;

    /// Start the built runtime serving `project` on `port`
    async fn run(&self, runtime_path: &Path, project: &BotProject, port: u16) -> Result<Child, DeployError>;

    /// Produce the deployable artifact directory; the bot is copied into its `ComposerDialogs` folder
    async fn build_deploy(
        &self,
        runtime_path: &Path,
        project: &BotProject,
        profile: &str,
    ) -> Result<PathBuf, DeployError>;

    /// Copy the runtime template into `dest/runtime`
    async fn eject(&self, project: &BotProject, dest: &Path) -> Result<PathBuf, DeployError>;
}

/// Runtime for a flavor name
pub fn runtime_for(kind: &str, template_dir: impl Into<PathBuf>) -> Result<Arc<dyn RuntimeTemplate>, DeployError> {
    let runtime: Arc<dyn RuntimeTemplate> = match kind {
        "dotnet" | "csharp" => Arc::new(DotnetRuntime::new(template_dir)),
        "node" | "js" | "javascript" => Arc::new(NodeRuntime::new(template_dir)),
        other => {
            return Err(DeployError::ConfigError(format!(
                "Unknown runtime: {}",
                other
            )))
        }
    };
    Ok(runtime)
}

/// Run a command to completion, failing with its stderr
pub(crate) async fn run_command(program: &str, args: &[&str], cwd: &Path) -> Result<(), DeployError> {
    debug!("Running {} {} in {}", program, args.join(" "), cwd.display());
    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| DeployError::BuildError(format!("Failed to run {}: {}", program, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let detail = if stderr.trim().is_empty() { stdout } else { stderr };
        return Err(DeployError::BuildError(format!(
            "{} {} failed: {}",
            program,
            args.join(" "),
            detail.trim()
        )));
    }
    Ok(())
}

/// Replace `dest` with a copy of the bot's files
pub(crate) async fn copy_bot(project: &BotProject, dest: &Dir) -> Result<u64, DeployError> {
    if dest.exists().await {
        dest.delete().await?;
    }
    dest.create().await?;
    Dir::new(&project.dir).copy_to(dest).await
}

/// Copy a template directory into `dest/runtime`, refusing to overwrite
pub(crate) async fn eject_template(template_dir: &Path, dest: &Path) -> Result<PathBuf, DeployError> {
    let target = Dir::new(dest.join(RUNTIME_DIR));
    if target.exists().await {
        return Err(DeployError::ConfigError(format!(
            "{} already exists, remove it to eject again",
            target.path().display()
        )));
    }

    let template = Dir::new(template_dir);
    if !template.exists().await {
        return Err(DeployError::ConfigError(format!(
            "Runtime template not found at {}",
            template_dir.display()
        )));
    }

    target.create().await?;
    template.copy_to(&target).await?;
    Ok(target.path().to_path_buf())
}
