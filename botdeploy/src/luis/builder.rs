//! LU model builder
//!
//! Building LU files into LUIS applications is delegated to the `bf` command
//! line tool. [`BfCliLuBuilder`] stages the loaded sources in a temporary
//! directory, runs `bf luis:build` into a second one and copies the generated
//! dialog assets (including the `luis.settings.*.json` files) into the bot.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::DeployError;
use crate::filesys::dir::Dir;

/// One LU source file
#[derive(Debug, Clone, PartialEq)]
pub struct LuFile {
    /// File name, unique within a build
    pub name: String,
    pub content: String,
}

/// Loaded sources of one build
#[derive(Debug, Clone, PartialEq)]
pub struct LuContents {
    pub culture: String,
    pub suffix: String,
    pub region: String,
    pub files: Vec<LuFile>,
}

/// Output of a build, not yet written to the bot
#[derive(Debug, Clone)]
pub struct LuBuildResult {
    /// Temporary directory holding the generated assets
    pub staging: Dir,
    /// Generated files, relative to `staging`
    pub assets: Vec<PathBuf>,
}

impl LuBuildResult {
    /// Remove the staging directory once the assets are written
    pub async fn discard(&self) -> Result<(), DeployError> {
        self.staging.delete().await
    }
}

/// Builds LU sources into LUIS applications
#[async_trait]
pub trait LuBuilder: Send + Sync {
    async fn load_contents(
        &self,
        files: &[PathBuf],
        culture: &str,
        suffix: &str,
        region: &str,
    ) -> Result<LuContents, DeployError>;

    async fn build(
        &self,
        contents: &LuContents,
        authoring_key: &str,
        authoring_endpoint: &str,
        bot_name: &str,
        suffix: &str,
        culture: &str,
    ) -> Result<LuBuildResult, DeployError>;

    /// Write generated assets into `out_dir`; existing files are kept unless `force`
    async fn write_dialog_assets(
        &self,
        result: &LuBuildResult,
        force: bool,
        out_dir: &Dir,
    ) -> Result<Vec<PathBuf>, DeployError>;
}

/// [`LuBuilder`] running `bf luis:build`
#[derive(Debug, Clone)]
pub struct BfCliLuBuilder {
    program: String,
}

impl Default for BfCliLuBuilder {
    fn default() -> Self {
        Self::new("bf")
    }
}

impl BfCliLuBuilder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run_luis_build(
        &self,
        contents: &LuContents,
        input: &Dir,
        output: &Dir,
        args: &[&str],
    ) -> Result<(), DeployError> {
        for file in &contents.files {
            input.file(&file.name).write_string(&file.content).await?;
        }

        let result = Command::new(&self.program)
            .arg("luis:build")
            .arg("--in")
            .arg(input.path())
            .arg("--out")
            .arg(output.path())
            .args(args)
            .args(["--region", &contents.region])
            .args(["--dialog", "multiLanguage", "--force", "--log"])
            .output()
            .await
            .map_err(|e| DeployError::BuildError(format!("Failed to run {}: {}", self.program, e)))?;

        debug!("luis:build stdout: {}", String::from_utf8_lossy(&result.stdout));
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(DeployError::BuildError(format!(
                "luis:build failed: {}",
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl LuBuilder for BfCliLuBuilder {
    async fn load_contents(
        &self,
        files: &[PathBuf],
        culture: &str,
        suffix: &str,
        region: &str,
    ) -> Result<LuContents, DeployError> {
        let mut loaded = Vec::with_capacity(files.len());
        for path in files {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| DeployError::BuildError(format!("Not a file: {}", path.display())))?;
            let content = tokio::fs::read_to_string(path).await?;
            loaded.push(LuFile { name, content });
        }

        Ok(LuContents {
            culture: culture.to_string(),
            suffix: suffix.to_string(),
            region: region.to_string(),
            files: loaded,
        })
    }

    async fn build(
        &self,
        contents: &LuContents,
        authoring_key: &str,
        authoring_endpoint: &str,
        bot_name: &str,
        suffix: &str,
        culture: &str,
    ) -> Result<LuBuildResult, DeployError> {
        let input = Dir::create_temp_dir("botdeploy-lu-in").await?;
        let output = Dir::create_temp_dir("botdeploy-lu").await?;

        info!(
            "Building {} LU files for {} ({}, suffix {})",
            contents.files.len(),
            bot_name,
            culture,
            suffix
        );
        let outcome = self
            .run_luis_build(
                contents,
                &input,
                &output,
                &[
                    "--authoringKey",
                    authoring_key,
                    "--endpoint",
                    authoring_endpoint,
                    "--botName",
                    bot_name,
                    "--suffix",
                    suffix,
                    "--culture",
                    culture,
                ],
            )
            .await;
        input.delete().await?;
        if let Err(e) = outcome {
            output.delete().await?;
            return Err(e);
        }

        let assets = output
            .walk_files()
            .await?
            .into_iter()
            .filter_map(|p| p.strip_prefix(output.path()).ok().map(Path::to_path_buf))
            .collect();

        Ok(LuBuildResult {
            staging: output,
            assets,
        })
    }

    async fn write_dialog_assets(
        &self,
        result: &LuBuildResult,
        force: bool,
        out_dir: &Dir,
    ) -> Result<Vec<PathBuf>, DeployError> {
        out_dir.create().await?;

        let mut written = Vec::new();
        for asset in &result.assets {
            let source = result.staging.path().join(asset);
            let target = out_dir.path().join(asset);
            if !force && tokio::fs::try_exists(&target).await? {
                debug!("Keeping existing {}", target.display());
                continue;
            }
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::copy(&source, &target).await?;
            written.push(target);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_contents_reads_files() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("main.en-us.lu");
        tokio::fs::write(&path, "# Greeting\n- hi").await.unwrap();

        let builder = BfCliLuBuilder::default();
        let contents = builder
            .load_contents(&[path], "en-us", "dev", "westus")
            .await
            .unwrap();

        assert_eq!(contents.files.len(), 1);
        assert_eq!(contents.files[0].name, "main.en-us.lu");
        assert_eq!(contents.region, "westus");
    }

    #[tokio::test]
    async fn test_write_dialog_assets_respects_force() {
        let staging = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let staging_dir = Dir::new(staging.path());
        staging_dir
            .file("luis.settings.dev.westus.json")
            .write_string("{\"luis\":{}}")
            .await
            .unwrap();
        let out_dir = Dir::new(out.path());
        out_dir
            .file("luis.settings.dev.westus.json")
            .write_string("old")
            .await
            .unwrap();

        let result = LuBuildResult {
            staging: staging_dir,
            assets: vec![PathBuf::from("luis.settings.dev.westus.json")],
        };
        let builder = BfCliLuBuilder::default();

        let written = builder.write_dialog_assets(&result, false, &out_dir).await.unwrap();
        assert!(written.is_empty());

        let written = builder.write_dialog_assets(&result, true, &out_dir).await.unwrap();
        assert_eq!(written.len(), 1);
        let content = out_dir
            .file("luis.settings.dev.westus.json")
            .read_string()
            .await
            .unwrap();
        assert_eq!(content, "{\"luis\":{}}");
    }
}
