//! Project layout: where a bot runtime project keeps its deployment files

use std::path::{Path, PathBuf};

use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Archive produced by the packager
pub const ARCHIVE_FILE: &str = "code.zip";
/// Deployment settings file
pub const SETTINGS_FILE: &str = "appsettings.deployment.json";
/// Infrastructure template used by `create`
pub const TEMPLATE_FILE: &str = "template-with-preexisting-rg.json";
/// Folder holding the declarative bot assets inside a build
pub const DIALOGS_DIR: &str = "ComposerDialogs";
/// Folder the LUIS build writes its generated assets to
pub const GENERATED_DIR: &str = "generated";

/// Paths used by one deployment, derived from the project directory unless overridden
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    /// Runtime project directory
    pub project_dir: PathBuf,

    zip_path: Option<PathBuf>,
    settings_path: Option<PathBuf>,
    template_path: Option<PathBuf>,
}

impl ProjectLayout {
    /// Create a new layout rooted at the project directory
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            zip_path: None,
            settings_path: None,
            template_path: None,
        }
    }

    pub fn with_zip_path(mut self, path: Option<PathBuf>) -> Self {
        self.zip_path = path;
        self
    }

    pub fn with_settings_path(mut self, path: Option<PathBuf>) -> Self {
        self.settings_path = path;
        self
    }

    pub fn with_template_path(mut self, path: Option<PathBuf>) -> Self {
        self.template_path = path;
        self
    }

    pub fn project(&self) -> Dir {
        Dir::new(&self.project_dir)
    }

    /// Get the archive file
    pub fn zip_file(&self) -> File {
        File::new(
            self.zip_path
                .clone()
                .unwrap_or_else(|| self.project_dir.join(ARCHIVE_FILE)),
        )
    }

    /// Get the deployment settings file
    pub fn settings_file(&self) -> File {
        File::new(
            self.settings_path
                .clone()
                .unwrap_or_else(|| self.project_dir.join(SETTINGS_FILE)),
        )
    }

    /// Get the infrastructure template file
    pub fn template_file(&self) -> File {
        File::new(self.template_path.clone().unwrap_or_else(|| {
            self.project_dir
                .join("DeploymentTemplates")
                .join(TEMPLATE_FILE)
        }))
    }

    /// Dialog folder inside a build artifact
    pub fn dialogs_dir(artifact: &Path) -> Dir {
        Dir::new(artifact.join(DIALOGS_DIR))
    }
}
