//! Directory operations

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::warn;
use walkdir::WalkDir;

use crate::errors::DeployError;
use crate::filesys::file::File;

/// A directory wrapper with path
#[derive(Debug, Clone)]
pub struct Dir {
    path: PathBuf,
}

impl Dir {
    /// Create a new directory reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the directory exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Create the directory (and parents)
    pub async fn create(&self) -> Result<(), DeployError> {
        fs::create_dir_all(&self.path).await?;
        Ok(())
    }

    /// Delete the directory and all contents
    pub async fn delete(&self) -> Result<(), DeployError> {
        if self.exists().await {
            fs::remove_dir_all(&self.path).await?;
        }
        Ok(())
    }

    /// Every file below this directory, depth first in file-name order.
    ///
    /// Links to files are listed under their link path. Linked directories
    /// are not descended into and broken links are skipped, both with a warning.
    pub async fn walk_files(&self) -> Result<Vec<PathBuf>, DeployError> {
        let root = self.path.clone();
        tokio::task::spawn_blocking(move || walk_tree(&root)).await?
    }

    /// Copy everything below this directory into `dest`, overwriting files
    pub async fn copy_to(&self, dest: &Dir) -> Result<u64, DeployError> {
        let mut copied = 0;
        for file in self.walk_files().await? {
            let relative = file
                .strip_prefix(&self.path)
                .map_err(|e| DeployError::Internal(e.to_string()))?;
            let target = dest.path.join(relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::copy(&file, &target).await?;
            copied += 1;
        }
        Ok(copied)
    }

    /// Get a file within this directory
    pub fn file(&self, name: &str) -> File {
        File::new(self.path.join(name))
    }

    /// Get a subdirectory
    pub fn subdir(&self, name: &str) -> Dir {
        Dir::new(self.path.join(name))
    }

    /// Create a temporary directory
    pub async fn create_temp_dir(prefix: &str) -> Result<Dir, DeployError> {
        let temp_dir = std::env::temp_dir().join(format!("{}-{}", prefix, uuid::Uuid::new_v4()));
        fs::create_dir_all(&temp_dir).await?;
        Ok(Dir::new(temp_dir))
    }
}

fn walk_tree(root: &Path) -> Result<Vec<PathBuf>, DeployError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        let file_type = entry.file_type();
        if file_type.is_file() {
            files.push(entry.into_path());
        } else if file_type.is_symlink() {
            match std::fs::metadata(entry.path()) {
                Ok(meta) if meta.is_file() => files.push(entry.into_path()),
                Ok(_) => warn!("Not following linked directory {}", entry.path().display()),
                Err(e) => warn!("Skipping broken link {}: {}", entry.path().display(), e),
            }
        }
    }
    Ok(files)
}
