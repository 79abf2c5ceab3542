//! File operations

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::errors::DeployError;

/// A file wrapper with path
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    /// Create a new file reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the file exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path).await.is_ok()
    }

    /// Size in bytes
    pub async fn size(&self) -> Result<u64, DeployError> {
        Ok(fs::metadata(&self.path).await?.len())
    }

    /// Read file contents as string
    pub async fn read_string(&self) -> Result<String, DeployError> {
        let mut file = fs::File::open(&self.path).await?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).await?;
        Ok(contents)
    }

    /// Read file as JSON
    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, DeployError> {
        let contents = self.read_string().await?;
        // Settings files written by editors on Windows often carry a BOM
        let value = serde_json::from_str(contents.trim_start_matches('\u{feff}'))?;
        Ok(value)
    }

    /// Write string to file
    pub async fn write_string(&self, contents: &str) -> Result<(), DeployError> {
        self.write_bytes(contents.as_bytes()).await
    }

    /// Write bytes to file
    pub async fn write_bytes(&self, contents: &[u8]) -> Result<(), DeployError> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&self.path).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        Ok(())
    }

    /// Write JSON to file with 4-space indentation
    pub async fn write_json<T: Serialize>(&self, value: &T) -> Result<(), DeployError> {
        let contents = to_json_indented(value)?;
        self.write_bytes(&contents).await
    }

    /// Delete the file
    pub async fn delete(&self) -> Result<(), DeployError> {
        if self.exists().await {
            fs::remove_file(&self.path).await?;
        }
        Ok(())
    }
}

/// Serialize with the 4-space indentation used by the settings files
pub fn to_json_indented<T: Serialize>(value: &T) -> Result<Vec<u8>, DeployError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    buf.push(b'\n');
    Ok(buf)
}
