//! Packages a build output directory into a zip archive

use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::errors::DeployError;
use crate::filesys::dir::Dir;
use crate::utils::sha256_hash;

/// Result of packaging
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    pub entries: usize,
    pub sha256: String,
}

/// Zip every file below `source` into `out` at maximum compression.
///
/// The archive never contains itself, even when `out` lies inside `source`.
/// Returns once the archive is finished and synced to disk.
pub async fn zip_directory(source: &Path, out: &Path) -> Result<ArchiveSummary, DeployError> {
    let files = Dir::new(source).walk_files().await?;
    let source_path = source.to_path_buf();
    let out_path = out.to_path_buf();
    let count = tokio::task::spawn_blocking(move || {
        let entries = archive_entries(&source_path, &out_path, files)?;
        write_archive(&out_path, &entries)?;
        Ok::<_, DeployError>(entries.len())
    })
    .await??;

    let bytes = tokio::fs::read(out).await?;
    let summary = ArchiveSummary {
        path: out.to_path_buf(),
        entries: count,
        sha256: sha256_hash(&bytes),
    };
    debug!("Packaged {} files into {}", count, out.display());
    Ok(summary)
}

// Pairs of file path and entry name, leaving out the archive itself
fn archive_entries(
    source: &Path,
    out: &Path,
    files: Vec<PathBuf>,
) -> Result<Vec<(PathBuf, String)>, DeployError> {
    let out_canonical = canonical_target(out)?;
    let out_name = out.file_name().map(PathBuf::from);

    let mut entries = Vec::with_capacity(files.len());
    for file in files {
        let relative = file
            .strip_prefix(source)
            .map_err(|e| DeployError::Internal(e.to_string()))?
            .to_path_buf();

        if Some(&relative) == out_name.as_ref() {
            continue;
        }
        if fs::canonicalize(&file).ok().as_ref() == Some(&out_canonical) {
            continue;
        }
        entries.push((file, entry_name(&relative)));
    }
    Ok(entries)
}

fn write_archive(out: &Path, entries: &[(PathBuf, String)]) -> Result<(), DeployError> {
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = fs::File::create(out)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));

    for (path, name) in entries {
        zip.start_file(name.as_str(), options)?;
        let mut input = fs::File::open(path)?;
        io::copy(&mut input, &mut zip)?;
    }

    let mut file = zip.finish()?;
    file.flush()?;
    file.sync_all()?;
    Ok(())
}

// The output does not exist yet, so resolve its parent instead
fn canonical_target(out: &Path) -> Result<PathBuf, DeployError> {
    let parent = match out.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;
    let name = out
        .file_name()
        .ok_or_else(|| DeployError::ConfigError(format!("Invalid archive path: {}", out.display())))?;
    Ok(fs::canonicalize(parent)?.join(name))
}

// Archive entries always use forward slashes
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
