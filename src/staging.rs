//! Transactional application of regenerated project files.
//!
//! Files are staged in a scratch directory first, then published into the
//! output root one by one. Existing files are moved to a backup area so a
//! failed publish can be rolled back to the previous tree.
use crate::error::ClientError;
use crate::update::FileSink;
use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// [`FileSink`] that writes into a project output directory.
pub struct ProjectFiles {
    output_root: PathBuf,
    scratch_parent: PathBuf,
}

impl ProjectFiles {
    pub fn new(output_root: PathBuf, scratch_parent: PathBuf) -> Self {
        Self {
            output_root,
            scratch_parent,
        }
    }

    fn apply(&self, files: &BTreeMap<String, String>) -> Result<Vec<PathBuf>> {
        for rel_path in files.keys() {
            validate_relative_path(rel_path)?;
            ensure_replaceable(&self.output_root.join(rel_path))?;
        }
        fs::create_dir_all(&self.scratch_parent)
            .with_context(|| format!("create {}", self.scratch_parent.display()))?;
        let txn = tempfile::Builder::new()
            .prefix("update-")
            .tempdir_in(&self.scratch_parent)
            .context("create staging directory")?;
        let staging_root = txn.path().join("staging");
        for (rel_path, content) in files {
            write_staged_text(&staging_root, rel_path, content)?;
        }
        fs::create_dir_all(&self.output_root)
            .with_context(|| format!("create {}", self.output_root.display()))?;
        publish_staging(&staging_root, &self.output_root)
    }
}

impl FileSink for ProjectFiles {
    fn write_files(
        &mut self,
        files: &BTreeMap<String, String>,
    ) -> crate::error::Result<Vec<PathBuf>> {
        let published = self
            .apply(files)
            .map_err(|err| ClientError::FileApply(format!("{err:#}")))?;
        for path in &published {
            tracing::debug!(path = %path.display(), "file written");
        }
        Ok(published)
    }
}

fn validate_relative_path(rel: &str) -> Result<()> {
    let path = Path::new(rel);
    let escapes = path
        .components()
        .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
    if rel.is_empty() || escapes {
        return Err(anyhow!(
            "file paths must be relative without '..' (got {rel:?})"
        ));
    }
    Ok(())
}

/// Only missing paths and regular files may be overwritten.
fn ensure_replaceable(dest: &Path) -> Result<()> {
    match fs::symlink_metadata(dest) {
        Ok(meta) if !meta.file_type().is_file() => Err(anyhow!(
            "refusing to replace {}: not a regular file",
            dest.display()
        )),
        _ => Ok(()),
    }
}

fn write_staged_text(staging_root: &Path, rel_path: &str, text: &str) -> Result<()> {
    let staging_path = staging_root.join(rel_path);
    if let Some(parent) = staging_path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(&staging_path, text.as_bytes())
        .with_context(|| format!("write {}", staging_path.display()))?;
    Ok(())
}

/// Replaced files are moved into `backup/` next to the staging root and put
/// back before returning if any publish fails.
fn publish_staging(staging_root: &Path, output_root: &Path) -> Result<Vec<PathBuf>> {
    if !staging_root.exists() {
        return Ok(Vec::new());
    }
    let files = collect_files_recursive(staging_root)?;
    let txn_root = staging_root
        .parent()
        .ok_or_else(|| anyhow!("staging root has no parent"))?;
    let backup_root = txn_root.join("backup");
    fs::create_dir_all(&backup_root)
        .with_context(|| format!("create {}", backup_root.display()))?;
    let mut published = Vec::new();
    let mut backups: Vec<(PathBuf, PathBuf)> = Vec::new();
    for file in files {
        let rel = file
            .strip_prefix(staging_root)
            .context("strip staging prefix")?;
        let dest = output_root.join(rel);
        let existing = fs::symlink_metadata(&dest).is_ok_and(|meta| meta.file_type().is_file());
        if existing {
            let backup = backup_root.join(rel);
            if let Some(parent) = backup.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
            if let Err(err) = fs::rename(&dest, &backup)
                .or_else(|_| fs::copy(&dest, &backup).map(|_| ()))
                .with_context(|| format!("backup {}", dest.display()))
            {
                rollback_publish(&published, &backups);
                return Err(err);
            }
            backups.push((dest.clone(), backup));
        }

        if let Err(err) = publish_file(&file, &dest) {
            rollback_publish(&published, &backups);
            return Err(err);
        }
        published.push(dest);
    }
    Ok(published)
}

fn collect_files_recursive(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !root.exists() {
        return Ok(files);
    }
    for entry in fs::read_dir(root).with_context(|| format!("read {}", root.display()))? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            files.extend(collect_files_recursive(&path)?);
        } else if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn publish_file(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let file_name = dest
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("staged");
    let tmp_path = dest
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!(".{file_name}.tmp"));
    fs::copy(source, &tmp_path).with_context(|| format!("publish {}", dest.display()))?;
    fs::rename(&tmp_path, dest).with_context(|| format!("publish {}", dest.display()))?;
    Ok(())
}

/// Best effort: remove what was published and put backups back.
fn rollback_publish(published: &[PathBuf], backups: &[(PathBuf, PathBuf)]) {
    for path in published {
        if path.exists() {
            let _ = fs::remove_file(path);
        }
    }
    for (dest, backup) in backups {
        if let Some(parent) = dest.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let _ = fs::rename(backup, dest).or_else(|_| fs::copy(backup, dest).map(|_| ()));
    }
}
