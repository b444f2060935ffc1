//! Scratch directory for baselines and staged files.
//!
//! A user-supplied directory is validated and, with consent, emptied. Without
//! one, `<system tmp>/schemactl/<project>` is created or emptied, where the
//! project name is the name of the working directory's parent.
use crate::error::{ClientError, Result};
use crate::prompt::{Output, Prompt};
use std::fs;
use std::path::{Path, PathBuf};

const SYSTEM_DIR_NAME: &str = "schemactl";
const DELETE_QUESTION: &str = "Delete files in temporary path? (y/N): ";

pub struct TempPathRequest<'a> {
    pub custom: Option<&'a Path>,
    pub force: bool,
}

pub fn prepare_temp_path(
    request: &TempPathRequest<'_>,
    prompt: &mut dyn Prompt,
    output: &mut dyn Output,
) -> Result<PathBuf> {
    match request.custom.filter(|path| !path.as_os_str().is_empty()) {
        Some(path) => prepare_custom(path, request.force, prompt, output),
        None => {
            let cwd = std::env::current_dir()
                .map_err(|err| ClientError::TempPath(format!("resolve working directory: {err}")))?;
            prepare_system(&std::env::temp_dir(), &cwd)
        }
    }
}

fn prepare_custom(
    path: &Path,
    force: bool,
    prompt: &mut dyn Prompt,
    output: &mut dyn Output,
) -> Result<PathBuf> {
    if !path.exists() {
        if !force {
            return Err(ClientError::TempPath(format!(
                "{} does not exist; create it or omit --temp to use the system path",
                path.display()
            )));
        }
        output.println(&format!(
            "Due to force option enabled, creating temp folder in: {}",
            path.display()
        ));
        fs::create_dir_all(path).map_err(|err| {
            ClientError::TempPath(format!("create {}: {err}", path.display()))
        })?;
    }
    if !path.is_dir() {
        return Err(ClientError::TempPath(format!(
            "{} is not a directory",
            path.display()
        )));
    }
    if has_entries(path)? {
        if force {
            tracing::info!(path = %path.display(), "cleaning temporary path due to force option");
        } else {
            tracing::warn!(path = %path.display(), "temporary path contains files");
            if !prompt.can_interact() {
                return Err(ClientError::TempPath(format!(
                    "{} contains files; clean it up or use --force for automatic cleanup",
                    path.display()
                )));
            }
            let answer = prompt.ask(DELETE_QUESTION)?;
            if !answer.trim().eq_ignore_ascii_case("y") {
                return Err(ClientError::TempPath(format!(
                    "{} was left untouched",
                    path.display()
                )));
            }
        }
        clear_dir(path)?;
    }
    Ok(path.to_path_buf())
}

fn prepare_system(tmp_root: &Path, cwd: &Path) -> Result<PathBuf> {
    let path = tmp_root.join(SYSTEM_DIR_NAME).join(project_name(cwd));
    if path.exists() {
        clear_dir(&path)?;
    } else {
        fs::create_dir_all(&path).map_err(|err| {
            ClientError::TempPath(format!("create {}: {err}", path.display()))
        })?;
    }
    tracing::debug!(path = %path.display(), "system temporary path ready");
    Ok(path)
}

fn project_name(cwd: &Path) -> String {
    cwd.parent()
        .and_then(|parent| parent.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "root".to_string())
}

fn has_entries(path: &Path) -> Result<bool> {
    let mut entries = fs::read_dir(path)
        .map_err(|err| ClientError::TempPath(format!("read {}: {err}", path.display())))?;
    Ok(entries.next().is_some())
}

fn clear_dir(path: &Path) -> Result<()> {
    let clear_err = |err: std::io::Error| {
        ClientError::TempPath(format!("clean {}: {err}", path.display()))
    };
    for entry in fs::read_dir(path).map_err(clear_err)? {
        let entry_path = entry.map_err(clear_err)?.path();
        if entry_path.is_dir() {
            fs::remove_dir_all(&entry_path).map_err(clear_err)?;
        } else {
            fs::remove_file(&entry_path).map_err(clear_err)?;
        }
    }
    Ok(())
}
