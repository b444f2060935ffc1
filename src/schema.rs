//! Schema snapshots, deployment descriptions, and migration script helpers.
use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Opening marker of the human-readable block embedded in migration scripts.
pub const DESCRIPTION_START: &str = "/*MIGRATION_DESCRIPTION";
/// Closing marker of the human-readable block embedded in migration scripts.
pub const DESCRIPTION_END: &str = "MIGRATION_DESCRIPTION*/";

const DSL_EXTENSION: &str = "dsl";

/// Named schema fragments making up one version of the data model.
///
/// Iteration follows the map's key order, which is also the order fragments
/// are concatenated in when a baseline is materialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaSnapshot {
    fragments: BTreeMap<String, String>,
}

impl SchemaSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.fragments.insert(name.into(), source.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.fragments.values().map(String::as_str)
    }

    /// Concatenate every fragment in snapshot order.
    pub fn concatenated(&self) -> String {
        self.sources().collect()
    }
}

impl<N: Into<String>, S: Into<String>> FromIterator<(N, S)> for SchemaSnapshot {
    fn from_iter<I: IntoIterator<Item = (N, S)>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for (name, source) in iter {
            snapshot.insert(name, source);
        }
        snapshot
    }
}

/// Database engines the backend can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DatabaseKind {
    #[serde(alias = "postgres", alias = "POSTGRES")]
    Postgres,
    #[serde(alias = "oracle", alias = "ORACLE")]
    Oracle,
}

impl DatabaseKind {
    pub fn name(self) -> &'static str {
        match self {
            DatabaseKind::Postgres => "Postgres",
            DatabaseKind::Oracle => "Oracle",
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the backend reports about the currently deployed database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub database_kind: DatabaseKind,
    pub database_version: String,
    #[serde(default)]
    pub previous_snapshot: Option<SchemaSnapshot>,
    #[serde(default)]
    pub compiler_version: Option<String>,
}

impl DatabaseInfo {
    /// Dialect/version selector sent with migration requests, e.g. `postgres14`.
    pub fn target(&self) -> String {
        format!(
            "{}{}",
            self.database_kind.name().to_lowercase(),
            self.database_version
        )
    }
}

/// Extract the description block embedded in a migration script.
///
/// Index 0 is the remainder of the start-marker line; change notes follow.
/// Trailing empty entries are dropped.
pub fn extract_descriptions(script: &str) -> Vec<String> {
    let Some(start) = script.find(DESCRIPTION_START) else {
        return Vec::new();
    };
    let Some(end) = script.find(DESCRIPTION_END) else {
        return Vec::new();
    };
    let body_start = start + DESCRIPTION_START.len();
    if end < body_start {
        return Vec::new();
    }
    let mut lines: Vec<String> = script[body_start..end]
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect();
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines
}

/// Load every `.dsl` file under `paths` into a snapshot keyed by file path.
///
/// Directories are walked recursively; file arguments are taken as-is.
pub fn load_snapshot(paths: &[PathBuf]) -> Result<SchemaSnapshot> {
    let mut snapshot = SchemaSnapshot::new();
    for root in paths {
        let files = if root.is_dir() {
            collect_dsl_files(root)?
        } else {
            vec![root.clone()]
        };
        for file in files {
            let source = fs::read_to_string(&file).map_err(|source| ClientError::ReadSource {
                path: file.clone(),
                source,
            })?;
            snapshot.insert(file.display().to_string(), source);
        }
    }
    Ok(snapshot)
}

fn collect_dsl_files(root: &Path) -> Result<Vec<PathBuf>> {
    let read_err = |source| ClientError::ReadSource {
        path: root.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(root).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if path.is_dir() {
            files.extend(collect_dsl_files(&path)?);
        } else if path.extension().is_some_and(|ext| ext == DSL_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
