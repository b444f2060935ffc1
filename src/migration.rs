//! SQL migration generation.
//!
//! The pipeline materializes the previously deployed schema, asks the backend
//! for a migration from it to the current schema, and saves the script. The
//! script location is recorded in the [`RunContext`] for later stages.
use crate::backend::{Backend, MigrationRequest};
use crate::baseline;
use crate::error::{ClientError, Result};
use crate::prompt::Output;
use crate::run_context::{MigrationArtifact, RunContext};
use crate::schema::{extract_descriptions, DatabaseInfo, SchemaSnapshot};
use std::fs;
use std::path::{Path, PathBuf};

pub struct MigrationPipeline<'a> {
    backend: &'a dyn Backend,
    output: &'a mut dyn Output,
    temp_path: &'a Path,
}

impl<'a> MigrationPipeline<'a> {
    pub fn new(backend: &'a dyn Backend, output: &'a mut dyn Output, temp_path: &'a Path) -> Self {
        Self {
            backend,
            output,
            temp_path,
        }
    }

    pub fn run(
        &mut self,
        ctx: &mut RunContext,
        db_info: &DatabaseInfo,
        current: &SchemaSnapshot,
        output_path: &Path,
    ) -> Result<MigrationArtifact> {
        self.output
            .println(&format!("Creating SQL migration for {}...", db_info.database_kind));
        let target = db_info.target();

        let baseline = baseline::materialize(db_info.previous_snapshot.as_ref(), self.temp_path)?;
        let previous_compiler_version = baseline
            .as_ref()
            .and(db_info.compiler_version.clone());

        let request = MigrationRequest {
            target,
            baseline,
            previous_compiler_version,
            dsl: current.clone(),
        };
        let response = self.backend.migration(&request)?;
        if !response.success {
            return Err(ClientError::CompilerFailure(
                response.error_message.unwrap_or_default(),
            ));
        }
        let script = response.script;

        let artifact = if script.is_empty() {
            self.output.println("No database changes detected.");
            MigrationArtifact::NoChanges
        } else {
            write_script(output_path, &script)?;
            let shown = absolute(output_path);
            self.output
                .println(&format!("Migration saved to {}", shown.display()));
            for line in extract_descriptions(&script).iter().skip(1) {
                self.output.println(line);
            }
            tracing::info!(path = %shown.display(), bytes = script.len(), "migration written");
            MigrationArtifact::Written(output_path.to_path_buf())
        };
        ctx.record_migration(db_info.database_kind, artifact.clone());
        Ok(artifact)
    }
}

fn write_script(path: &Path, script: &str) -> Result<()> {
    let write_err = |source| ClientError::ScriptWrite {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, script).map_err(write_err)
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
#[path = "migration_tests.rs"]
mod tests;
