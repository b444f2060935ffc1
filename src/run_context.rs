//! Per-invocation state shared between workflow stages.
//!
//! One `RunContext` is created per command run and passed by reference; it is
//! never global, so concurrent invocations cannot observe each other.
use crate::schema::DatabaseKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Result of a migration run for one database kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationArtifact {
    /// The script was written to this path.
    Written(PathBuf),
    /// The backend reported no changes; nothing was written.
    NoChanges,
}

#[derive(Debug, Clone)]
pub struct RunContext {
    started_at_ms: u128,
    temp_project_path: Option<PathBuf>,
    postgres_migration: Option<MigrationArtifact>,
    oracle_migration: Option<MigrationArtifact>,
}

impl RunContext {
    pub fn new(started_at_ms: u128) -> Self {
        Self {
            started_at_ms,
            temp_project_path: None,
            postgres_migration: None,
            oracle_migration: None,
        }
    }

    /// Start a context stamped with the current wall-clock time.
    pub fn start() -> Self {
        Self::new(now_epoch_ms())
    }

    pub fn started_at_ms(&self) -> u128 {
        self.started_at_ms
    }

    pub fn temp_project_path(&self) -> Option<&Path> {
        self.temp_project_path.as_deref()
    }

    pub fn set_temp_project_path(&mut self, path: PathBuf) {
        self.temp_project_path = Some(path);
    }

    pub fn record_migration(&mut self, kind: DatabaseKind, artifact: MigrationArtifact) {
        let slot = match kind {
            DatabaseKind::Postgres => &mut self.postgres_migration,
            DatabaseKind::Oracle => &mut self.oracle_migration,
        };
        *slot = Some(artifact);
    }

    pub fn migration(&self, kind: DatabaseKind) -> Option<&MigrationArtifact> {
        match kind {
            DatabaseKind::Postgres => self.postgres_migration.as_ref(),
            DatabaseKind::Oracle => self.oracle_migration.as_ref(),
        }
    }
}

pub fn now_epoch_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_recorded_per_database_kind() {
        let mut ctx = RunContext::new(5);
        ctx.record_migration(DatabaseKind::Oracle, MigrationArtifact::NoChanges);
        ctx.record_migration(
            DatabaseKind::Postgres,
            MigrationArtifact::Written(PathBuf::from("a.sql")),
        );
        ctx.record_migration(
            DatabaseKind::Postgres,
            MigrationArtifact::Written(PathBuf::from("b.sql")),
        );

        assert_eq!(ctx.started_at_ms(), 5);
        assert_eq!(
            ctx.migration(DatabaseKind::Postgres),
            Some(&MigrationArtifact::Written(PathBuf::from("b.sql")))
        );
        assert_eq!(
            ctx.migration(DatabaseKind::Oracle),
            Some(&MigrationArtifact::NoChanges)
        );
    }

    #[test]
    fn contexts_do_not_share_state() {
        let mut first = RunContext::start();
        let second = RunContext::start();
        first.set_temp_project_path(PathBuf::from("/tmp/one"));

        assert_eq!(first.temp_project_path(), Some(Path::new("/tmp/one")));
        assert_eq!(second.temp_project_path(), None);
        assert!(second.started_at_ms() >= first.started_at_ms());
    }
}
