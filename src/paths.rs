//! Output path resolution for generated migration scripts.
use std::path::{Path, PathBuf};

/// Fallback file name used when the caller names no file, e.g.
/// `sql-migration-1700000000000.sql`.
pub fn fallback_file_name(stamp_ms: u128) -> String {
    format!("sql-migration-{stamp_ms}.sql")
}

/// Decide where a migration script is written.
///
/// An unset or empty hint falls back to `fallback_root`; a hint naming an
/// existing directory gets the fallback file name appended; anything else is
/// used verbatim, whether or not it exists yet.
pub fn resolve_output_path(hint: Option<&str>, fallback_root: &Path, stamp_ms: u128) -> PathBuf {
    let file_name = fallback_file_name(stamp_ms);
    match hint.filter(|value| !value.is_empty()) {
        None => fallback_root.join(file_name),
        Some(value) => {
            let path = Path::new(value);
            if path.is_dir() {
                path.join(file_name)
            } else {
                path.to_path_buf()
            }
        }
    }
}
