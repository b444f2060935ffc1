use crate::error::{ClientError, Result};
use crate::schema::SchemaSnapshot;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the materialized previous schema inside the temp path.
pub const BASELINE_FILE_NAME: &str = "old.dsl";

/// Location of a previous schema written for the backend to diff against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineHandle {
    pub path: PathBuf,
}

/// Write the previous snapshot to `temp_path/old.dsl`.
///
/// Returns `None` when there is nothing deployed yet, in which case no file
/// is touched.
pub fn materialize(
    previous: Option<&SchemaSnapshot>,
    temp_path: &Path,
) -> Result<Option<BaselineHandle>> {
    let Some(snapshot) = previous.filter(|snapshot| !snapshot.is_empty()) else {
        return Ok(None);
    };
    let path = temp_path.join(BASELINE_FILE_NAME);
    fs::write(&path, snapshot.concatenated()).map_err(|source| ClientError::BaselineWrite {
        path: path.clone(),
        source,
    })?;
    tracing::debug!(path = %path.display(), fragments = snapshot.len(), "baseline written");
    Ok(Some(BaselineHandle { path }))
}
