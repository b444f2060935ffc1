//! Error types for the migration and update workflows.
//!
//! Fatal kinds abort the current command. Declined updates are not errors;
//! they are reported through [`crate::update::UpdateResult::Declined`].

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the client core.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Neither a backend URL nor a backend command is configured.
    #[error("no backend connection configured (set --backend-url or --backend-command)")]
    ConnectionMissing,

    /// A setting the command needs was not supplied anywhere.
    #[error("missing required setting: {0}")]
    MissingSetting(&'static str),

    /// The config file or a resolved setting is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The backend refused to produce a migration; the message is verbatim.
    #[error("error creating SQL migration:\n{0}")]
    CompilerFailure(String),

    /// The previous schema could not be saved for comparison.
    #[error("unable to save previous schema for comparison to {}", path.display())]
    BaselineWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The generated migration script could not be saved.
    #[error("error saving migration script to {}", path.display())]
    ScriptWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backend kept rejecting authorization after repeated restarts.
    #[error("authorization rejected after {0} restarts")]
    TooManyAuthRetries(u32),

    /// Transport failure or a response that could not be decoded.
    #[error("backend error: {0}")]
    Backend(String),

    /// Reading from the terminal failed.
    #[error("prompt failed: {0}")]
    Prompt(#[source] std::io::Error),

    /// The temporary project path could not be prepared.
    #[error("temporary path: {0}")]
    TempPath(String),

    /// Regenerated files could not be published.
    #[error("applying files failed: {0}")]
    FileApply(String),

    /// Reading schema sources failed.
    #[error("read {}: {source}", path.display())]
    ReadSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for results with [`ClientError`].
pub type Result<T> = std::result::Result<T, ClientError>;
