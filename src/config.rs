//! Client configuration.
//!
//! Every setting is resolved once, in priority order: CLI flag, then the JSON
//! config file, then a `SCHEMACTL_<NAME>` environment variable. The resolved
//! [`ClientConfig`] is passed explicitly to the workflows.
use crate::backend::command::CommandTransport;
use crate::backend::http::HttpTransport;
use crate::backend::{RemoteBackend, Transport};
use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_SCHEMA_VERSION: u32 = 1;
pub const DEFAULT_CONFIG_FILE: &str = "schemactl.json";
pub const ENV_PREFIX: &str = "SCHEMACTL_";

const DEFAULT_DSL_PATH: &str = "dsl";
const DEFAULT_MAX_AUTH_RESTARTS: u32 = 3;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// On-disk configuration (`schemactl.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub languages: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsl_paths: Option<Vec<PathBuf>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_auth_restarts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_diff: Option<bool>,
}

/// Values given on the command line; `None`/empty/`false` defers to lower layers.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub backend_url: Option<String>,
    pub backend_command: Option<String>,
    pub project_id: Option<String>,
    pub username: Option<String>,
    pub package_name: Option<String>,
    pub languages: Vec<String>,
    pub dsl_paths: Vec<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub sql_path: Option<String>,
    pub temp_path: Option<PathBuf>,
    pub force: bool,
    pub skip_diff: bool,
}

/// How the backend is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connection {
    Http { url: String },
    Command { command: String },
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub connection: Connection,
    pub project_id: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub package_name: Option<String>,
    pub languages: Vec<String>,
    pub dsl_paths: Vec<PathBuf>,
    pub output_path: PathBuf,
    pub sql_path: Option<String>,
    pub temp_path: Option<PathBuf>,
    pub token_file: Option<PathBuf>,
    pub max_auth_restarts: u32,
    pub timeout: Duration,
    pub force: bool,
    pub skip_diff: bool,
}

/// Load a config file from an explicit path.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    let bytes = fs::read(path).map_err(|source| ClientError::ReadSource {
        path: path.to_path_buf(),
        source,
    })?;
    let config: ConfigFile = serde_json::from_slice(&bytes)
        .map_err(|err| ClientError::Config(format!("parse {}: {err}", path.display())))?;
    validate_config(&config)?;
    Ok(config)
}

/// Load `--config` if given, else `./schemactl.json` when present.
pub fn discover_config(explicit: Option<&Path>) -> Result<Option<ConfigFile>> {
    match explicit {
        Some(path) => load_config(path).map(Some),
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.is_file() {
                load_config(default).map(Some)
            } else {
                Ok(None)
            }
        }
    }
}

pub fn validate_config(config: &ConfigFile) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(ClientError::Config(format!(
            "unsupported config schema_version {}",
            config.schema_version
        )));
    }
    if config.languages.as_ref().is_some_and(Vec::is_empty) {
        return Err(ClientError::Config(
            "languages must list at least one language".to_string(),
        ));
    }
    if config.timeout_secs == Some(0) {
        return Err(ClientError::Config(
            "timeout_secs must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// `SCHEMACTL_*` variables from the process environment.
pub fn env_settings() -> BTreeMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with(ENV_PREFIX))
        .collect()
}

impl ClientConfig {
    pub fn resolve(
        cli: Overrides,
        file: Option<ConfigFile>,
        env: &BTreeMap<String, String>,
    ) -> Result<Self> {
        let file = file.unwrap_or_default();
        let env = EnvLayer(env);

        let backend_url = cli
            .backend_url
            .or(file.backend_url)
            .or_else(|| env.string("BACKEND_URL"));
        let backend_command = cli
            .backend_command
            .or(file.backend_command)
            .or_else(|| env.string("BACKEND_COMMAND"));
        let connection = match (backend_url, backend_command) {
            (Some(url), _) if !url.trim().is_empty() => Connection::Http { url },
            (_, Some(command)) if !command.trim().is_empty() => Connection::Command { command },
            _ => return Err(ClientError::ConnectionMissing),
        };

        let languages = if !cli.languages.is_empty() {
            cli.languages
        } else if let Some(languages) = file.languages {
            languages
        } else {
            env.list("LANGUAGES").unwrap_or_default()
        };
        let dsl_paths = if !cli.dsl_paths.is_empty() {
            cli.dsl_paths
        } else if let Some(paths) = file.dsl_paths {
            paths
        } else {
            env.list("DSL_PATHS")
                .map(|paths| paths.into_iter().map(PathBuf::from).collect())
                .unwrap_or_else(|| vec![PathBuf::from(DEFAULT_DSL_PATH)])
        };

        let max_auth_restarts = match file.max_auth_restarts {
            Some(value) => value,
            None => env
                .parsed("MAX_AUTH_RESTARTS")?
                .unwrap_or(DEFAULT_MAX_AUTH_RESTARTS),
        };
        let timeout_secs = match file.timeout_secs {
            Some(value) => value,
            None => env.parsed("TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };
        if timeout_secs == 0 {
            return Err(ClientError::Config(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            connection,
            project_id: cli
                .project_id
                .or(file.project_id)
                .or_else(|| env.string("PROJECT_ID")),
            username: cli
                .username
                .or(file.username)
                .or_else(|| env.string("USERNAME")),
            password: file.password.or_else(|| env.string("PASSWORD")),
            package_name: cli
                .package_name
                .or(file.package_name)
                .or_else(|| env.string("PACKAGE_NAME")),
            languages,
            dsl_paths,
            output_path: cli
                .output_path
                .or(file.output_path)
                .or_else(|| env.string("OUTPUT_PATH").map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(".")),
            sql_path: cli
                .sql_path
                .or(file.sql_path)
                .or_else(|| env.string("SQL_PATH")),
            temp_path: cli
                .temp_path
                .or(file.temp_path)
                .or_else(|| env.string("TEMP_PATH").map(PathBuf::from)),
            token_file: file
                .token_file
                .or_else(|| env.string("TOKEN_FILE").map(PathBuf::from))
                .or_else(crate::auth::TokenStore::default_path),
            max_auth_restarts,
            timeout: Duration::from_secs(timeout_secs),
            force: cli.force || file.force.unwrap_or(false) || env.flag("FORCE"),
            skip_diff: cli.skip_diff || file.skip_diff.unwrap_or(false) || env.flag("SKIP_DIFF"),
        })
    }

    pub fn require_project_id(&self) -> Result<&str> {
        self.project_id
            .as_deref()
            .ok_or(ClientError::MissingSetting("project_id"))
    }

    /// Backend over the configured transport.
    pub fn build_backend(&self) -> Result<RemoteBackend> {
        let transport: Box<dyn Transport> = match &self.connection {
            Connection::Http { url } => Box::new(HttpTransport::new(url, self.timeout)),
            Connection::Command { command } => Box::new(CommandTransport::new(command)?),
        };
        Ok(RemoteBackend::new(transport))
    }
}

struct EnvLayer<'a>(&'a BTreeMap<String, String>);

impl EnvLayer<'_> {
    fn string(&self, name: &str) -> Option<String> {
        self.0
            .get(&format!("{ENV_PREFIX}{name}"))
            .filter(|value| !value.is_empty())
            .cloned()
    }

    /// Comma-separated list; blank entries are dropped.
    fn list(&self, name: &str) -> Option<Vec<String>> {
        self.string(name).map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
    }

    fn flag(&self, name: &str) -> bool {
        self.string(name)
            .is_some_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
    }

    fn parsed<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>> {
        match self.string(name) {
            None => Ok(None),
            Some(value) => value.trim().parse().map(Some).map_err(|_| {
                ClientError::Config(format!("{ENV_PREFIX}{name} is not a valid number: {value:?}"))
            }),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
