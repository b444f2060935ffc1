//! Credentials and the token-holding auth session.
//!
//! A session hands out either the token it holds or the credentials it
//! collected on first use. Once the backend rejects a held token the session drops it
//! (in memory and on disk); it is never offered again.
use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Opaque token granted by the backend.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Authentication attached to a backend request.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Auth {
    Token { token: AuthToken },
    Credentials { username: String, password: String },
}

impl Auth {
    pub fn is_token(&self) -> bool {
        matches!(self, Auth::Token { .. })
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::Token { token } => f.debug_struct("Token").field("token", token).finish(),
            Auth::Credentials { username, .. } => f
                .debug_struct("Credentials")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// Supplies username/password when no token is held.
pub trait CredentialSource {
    fn credentials(&mut self) -> Result<(String, String)>;
}

/// Credentials from configuration, asking on the terminal for missing parts.
pub struct TerminalCredentials {
    username: Option<String>,
    password: Option<String>,
}

impl TerminalCredentials {
    pub fn new(username: Option<String>, password: Option<String>) -> Self {
        Self { username, password }
    }
}

impl CredentialSource for TerminalCredentials {
    fn credentials(&mut self) -> Result<(String, String)> {
        let term = console::Term::stderr();
        let username = match self.username.clone() {
            Some(username) => username,
            None if term.is_term() => {
                term.write_str("Username: ").map_err(ClientError::Prompt)?;
                let username = term.read_line().map_err(ClientError::Prompt)?;
                self.username = Some(username.clone());
                username
            }
            None => return Err(ClientError::MissingSetting("username")),
        };
        let password = match self.password.clone() {
            Some(password) => password,
            None if term.is_term() => {
                term.write_str("Password: ").map_err(ClientError::Prompt)?;
                term.read_secure_line().map_err(ClientError::Prompt)?
            }
            None => return Err(ClientError::MissingSetting("password")),
        };
        Ok((username, password))
    }
}

/// File-backed persistence for a granted token.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default location: `<config dir>/schemactl/token`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("schemactl").join("token"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Option<AuthToken> {
        let text = fs::read_to_string(&self.path).ok()?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(AuthToken::new(trimmed))
    }

    pub fn save(&self, token: &AuthToken) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token.as_str())
    }

    pub fn remove(&self) -> std::io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

pub struct AuthSession {
    token: Option<AuthToken>,
    store: Option<TokenStore>,
    credentials: Box<dyn CredentialSource>,
    collected: Option<(String, String)>,
}

impl AuthSession {
    pub fn new(credentials: Box<dyn CredentialSource>) -> Self {
        Self {
            token: None,
            store: None,
            credentials,
            collected: None,
        }
    }

    /// Attach a token store and pick up a token persisted by an earlier run.
    pub fn with_store(mut self, store: TokenStore) -> Self {
        self.token = store.load();
        self.store = Some(store);
        self
    }

    pub fn is_held(&self) -> bool {
        self.token.is_some()
    }

    /// Auth for the next backend call: the held token, or credentials.
    ///
    /// Credentials are collected at most once per session.
    pub fn acquire(&mut self) -> Result<Auth> {
        if let Some(token) = &self.token {
            return Ok(Auth::Token {
                token: token.clone(),
            });
        }
        let (username, password) = match self.collected.clone() {
            Some(pair) => pair,
            None => {
                let pair = self.credentials.credentials()?;
                self.collected = Some(pair.clone());
                pair
            }
        };
        Ok(Auth::Credentials { username, password })
    }

    pub fn store_token(&mut self, token: AuthToken) {
        if let Some(store) = &self.store {
            if let Err(err) = store.save(&token) {
                tracing::warn!(path = %store.path().display(), error = %err, "token not persisted");
            }
        }
        self.token = Some(token);
    }

    pub fn invalidate(&mut self) {
        self.token = None;
        if let Some(store) = &self.store {
            if let Err(err) = store.remove() {
                tracing::warn!(path = %store.path().display(), error = %err, "stale token not removed");
            }
        }
    }
}
