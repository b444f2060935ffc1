//! Request/response contract with the schema-compiler backend.
//!
//! The backend's diff, migration, and code-generation algorithms are opaque;
//! this module only defines the operations and their payloads, plus the
//! transports that carry them.
//!
//! # Transports
//!
//! Both transports exchange JSON:
//!
//! - [`http::HttpTransport`]: `POST <base_url>/<operation>` with the request
//!   as the body and the response as the reply body.
//! - [`command::CommandTransport`]: a local command receives
//!   `{"operation": ..., "request": ...}` on stdin and prints the response on
//!   stdout. Useful for wrappers, proxies, and offline testing.
use crate::auth::{Auth, AuthToken};
use crate::baseline::BaselineHandle;
use crate::error::{ClientError, Result};
use crate::schema::{DatabaseInfo, SchemaSnapshot};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

pub mod command;
pub mod http;
#[cfg(test)]
pub mod scripted;

/// Backend operations, named as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Diff,
    Update,
    UpdateUnsafe,
    Migration,
    DescribeDeployment,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Diff => "diff",
            Operation::Update => "update",
            Operation::UpdateUnsafe => "update_unsafe",
            Operation::Migration => "migration",
            Operation::DescribeDeployment => "describe_deployment",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiffRequest {
    pub auth: Auth,
    pub dsl: SchemaSnapshot,
    pub project_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DiffOutcome {
    #[serde(default)]
    pub diffs: Vec<String>,
    #[serde(default)]
    pub response: String,
    pub successful: bool,
    pub authorized: bool,
    #[serde(default)]
    pub auto_confirm: bool,
    /// Token granted alongside `authorized = true`.
    #[serde(default)]
    pub authorization: Option<AuthToken>,
}

/// Parameters shared by the safe and unsafe update operations.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateRequest {
    pub auth: Auth,
    pub dsl: SchemaSnapshot,
    pub project_id: String,
    pub package_name: String,
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpdateOutcome {
    #[serde(default)]
    pub messages: Vec<String>,
    /// Regenerated file contents keyed by path relative to the output root.
    #[serde(default)]
    pub file_bodies: BTreeMap<String, String>,
    #[serde(default)]
    pub needs_confirmation: bool,
    #[serde(default)]
    pub confirmation_message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationRequest {
    pub target: String,
    pub baseline: Option<BaselineHandle>,
    pub previous_compiler_version: Option<String>,
    pub dsl: SchemaSnapshot,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MigrationResponse {
    pub success: bool,
    #[serde(default)]
    pub script: String,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DescribeRequest {
    pub auth: Auth,
    pub project_id: String,
}

/// The schema-compiler service.
pub trait Backend {
    fn diff(&self, request: &DiffRequest) -> Result<DiffOutcome>;
    fn update(&self, request: &UpdateRequest) -> Result<UpdateOutcome>;
    fn update_unsafe(&self, request: &UpdateRequest) -> Result<UpdateOutcome>;
    fn migration(&self, request: &MigrationRequest) -> Result<MigrationResponse>;
    fn describe_deployment(&self, request: &DescribeRequest) -> Result<DatabaseInfo>;
}

/// Moves one JSON request to the backend and returns its JSON reply.
pub trait Transport {
    fn call(&self, operation: Operation, request: &serde_json::Value) -> Result<serde_json::Value>;
}

/// [`Backend`] implemented over any JSON [`Transport`].
pub struct RemoteBackend {
    transport: Box<dyn Transport>,
}

impl RemoteBackend {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self { transport }
    }

    fn call<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        operation: Operation,
        request: &Req,
    ) -> Result<Resp> {
        let body = serde_json::to_value(request).map_err(|err| {
            ClientError::Backend(format!("encode {} request: {err}", operation.as_str()))
        })?;
        let start = Instant::now();
        let reply = self.transport.call(operation, &body)?;
        tracing::info!(
            operation = operation.as_str(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "backend call complete"
        );
        serde_json::from_value(reply).map_err(|err| {
            ClientError::Backend(format!("decode {} response: {err}", operation.as_str()))
        })
    }
}

impl Backend for RemoteBackend {
    fn diff(&self, request: &DiffRequest) -> Result<DiffOutcome> {
        self.call(Operation::Diff, request)
    }

    fn update(&self, request: &UpdateRequest) -> Result<UpdateOutcome> {
        self.call(Operation::Update, request)
    }

    fn update_unsafe(&self, request: &UpdateRequest) -> Result<UpdateOutcome> {
        self.call(Operation::UpdateUnsafe, request)
    }

    fn migration(&self, request: &MigrationRequest) -> Result<MigrationResponse> {
        self.call(Operation::Migration, request)
    }

    fn describe_deployment(&self, request: &DescribeRequest) -> Result<DatabaseInfo> {
        self.call(Operation::DescribeDeployment, request)
    }
}
