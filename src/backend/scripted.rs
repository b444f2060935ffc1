//! Scripted backend double: replies are queued per operation and every
//! request is recorded for later assertions.
use super::{
    Backend, DescribeRequest, DiffOutcome, DiffRequest, MigrationRequest, MigrationResponse,
    UpdateOutcome, UpdateRequest,
};
use crate::error::{ClientError, Result};
use crate::schema::DatabaseInfo;
use std::cell::RefCell;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub enum Call {
    Diff(DiffRequest),
    Update(UpdateRequest),
    UpdateUnsafe(UpdateRequest),
    Migration(MigrationRequest),
    Describe(DescribeRequest),
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Call::Diff(_) => "diff",
            Call::Update(_) => "update",
            Call::UpdateUnsafe(_) => "update_unsafe",
            Call::Migration(_) => "migration",
            Call::Describe(_) => "describe_deployment",
        }
    }
}

#[derive(Default)]
pub struct ScriptedBackend {
    diffs: RefCell<VecDeque<DiffOutcome>>,
    updates: RefCell<VecDeque<UpdateOutcome>>,
    unsafe_updates: RefCell<VecDeque<UpdateOutcome>>,
    migrations: RefCell<VecDeque<Result<MigrationResponse>>>,
    deployments: RefCell<VecDeque<DatabaseInfo>>,
    calls: RefCell<Vec<Call>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_diff(self, outcome: DiffOutcome) -> Self {
        self.diffs.borrow_mut().push_back(outcome);
        self
    }

    pub fn with_update(self, outcome: UpdateOutcome) -> Self {
        self.updates.borrow_mut().push_back(outcome);
        self
    }

    pub fn with_unsafe_update(self, outcome: UpdateOutcome) -> Self {
        self.unsafe_updates.borrow_mut().push_back(outcome);
        self
    }

    pub fn with_migration(self, response: Result<MigrationResponse>) -> Self {
        self.migrations.borrow_mut().push_back(response);
        self
    }

    pub fn with_deployment(self, info: DatabaseInfo) -> Self {
        self.deployments.borrow_mut().push_back(info);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls.borrow().iter().map(Call::name).collect()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

fn next<T>(queue: &RefCell<VecDeque<T>>, operation: &str) -> Result<T> {
    queue
        .borrow_mut()
        .pop_front()
        .ok_or_else(|| ClientError::Backend(format!("no scripted {operation} reply left")))
}

impl Backend for ScriptedBackend {
    fn diff(&self, request: &DiffRequest) -> Result<DiffOutcome> {
        self.record(Call::Diff(request.clone()));
        next(&self.diffs, "diff")
    }

    fn update(&self, request: &UpdateRequest) -> Result<UpdateOutcome> {
        self.record(Call::Update(request.clone()));
        next(&self.updates, "update")
    }

    fn update_unsafe(&self, request: &UpdateRequest) -> Result<UpdateOutcome> {
        self.record(Call::UpdateUnsafe(request.clone()));
        next(&self.unsafe_updates, "update_unsafe")
    }

    fn migration(&self, request: &MigrationRequest) -> Result<MigrationResponse> {
        self.record(Call::Migration(request.clone()));
        next(&self.migrations, "migration")?
    }

    fn describe_deployment(&self, request: &DescribeRequest) -> Result<DatabaseInfo> {
        self.record(Call::Describe(request.clone()));
        next(&self.deployments, "describe_deployment")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Auth;
    use crate::schema::DatabaseKind;

    #[test]
    fn replies_are_served_in_order_then_run_out() {
        let info = DatabaseInfo {
            database_kind: DatabaseKind::Oracle,
            database_version: "19".to_string(),
            previous_snapshot: None,
            compiler_version: None,
        };
        let backend = ScriptedBackend::new().with_deployment(info.clone());
        let request = DescribeRequest {
            auth: Auth::Credentials {
                username: "ada".to_string(),
                password: "secret".to_string(),
            },
            project_id: "p1".to_string(),
        };

        assert_eq!(backend.describe_deployment(&request).expect("first"), info);
        assert!(matches!(
            backend.describe_deployment(&request),
            Err(ClientError::Backend(_))
        ));
        assert_eq!(
            backend.call_names(),
            vec!["describe_deployment", "describe_deployment"]
        );
    }
}
