//! Interactive project update.
//!
//! The update runs as an explicit state machine:
//!
//! ```text
//! Start ─▶ Diffing ─▶ Confirming ─▶ Updating ─▶ ApplyingFiles ─▶ Done
//!   ▲        │  │          │           │              ▲
//!   └────────┘  ▼          ▼           ▼              │
//!  (auth/reload) DiffDeclined Cancelled UnsafeConfirming ─▶ UnsafeUpdating
//!                                       │
//!                                       ▼
//!                                   Cancelled
//! ```
//!
//! Only a rejected token or an explicit reload loops back to `Start`. Token
//! restarts are capped; reloads need a human answer each time and are not.
//! Nothing is written to disk before `ApplyingFiles`.
use crate::auth::AuthSession;
use crate::backend::{Backend, DiffRequest, UpdateOutcome, UpdateRequest};
use crate::error::{ClientError, Result};
use crate::prompt::{is_affirmative, Output, Prompt, YES_NO};
use crate::schema::SchemaSnapshot;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const RELOAD_QUESTION: &str = "Reload [Y]es/[N]o: ";
pub const CONFIRM_QUESTION: &str = "Confirm [Y]es/[N]o: ";
pub const CANCELLED_MESSAGE: &str = "Update cancelled.";

/// Writes regenerated files; paths are relative to the project output root.
pub trait FileSink {
    fn write_files(&mut self, files: &BTreeMap<String, String>) -> Result<Vec<PathBuf>>;
}

/// Everything an update sends to the backend, resolved up front.
#[derive(Debug, Clone)]
pub struct UpdateSettings {
    pub dsl: SchemaSnapshot,
    pub project_id: String,
    pub package_name: String,
    pub languages: Vec<String>,
    pub skip_diff: bool,
    pub max_auth_restarts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateResult {
    Applied { files: Vec<PathBuf> },
    Declined,
}

#[derive(Debug)]
enum State {
    Start,
    Diffing,
    Confirming,
    Updating,
    UnsafeConfirming,
    UnsafeUpdating,
    ApplyingFiles(UpdateOutcome),
    Done(Vec<PathBuf>),
    DiffDeclined,
    Cancelled,
}

pub struct UpdateOrchestrator<'a> {
    backend: &'a dyn Backend,
    session: &'a mut AuthSession,
    prompt: &'a mut dyn Prompt,
    output: &'a mut dyn Output,
    files: &'a mut dyn FileSink,
}

impl<'a> UpdateOrchestrator<'a> {
    pub fn new(
        backend: &'a dyn Backend,
        session: &'a mut AuthSession,
        prompt: &'a mut dyn Prompt,
        output: &'a mut dyn Output,
        files: &'a mut dyn FileSink,
    ) -> Self {
        Self {
            backend,
            session,
            prompt,
            output,
            files,
        }
    }

    pub fn run(&mut self, settings: &UpdateSettings) -> Result<UpdateResult> {
        let mut auth_restarts = 0u32;
        let mut state = State::Start;
        loop {
            tracing::debug!(?state, "update state");
            state = match state {
                State::Start if settings.skip_diff => State::Updating,
                State::Start => State::Diffing,
                State::Diffing => {
                    let request = DiffRequest {
                        auth: self.session.acquire()?,
                        dsl: settings.dsl.clone(),
                        project_id: settings.project_id.clone(),
                    };
                    let held_before = request.auth.is_token();
                    let outcome = self.backend.diff(&request)?;

                    if outcome.authorized {
                        if let Some(token) = outcome.authorization.clone() {
                            self.session.store_token(token);
                        }
                    } else if held_before {
                        self.session.invalidate();
                        auth_restarts += 1;
                        if auth_restarts > settings.max_auth_restarts {
                            return Err(ClientError::TooManyAuthRetries(settings.max_auth_restarts));
                        }
                        tracing::warn!(auth_restarts, "held token rejected; restarting update");
                        state = State::Start;
                        continue;
                    }

                    for line in &outcome.diffs {
                        self.output.println(line);
                    }
                    self.output.println(&outcome.response);

                    if !outcome.successful {
                        if self.confirm(RELOAD_QUESTION)? {
                            State::Start
                        } else {
                            State::DiffDeclined
                        }
                    } else if !outcome.auto_confirm {
                        State::Confirming
                    } else {
                        State::Updating
                    }
                }
                State::Confirming => {
                    if self.confirm(CONFIRM_QUESTION)? {
                        State::Updating
                    } else {
                        State::Cancelled
                    }
                }
                State::Updating => {
                    let request = self.update_request(settings)?;
                    let outcome = self.backend.update(&request)?;
                    if outcome.needs_confirmation {
                        if let Some(message) = &outcome.confirmation_message {
                            self.output.println(message);
                        }
                        State::UnsafeConfirming
                    } else {
                        State::ApplyingFiles(outcome)
                    }
                }
                State::UnsafeConfirming => {
                    if self.confirm(CONFIRM_QUESTION)? {
                        State::UnsafeUpdating
                    } else {
                        State::Cancelled
                    }
                }
                State::UnsafeUpdating => {
                    let request = self.update_request(settings)?;
                    State::ApplyingFiles(self.backend.update_unsafe(&request)?)
                }
                State::ApplyingFiles(outcome) => {
                    for message in &outcome.messages {
                        self.output.println(message);
                    }
                    State::Done(self.files.write_files(&outcome.file_bodies)?)
                }
                State::Done(files) => {
                    tracing::info!(files = files.len(), "update applied");
                    return Ok(UpdateResult::Applied { files });
                }
                State::DiffDeclined | State::Cancelled => {
                    self.output.println(CANCELLED_MESSAGE);
                    return Ok(UpdateResult::Declined);
                }
            };
        }
    }

    fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = self.prompt.read_character(question, YES_NO)?;
        Ok(is_affirmative(answer))
    }

    fn update_request(&mut self, settings: &UpdateSettings) -> Result<UpdateRequest> {
        Ok(UpdateRequest {
            auth: self.session.acquire()?,
            dsl: settings.dsl.clone(),
            project_id: settings.project_id.clone(),
            package_name: settings.package_name.clone(),
            languages: settings.languages.clone(),
        })
    }
}

#[cfg(test)]
#[path = "update_tests.rs"]
mod tests;
