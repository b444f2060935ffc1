//! Local command transport.
//!
//! The configured command line is split with shell-words and spawned once per
//! operation. The request envelope goes to stdin; the reply JSON is read from
//! stdout. A non-zero exit status is a backend error carrying stderr.
use super::{Operation, Transport};
use crate::error::{ClientError, Result};
use serde::Serialize;
use std::io::Write;
use std::process::{Command, Stdio};

#[derive(Serialize)]
struct Envelope<'a> {
    operation: &'static str,
    request: &'a serde_json::Value,
}

pub struct CommandTransport {
    program: String,
    args: Vec<String>,
}

impl CommandTransport {
    pub fn new(command: &str) -> Result<Self> {
        let mut words = shell_words::split(command)
            .map_err(|err| ClientError::Config(format!("parse backend command {command:?}: {err}")))?;
        if words.is_empty() {
            return Err(ClientError::Config("backend command is empty".to_string()));
        }
        let program = words.remove(0);
        Ok(Self {
            program,
            args: words,
        })
    }
}

impl Transport for CommandTransport {
    fn call(&self, operation: Operation, request: &serde_json::Value) -> Result<serde_json::Value> {
        let envelope = Envelope {
            operation: operation.as_str(),
            request,
        };
        let input = serde_json::to_vec(&envelope)
            .map_err(|err| ClientError::Backend(format!("encode envelope: {err}")))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| ClientError::Backend(format!("spawn {}: {err}", self.program)))?;

        // Stdin is fed from its own thread while stdout and stderr drain.
        let stdin = child.stdin.take();
        let (written, output) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(&input),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            (writer.join(), output)
        });
        let written = written
            .map_err(|_| ClientError::Backend("request writer thread panicked".to_string()))?;
        let output = output
            .map_err(|err| ClientError::Backend(format!("wait for backend command: {err}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ClientError::Backend(format!(
                "{} failed with status {}: {}",
                operation.as_str(),
                output.status,
                stderr.trim()
            )));
        }

        written.map_err(|err| ClientError::Backend(format!("write request to backend: {err}")))?;

        serde_json::from_slice(&output.stdout).map_err(|err| {
            ClientError::Backend(format!("parse {} reply as JSON: {err}", operation.as_str()))
        })
    }
}
