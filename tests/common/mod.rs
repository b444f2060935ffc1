//! Shared test infrastructure for integration tests.
//!
//! Each [`Workspace`] is a throwaway project directory with a `dsl/` folder and
//! a shell-script backend spoken to through `--backend-command`. The script
//! appends every operation it receives to `calls.log` and answers with the
//! canned JSON reply registered for that operation.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

pub struct Workspace {
    dir: TempDir,
    replies: Vec<(&'static str, String)>,
}

/// Result of one `schemactl` invocation.
pub struct RunResult {
    pub output: Output,
}

impl RunResult {
    pub fn success(&self) -> bool {
        self.output.status.success()
    }

    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create workspace");
        fs::create_dir_all(dir.path().join("dsl")).expect("create dsl dir");
        fs::write(
            dir.path().join("dsl").join("blog.dsl"),
            "module Blog { aggregate Post { string title; } }",
        )
        .expect("write dsl");
        Self {
            dir,
            replies: Vec::new(),
        }
    }

    #[allow(dead_code)]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Register the JSON reply for a backend operation.
    pub fn reply(mut self, operation: &'static str, json: serde_json::Value) -> Self {
        self.replies.push((operation, json.to_string()));
        self
    }

    /// Operations the backend received, in order.
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.path("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn write_backend(&self) -> PathBuf {
        let mut script = String::from(
            "input=$(cat)\nop=$(printf '%s' \"$input\" | sed -n 's/^{\"operation\":\"\\([a-z_]*\\)\".*/\\1/p')\n",
        );
        script.push_str(&format!(
            "echo \"$op\" >> {}\n",
            shell_words::quote(&self.path("calls.log").display().to_string())
        ));
        script.push_str("case \"$op\" in\n");
        for (index, (operation, json)) in self.replies.iter().enumerate() {
            let reply_path = self.path(&format!("reply-{index}.json"));
            fs::write(&reply_path, json).expect("write reply");
            script.push_str(&format!(
                "  {operation}) cat {} ;;\n",
                shell_words::quote(&reply_path.display().to_string())
            ));
        }
        script.push_str("  *) echo \"unexpected operation: $op\" >&2; exit 2 ;;\nesac\n");
        let script_path = self.path("backend.sh");
        fs::write(&script_path, script).expect("write backend script");
        script_path
    }

    /// Run `schemactl` in the workspace with the scripted backend and `stdin`.
    pub fn run(&self, args: &[&str], stdin: &str) -> RunResult {
        let backend = self.write_backend();
        let backend_command = format!(
            "sh {}",
            shell_words::quote(&backend.display().to_string())
        );
        let mut full_args = vec!["--backend-command", backend_command.as_str()];
        full_args.extend_from_slice(args);
        self.run_raw(&full_args, stdin)
    }

    /// Run `schemactl` without configuring a backend.
    pub fn run_raw(&self, args: &[&str], stdin: &str) -> RunResult {
        let mut child = Command::new(env!("CARGO_BIN_EXE_schemactl"))
            .args(args)
            .current_dir(self.root())
            .env_remove("SCHEMACTL_BACKEND_URL")
            .env_remove("SCHEMACTL_BACKEND_COMMAND")
            .env_remove("SCHEMACTL_LOG")
            .env("SCHEMACTL_USERNAME", "ada")
            .env("SCHEMACTL_PASSWORD", "secret")
            .env("SCHEMACTL_TOKEN_FILE", self.path("token"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn schemactl");
        if let Some(mut pipe) = child.stdin.take() {
            // The binary may exit before reading its answers.
            let _ = pipe.write_all(stdin.as_bytes());
        }
        RunResult {
            output: child.wait_with_output().expect("wait for schemactl"),
        }
    }
}
