//! CLI argument parsing for the schema client.
//!
//! The CLI only collects values; resolution against the config file and the
//! environment happens in [`crate::config`].
use crate::config::Overrides;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "schemactl",
    version,
    about = "Schema migration and project update client",
    after_help = "Commands:\n  migrate [--sql <path>]                     Generate a SQL migration for the deployed database\n  update [--package <name>] [--language <l>]  Diff, confirm, and regenerate project files\n\nExamples:\n  schemactl --backend-url https://compiler.local --project-id 1f2e migrate --sql migrations/\n  schemactl --project-id 1f2e update --package blog --language java --output src/generated",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Settings shared by every command.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// JSON config file (defaults to ./schemactl.json when present)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the compiler backend
    #[arg(long, value_name = "URL", global = true)]
    pub backend_url: Option<String>,

    /// Local command speaking the backend protocol over stdin/stdout
    #[arg(long, value_name = "CMD", global = true)]
    pub backend_command: Option<String>,

    /// Project identifier on the backend
    #[arg(long, value_name = "ID", global = true)]
    pub project_id: Option<String>,

    /// Account name; prompted for when missing
    #[arg(long, value_name = "NAME", global = true)]
    pub username: Option<String>,

    /// DSL file or directory (repeatable)
    #[arg(long = "dsl", value_name = "PATH", global = true)]
    pub dsl_paths: Vec<PathBuf>,

    /// Custom temporary directory instead of the system one
    #[arg(long = "temp", value_name = "PATH", global = true)]
    pub temp_path: Option<PathBuf>,

    /// Create or clean the temporary directory without asking
    #[arg(long, global = true)]
    pub force: bool,

    /// Emit debug logging to stderr
    #[arg(long, global = true)]
    pub verbose: bool,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Migrate(MigrateArgs),
    Update(UpdateArgs),
}

/// Migration command inputs.
#[derive(Parser, Debug, Default)]
#[command(about = "Create a SQL migration from the deployed schema to the local DSL")]
pub struct MigrateArgs {
    /// Script file, or directory to place a timestamped script in
    #[arg(long = "sql", value_name = "PATH")]
    pub sql_path: Option<String>,
}

/// Update command inputs.
#[derive(Parser, Debug, Default)]
#[command(about = "Update the remote project and regenerate source files")]
pub struct UpdateArgs {
    /// Package (namespace) for generated code
    #[arg(long = "package", value_name = "NAME")]
    pub package_name: Option<String>,

    /// Target language (repeatable)
    #[arg(long = "language", value_name = "LANG")]
    pub languages: Vec<String>,

    /// Directory regenerated files are written to
    #[arg(long = "output", value_name = "DIR")]
    pub output_path: Option<PathBuf>,

    /// Update without showing the diff first
    #[arg(long)]
    pub skip_diff: bool,
}

impl RootArgs {
    /// CLI layer for [`crate::config::ClientConfig::resolve`].
    pub fn overrides(&self) -> Overrides {
        let global = &self.global;
        let mut overrides = Overrides {
            backend_url: global.backend_url.clone(),
            backend_command: global.backend_command.clone(),
            project_id: global.project_id.clone(),
            username: global.username.clone(),
            dsl_paths: global.dsl_paths.clone(),
            temp_path: global.temp_path.clone(),
            force: global.force,
            ..Overrides::default()
        };
        match &self.command {
            Command::Migrate(args) => {
                overrides.sql_path = args.sql_path.clone();
            }
            Command::Update(args) => {
                overrides.package_name = args.package_name.clone();
                overrides.languages = args.languages.clone();
                overrides.output_path = args.output_path.clone();
                overrides.skip_diff = args.skip_diff;
            }
        }
        overrides
    }
}
