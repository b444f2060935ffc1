//! Command wiring: resolve configuration, provision the run, and hand off to
//! the migration pipeline or the update orchestrator.
use crate::auth::{AuthSession, TerminalCredentials, TokenStore};
use crate::backend::{Backend, DescribeRequest};
use crate::cli::RootArgs;
use crate::config::{discover_config, env_settings, ClientConfig};
use crate::error::ClientError;
use crate::migration::MigrationPipeline;
use crate::paths::resolve_output_path;
use crate::prompt::{ConsoleOutput, ConsolePrompt};
use crate::run_context::{MigrationArtifact, RunContext};
use crate::schema::{load_snapshot, SchemaSnapshot};
use crate::staging::ProjectFiles;
use crate::temp_path::{prepare_temp_path, TempPathRequest};
use crate::update::{UpdateOrchestrator, UpdateResult, UpdateSettings};
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

/// Per-run state set up once the required settings are known to be present.
struct Run {
    ctx: RunContext,
    current: SchemaSnapshot,
    prompt: ConsolePrompt,
    output: ConsoleOutput,
}

fn resolve_config(args: &RootArgs) -> Result<ClientConfig> {
    let file = discover_config(args.global.config.as_deref()).context("load config file")?;
    Ok(ClientConfig::resolve(args.overrides(), file, &env_settings())?)
}

/// Prepare (and possibly empty) the temp path, then load the local DSL.
fn start_run(config: &ClientConfig) -> Result<Run> {
    let mut ctx = RunContext::start();
    let mut prompt = ConsolePrompt::new();
    let mut output = ConsoleOutput;
    let temp_path = prepare_temp_path(
        &TempPathRequest {
            custom: config.temp_path.as_deref(),
            force: config.force,
        },
        &mut prompt,
        &mut output,
    )?;
    ctx.set_temp_project_path(temp_path);

    let current = load_snapshot(&config.dsl_paths).context("load DSL sources")?;
    tracing::debug!(fragments = current.len(), "run prepared");
    Ok(Run {
        ctx,
        current,
        prompt,
        output,
    })
}

fn auth_session(config: &ClientConfig) -> AuthSession {
    let session = AuthSession::new(Box::new(TerminalCredentials::new(
        config.username.clone(),
        config.password.clone(),
    )));
    let session = match &config.token_file {
        Some(path) => session.with_store(TokenStore::new(path.clone())),
        None => session,
    };
    tracing::debug!(token_held = session.is_held(), "auth session ready");
    session
}

fn scratch_dir(ctx: &RunContext) -> Result<PathBuf> {
    ctx.temp_project_path()
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow!("temporary path was not prepared"))
}

pub fn run_migrate(args: &RootArgs) -> Result<()> {
    let config = resolve_config(args)?;
    let backend = config.build_backend()?;
    let project_id = config.require_project_id()?;

    let Run {
        mut ctx,
        current,
        prompt: _,
        mut output,
    } = start_run(&config)?;
    let temp_path = scratch_dir(&ctx)?;

    let mut session = auth_session(&config);
    let db_info = backend
        .describe_deployment(&DescribeRequest {
            auth: session.acquire()?,
            project_id: project_id.to_string(),
        })
        .context("describe deployed database")?;

    let output_path = resolve_output_path(
        config.sql_path.as_deref(),
        &temp_path,
        ctx.started_at_ms(),
    );
    MigrationPipeline::new(&backend, &mut output, &temp_path).run(
        &mut ctx,
        &db_info,
        &current,
        &output_path,
    )?;
    if let Some(MigrationArtifact::Written(path)) = ctx.migration(db_info.database_kind) {
        tracing::debug!(path = %path.display(), kind = %db_info.database_kind, "migration recorded");
    }
    Ok(())
}

pub fn run_update(args: &RootArgs) -> Result<()> {
    let config = resolve_config(args)?;
    let backend = config.build_backend()?;
    let project_id = config.require_project_id()?.to_string();
    let package_name = config
        .package_name
        .clone()
        .ok_or(ClientError::MissingSetting("package_name"))?;
    if config.languages.is_empty() {
        return Err(ClientError::MissingSetting("languages").into());
    }

    let Run {
        ctx,
        current,
        mut prompt,
        mut output,
    } = start_run(&config)?;
    let temp_path = scratch_dir(&ctx)?;
    let settings = UpdateSettings {
        dsl: current,
        project_id,
        package_name,
        languages: config.languages.clone(),
        skip_diff: config.skip_diff,
        max_auth_restarts: config.max_auth_restarts,
    };

    let mut session = auth_session(&config);
    let mut files = ProjectFiles::new(config.output_path.clone(), temp_path);
    let result = UpdateOrchestrator::new(
        &backend,
        &mut session,
        &mut prompt,
        &mut output,
        &mut files,
    )
    .run(&settings)?;

    match result {
        UpdateResult::Applied { files } => {
            tracing::info!(
                files = files.len(),
                output = %config.output_path.display(),
                "project files regenerated"
            );
        }
        UpdateResult::Declined => tracing::info!("update declined"),
    }
    Ok(())
}
