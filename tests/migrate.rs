//! End-to-end runs of `schemactl migrate` against a scripted backend.
#![cfg(unix)]

mod common;

use common::Workspace;
use serde_json::json;
use std::fs;

const SCRIPT: &str = "/*MIGRATION_DESCRIPTION\nNew object Blog.Post will be created\nMIGRATION_DESCRIPTION*/\nCREATE TABLE \"Blog\".\"Post\"();\n";

fn deployed() -> serde_json::Value {
    json!({
        "database_kind": "postgres",
        "database_version": "14",
        "previous_snapshot": { "blog.dsl": "module Blog;" },
        "compiler_version": "1.7.0"
    })
}

#[test]
fn missing_backend_connection_fails_before_any_work() {
    let workspace = Workspace::new();

    let result = workspace.run_raw(&["--project-id", "p1", "migrate"], "");

    assert!(!result.success());
    assert!(
        result.stderr().contains("no backend connection configured"),
        "stderr: {}",
        result.stderr()
    );
}

#[test]
fn missing_project_id_leaves_the_temp_path_alone() {
    let workspace = Workspace::new().reply("describe_deployment", deployed());
    fs::create_dir_all(workspace.path("scratch")).expect("mkdir");
    fs::write(workspace.path("scratch/keep.txt"), "mine").expect("write");

    let result = workspace.run(&["--temp", "scratch", "--force", "migrate"], "");

    assert!(!result.success());
    assert!(
        result.stderr().contains("missing required setting: project_id"),
        "stderr: {}",
        result.stderr()
    );
    assert_eq!(
        fs::read_to_string(workspace.path("scratch/keep.txt")).expect("kept file"),
        "mine"
    );
    assert!(workspace.calls().is_empty());
}

#[test]
fn migration_script_is_written_and_described() {
    let workspace = Workspace::new()
        .reply("describe_deployment", deployed())
        .reply("migration", json!({ "success": true, "script": SCRIPT }));

    let result = workspace.run(
        &[
            "--project-id",
            "p1",
            "--temp",
            "scratch",
            "--force",
            "migrate",
            "--sql",
            "out/migration.sql",
        ],
        "",
    );

    assert!(result.success(), "stderr: {}", result.stderr());
    assert_eq!(
        fs::read_to_string(workspace.path("out/migration.sql")).expect("script"),
        SCRIPT
    );
    let stdout = result.stdout();
    assert!(stdout.contains("Creating SQL migration for Postgres..."));
    assert!(stdout.contains("Migration saved to "));
    assert!(stdout.contains("New object Blog.Post will be created"));
    assert_eq!(
        fs::read_to_string(workspace.path("scratch/old.dsl")).expect("baseline"),
        "module Blog;"
    );
    assert_eq!(workspace.calls(), vec!["describe_deployment", "migration"]);
}

#[test]
fn sql_directory_receives_a_timestamped_script() {
    let workspace = Workspace::new()
        .reply("describe_deployment", deployed())
        .reply("migration", json!({ "success": true, "script": SCRIPT }));
    fs::create_dir_all(workspace.path("migrations")).expect("mkdir");

    let result = workspace.run(
        &[
            "--project-id", "p1", "--temp", "scratch", "--force", "migrate", "--sql", "migrations",
        ],
        "",
    );

    assert!(result.success(), "stderr: {}", result.stderr());
    let names: Vec<String> = fs::read_dir(workspace.path("migrations"))
        .expect("read dir")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 1);
    assert!(names[0].starts_with("sql-migration-") && names[0].ends_with(".sql"));
}

#[test]
fn no_changes_writes_nothing() {
    let workspace = Workspace::new()
        .reply("describe_deployment", deployed())
        .reply("migration", json!({ "success": true, "script": "" }));

    let result = workspace.run(
        &[
            "--project-id", "p1", "--temp", "scratch", "--force", "migrate", "--sql", "out.sql",
        ],
        "",
    );

    assert!(result.success(), "stderr: {}", result.stderr());
    assert!(result.stdout().contains("No database changes detected."));
    assert!(!workspace.path("out.sql").exists());
}

#[test]
fn compiler_failure_exits_non_zero_with_message() {
    let workspace = Workspace::new()
        .reply("describe_deployment", deployed())
        .reply(
            "migration",
            json!({ "success": false, "script": "", "error_message": "Unknown concept: Blog.Pst" }),
        );

    let result = workspace.run(
        &["--project-id", "p1", "--temp", "scratch", "--force", "migrate"],
        "",
    );

    assert!(!result.success());
    assert!(result.stderr().contains("error creating SQL migration"));
    assert!(result.stderr().contains("Unknown concept: Blog.Pst"));
}

#[test]
fn occupied_temp_path_without_force_is_refused_when_not_interactive() {
    let workspace = Workspace::new().reply("describe_deployment", deployed());
    fs::create_dir_all(workspace.path("scratch")).expect("mkdir");
    fs::write(workspace.path("scratch/keep.txt"), "mine").expect("write");

    let result = workspace.run(&["--project-id", "p1", "--temp", "scratch", "migrate"], "");

    assert!(!result.success());
    assert!(workspace.path("scratch/keep.txt").exists());
    assert!(workspace.calls().is_empty());
}
