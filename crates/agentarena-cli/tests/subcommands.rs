// crates/agentarena-cli/tests/subcommands.rs
// ============================================================================
// Module: CLI Subcommand Tests
// Description: Integration tests for the agentarena binary's administrative
//              and action-submission subcommands.
// Purpose: Exercise the dispatcher end to end through the compiled binary,
//          since main.rs exposes no library surface for tests to call
//          directly.
// Dependencies: agentarena binary
// ============================================================================

//! Integration tests for the agentarena binary's subcommands.

#![allow(
    clippy::unwrap_used,
    clippy::panic,
    reason = "Test assertions are permitted to unwrap and panic directly."
)]

use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

fn agentarena_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_agentarena"))
}

struct Harness {
    _dir: tempfile::TempDir,
    config_path: PathBuf,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("agentarena.toml");
        let db_path = dir.path().join("arena.sqlite3");
        std::fs::write(
            &config_path,
            format!(
                "database_path = {db_path:?}\nadmin_password_hashes = [{:?}]\n",
                agentarena_engine::auth::hash_password("admin-secret")
            ),
        )
        .unwrap();
        Self { _dir: dir, config_path }
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(agentarena_bin())
            .arg("--config")
            .arg(&self.config_path)
            .args(args)
            .output()
            .expect("run agentarena binary")
    }
}

fn stdout_json(output: &Output) -> serde_json::Value {
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).expect("stdout is valid JSON")
}

#[test]
fn make_env_then_make_agent_then_act_round_trips() {
    let h = Harness::new();

    let out = h.run(&["make-env", "--admin-password", "admin-secret", "arena", "nim", "Nim"]);
    let body = stdout_json(&out);
    assert_eq!(body["env"], "arena");

    let out = h.run(&["make-agent", "--admin-password", "admin-secret", "arena", "player-one"]);
    let body = stdout_json(&out);
    let password = body["password"].as_str().unwrap().to_owned();
    assert_eq!(body["agent"], "arena/player-one");

    let out = h.run(&["act", "arena", "player-one", "--password", &password]);
    let body = stdout_json(&out);
    assert!(body["action_requests"].is_array());
}

#[test]
fn make_env_rejects_wrong_admin_password() {
    let h = Harness::new();
    let out = h.run(&["make-env", "--admin-password", "not-the-password", "arena", "nim", "Nim"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("admin authorization failed"));
}

#[test]
fn block_agent_then_act_is_rejected() {
    let h = Harness::new();
    h.run(&["make-env", "--admin-password", "admin-secret", "arena", "nim", "Nim"]);
    let created = stdout_json(&h.run(&["make-agent", "--admin-password", "admin-secret", "arena", "player-one"]));
    let password = created["password"].as_str().unwrap().to_owned();

    let blocked = h.run(&["block-agent", "--admin-password", "admin-secret", "arena", "player-one"]);
    let body = stdout_json(&blocked);
    assert_eq!(body["status"], "locked");

    let out = h.run(&["act", "arena", "player-one", "--password", &password]);
    assert!(!out.status.success());
}

#[test]
fn results_reports_zero_runs_for_a_fresh_agent() {
    let h = Harness::new();
    h.run(&["make-env", "--admin-password", "admin-secret", "arena", "nim", "Nim"]);
    h.run(&["make-agent", "--admin-password", "admin-secret", "arena", "player-one"]);

    let out = h.run(&["results", "--admin-password", "admin-secret", "arena"]);
    let body = stdout_json(&out);
    let agents = body["arena"].as_array().unwrap();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0]["total_runs"], 0);
}

#[test]
fn remove_nonrecent_runs_succeeds_on_an_empty_environment() {
    let h = Harness::new();
    h.run(&["make-env", "--admin-password", "admin-secret", "arena", "nim", "Nim"]);

    let out = h.run(&["remove-nonrecent-runs", "--admin-password", "admin-secret", "arena"]);
    let body = stdout_json(&out);
    assert_eq!(body["deleted"], 0);
}

#[test]
fn act_rejects_an_unknown_agent() {
    let h = Harness::new();
    h.run(&["make-env", "--admin-password", "admin-secret", "arena", "nim", "Nim"]);

    let out = h.run(&["act", "arena", "ghost", "--password", "whatever"]);
    assert!(!out.status.success());
}

#[test]
fn delete_environment_cascades_so_a_later_make_agent_sees_a_clean_environment() {
    let h = Harness::new();
    h.run(&["make-env", "--admin-password", "admin-secret", "arena", "nim", "Nim"]);
    h.run(&["make-agent", "--admin-password", "admin-secret", "arena", "player-one"]);

    let out = h.run(&["delete-environment", "--admin-password", "admin-secret", "arena"]);
    let body = stdout_json(&out);
    assert_eq!(body["status"], "deleted");
    assert_eq!(body["env"], "arena");

    let out = h.run(&["make-agent", "--admin-password", "admin-secret", "arena", "player-one"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("arena"));
}

#[test]
fn delete_environment_rejects_an_unknown_environment() {
    let h = Harness::new();
    let out = h.run(&["delete-environment", "--admin-password", "admin-secret", "ghost-env"]);
    assert!(!out.status.success());
}

#[test]
fn act_rejects_a_nonpositive_run_id_with_a_clean_argument_error_rather_than_a_panic() {
    let h = Harness::new();
    h.run(&["make-env", "--admin-password", "admin-secret", "arena", "nim", "Nim"]);
    let created = stdout_json(&h.run(&["make-agent", "--admin-password", "admin-secret", "arena", "player-one"]));
    let password = created["password"].as_str().unwrap().to_owned();

    let out = h.run(&["act", "arena", "player-one", "--password", &password, "--abandon", "0"]);
    assert!(!out.status.success());
    assert!(!String::from_utf8_lossy(&out.stderr).to_lowercase().contains("panicked"));
}
