// crates/agentarena-cli/src/main.rs
// ============================================================================
// Module: Agent Arena CLI Entry Point
// Description: Thin administrative and action-submission command dispatcher.
// Purpose: Drive agentarena-engine's dispatcher and admin operations
//          directly against a SQLite-backed store, without an HTTP layer.
// Dependencies: clap, agentarena-config, agentarena-core, agentarena-contract,
//               agentarena-engine, agentarena-registry, agentarena-store-sqlite
// ============================================================================

//! ## Overview
//! Every subcommand opens the configured store, runs exactly one operation,
//! and prints its result as JSON to stdout. Administrative subcommands
//! (`make-env`, `make-agent`, `block-agent`, `unblock-agent`, `results`,
//! `remove-nonrecent-runs`, `delete-environment`) require `--admin-password`
//! to match one of the config file's `admin_password_hashes`, mirroring the
//! `/makeenv`, `/makeagent`, `/blockagent`, `/unblockagent`, `/results`,
//! `/removenonrecentruns` endpoints this crate does not itself serve over
//! HTTP. `act` exercises the dispatcher directly with agent credentials,
//! standing in for the request body an HTTP layer would otherwise forward.
//!
//! Only the `nim` capability (`agentarena-engine`'s test scaffolding) is
//! registered; a real deployment would register production capabilities at
//! startup instead. Plugin hot-reload is a named Non-goal.

use std::io::Write as _;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use serde_json::Value;
use serde_json::json;

use agentarena_config::ServerConfig;
use agentarena_contract::v1::ActionV1;
use agentarena_contract::v1::RequestV1;
use agentarena_core::identifiers::AgentId;
use agentarena_core::identifiers::AgentName;
use agentarena_core::identifiers::EnvSlug;
use agentarena_core::identifiers::RunId;
use agentarena_core::model::AgentStatus;
use agentarena_engine::ActManager;
use agentarena_engine::EngineError;
use agentarena_engine::NoopMetrics;
use agentarena_engine::admin;
use agentarena_engine::auth;
use agentarena_engine::testing::nim::NimCapabilityFactory;
use agentarena_registry::CapabilityRegistry;
use agentarena_store_sqlite::SqliteStore;
use agentarena_store_sqlite::SqliteStoreConfig;

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "agentarena", disable_help_subcommand = true)]
struct Cli {
    /// Path to the `ServerConfig` TOML file.
    #[arg(long, global = true, default_value = "agentarena.toml")]
    config: std::path::PathBuf,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Registers a new environment.
    MakeEnv(MakeEnvArgs),
    /// Creates a new agent account, printing its generated password once.
    MakeAgent(AdminAgentArgs),
    /// Locks an agent account.
    BlockAgent(AdminAgentArgs),
    /// Unlocks an agent account.
    UnblockAgent(AdminAgentArgs),
    /// Submits a batch of actions and/or abandons for one agent.
    Act(ActArgs),
    /// Prints rating snapshots for every agent, optionally scoped to one environment.
    Results(ResultsArgs),
    /// Deletes finished runs outside each agent's retained window and reclaims space.
    RemoveNonrecentRuns(EnvAdminArgs),
    /// Deletes an environment, cascading to its accounts, aggregates and runs.
    DeleteEnvironment(EnvAdminArgs),
}

#[derive(Args, Debug)]
struct MakeEnvArgs {
    #[command(flatten)]
    admin: AdminAuth,
    /// Environment slug.
    slug: String,
    /// Capability registry reference string (e.g. `nim`).
    env_class: String,
    /// Human-facing display name.
    display_name: String,
    /// Opaque capability configuration, as a JSON object.
    #[arg(long, default_value = "{}")]
    config_json: String,
    /// Replace an existing environment with the same slug.
    #[arg(long)]
    overwrite: bool,
}

#[derive(Args, Debug)]
struct AdminAgentArgs {
    #[command(flatten)]
    admin: AdminAuth,
    /// Owning environment slug.
    env: String,
    /// Bare agent name.
    name: String,
    /// Replace an existing account under the same id (`make-agent` only).
    #[arg(long)]
    overwrite: bool,
}

#[derive(Args, Debug)]
struct ResultsArgs {
    #[command(flatten)]
    admin: AdminAuth,
    /// Restrict the snapshot to one environment.
    env: Option<String>,
}

#[derive(Args, Debug)]
struct EnvAdminArgs {
    #[command(flatten)]
    admin: AdminAuth,
    /// Environment slug.
    env: String,
}

#[derive(Args, Debug)]
struct AdminAuth {
    /// Admin password, checked against the configured admin hashes.
    #[arg(long)]
    admin_password: String,
}

#[derive(Args, Debug)]
struct ActArgs {
    /// Owning environment slug.
    env: String,
    /// Bare agent name.
    agent: String,
    /// Agent password.
    #[arg(long)]
    password: String,
    /// A submitted action as `<run-id>:<act-no>:<json-payload>`. Repeatable.
    #[arg(long = "action", value_parser = parse_action)]
    actions: Vec<ActionV1>,
    /// A run id to voluntarily abandon. Repeatable.
    #[arg(long = "abandon", value_parser = parse_run_id)]
    abandon: Vec<RunId>,
    /// Request up to the environment's full batch of outstanding runs
    /// rather than just one.
    #[arg(long)]
    parallel: bool,
}

fn parse_action(raw: &str) -> Result<ActionV1, String> {
    let mut parts = raw.splitn(3, ':');
    let (Some(run), Some(act_no), Some(payload)) = (parts.next(), parts.next(), parts.next()) else {
        return Err("expected <run-id>:<act-no>:<json-payload>".to_owned());
    };
    let run = parse_run_id(run)?;
    let act_no: u32 = act_no.parse().map_err(|_| format!("invalid act_no {act_no:?}"))?;
    let action: Value = serde_json::from_str(payload).map_err(|e| format!("invalid action JSON: {e}"))?;
    Ok(ActionV1 { run, act_no, action })
}

/// Parses and validates a raw run id from a command-line argument.
fn parse_run_id(raw: &str) -> Result<RunId, String> {
    let raw: i64 = raw.parse().map_err(|_| format!("invalid run id {raw:?}"))?;
    RunId::try_new(raw).map_err(|e| e.to_string())
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to load config: {0}")]
    Config(#[from] agentarena_config::ConfigError),
    #[error("failed to open store: {0}")]
    Store(#[from] agentarena_core::store::StoreError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("invalid identifier: {0}")]
    Identifier(#[from] agentarena_core::identifiers::IdentifierError),
    #[error("invalid config JSON: {0}")]
    ConfigJson(#[source] serde_json::Error),
    #[error("admin authorization failed")]
    AdminAuthFailed,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(value) => {
            let rendered = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
            if write_stdout_line(&rendered).is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            let _ = write_stderr_line(&format!("error: {err}"));
            ExitCode::FAILURE
        }
    }
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    writeln!(std::io::stdout(), "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    writeln!(std::io::stderr(), "{message}")
}

/// Opens the `SQLite` store the configuration file points at.
fn open_store(config: &ServerConfig) -> Result<SqliteStore, CliError> {
    Ok(SqliteStore::open(SqliteStoreConfig::new(config.database_path.clone()))?)
}

/// Builds the capability registry available to this binary: only the `nim`
/// worked example, since plugin loading is out of scope.
fn registry() -> CapabilityRegistry {
    CapabilityRegistry::builder().factory("nim", NimCapabilityFactory).build()
}

/// Verifies `password` against the configured admin hashes.
fn check_admin(config: &ServerConfig, password: &str) -> Result<(), CliError> {
    if auth::authenticate_admin(password, &config.admin_password_hashes, &NoopMetrics) {
        Ok(())
    } else {
        Err(CliError::AdminAuthFailed)
    }
}

fn run(cli: Cli) -> Result<Value, CliError> {
    let config = ServerConfig::load(&cli.config)?;

    match cli.command {
        Commands::MakeEnv(args) => {
            check_admin(&config, &args.admin.admin_password)?;
            let store = open_store(&config)?;
            let slug = EnvSlug::parse(args.slug)?;
            let config_json: Value = serde_json::from_str(&args.config_json).map_err(CliError::ConfigJson)?;
            admin::create_environment(&store, &slug, args.env_class, args.display_name, config_json, args.overwrite)?;
            Ok(json!({ "status": "created", "env": slug.to_string() }))
        }
        Commands::MakeAgent(args) => {
            check_admin(&config, &args.admin.admin_password)?;
            let store = open_store(&config)?;
            let env = EnvSlug::parse(args.env)?;
            let name = AgentName::parse(args.name)?;
            let created = admin::create_agent(&store, &env, &name, args.overwrite)?;
            Ok(json!({ "agent": created.id.to_string(), "password": created.password }))
        }
        Commands::BlockAgent(args) => set_status(&config, args, AgentStatus::Locked),
        Commands::UnblockAgent(args) => set_status(&config, args, AgentStatus::Active),
        Commands::Act(args) => {
            let store = open_store(&config)?;
            let reg = registry();
            let env = EnvSlug::parse(args.env.clone())?;
            let manager = ActManager::new(&store, &reg, &NoopMetrics);
            let request = RequestV1 {
                protocol_version: 1,
                agent: args.agent,
                pwd: Some(args.password),
                actions: args.actions,
                to_abandon: args.abandon,
                parallel_runs: args.parallel,
                client: Some("agentarena-cli".to_owned()),
            };
            let response = manager.process_batch(&env, request)?;
            Ok(serde_json::to_value(response).unwrap_or(Value::Null))
        }
        Commands::Results(args) => {
            check_admin(&config, &args.admin.admin_password)?;
            let store = open_store(&config)?;
            match args.env {
                Some(env) => {
                    let env = EnvSlug::parse(env)?;
                    let results = admin::results_for_env(&store, &env, 0.0)?;
                    Ok(json!({ env.to_string(): results_to_json(&results) }))
                }
                None => {
                    let results = admin::results(&store, 0.0)?;
                    let mut out = serde_json::Map::new();
                    for (env, agents) in results {
                        out.insert(env.to_string(), results_to_json(&agents));
                    }
                    Ok(Value::Object(out))
                }
            }
        }
        Commands::RemoveNonrecentRuns(args) => {
            check_admin(&config, &args.admin.admin_password)?;
            let store = open_store(&config)?;
            let env = EnvSlug::parse(args.env)?;
            let deleted = admin::remove_nonrecent_runs(&store, &env, &NoopMetrics)?;
            Ok(json!({ "deleted": deleted }))
        }
        Commands::DeleteEnvironment(args) => {
            check_admin(&config, &args.admin.admin_password)?;
            let store = open_store(&config)?;
            let env = EnvSlug::parse(args.env)?;
            admin::delete_environment(&store, &env)?;
            Ok(json!({ "status": "deleted", "env": env.to_string() }))
        }
    }
}

/// Applies `status` to the named agent and reports the change as JSON.
fn set_status(config: &ServerConfig, args: AdminAgentArgs, status: AgentStatus) -> Result<Value, CliError> {
    check_admin(config, &args.admin.admin_password)?;
    let store = open_store(config)?;
    let env = EnvSlug::parse(args.env)?;
    let name = AgentName::parse(args.name)?;
    let id = AgentId::new(env, name);
    admin::set_agent_status(&store, &id, status)?;
    let status_label = match status {
        AgentStatus::Locked => "locked",
        AgentStatus::Active => "active",
    };
    Ok(json!({ "agent": id.to_string(), "status": status_label }))
}

fn results_to_json(results: &[admin::AgentResult]) -> Value {
    Value::Array(
        results
            .iter()
            .map(|r| {
                json!({
                    "agent": r.agent,
                    "rating": r.rating,
                    "fully_evaluated": r.fully_evaluated,
                    "total_runs": r.total_runs,
                })
            })
            .collect(),
    )
}
