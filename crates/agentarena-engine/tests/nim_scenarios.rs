// crates/agentarena-engine/tests/nim_scenarios.rs
// ============================================================================
// Test: End-to-end run lifecycle over the Nim test capability.
// Purpose: Exercise ActManager::process_batch across a full winning game,
//          the fully_evaluated/best_rating transition, stale-act_no and
//          illegal-move rejection, and voluntary abandon.
// ============================================================================

//! End-to-end run lifecycle tests over the Nim test capability.

#![allow(
    clippy::unwrap_used,
    clippy::panic,
    reason = "Test assertions are permitted to unwrap and panic directly."
)]

use agentarena_contract::v1::ActionRequestV1;
use agentarena_contract::v1::ActionV1;
use agentarena_contract::v1::RequestV1;
use agentarena_core::identifiers::AgentId;
use agentarena_core::identifiers::AgentName;
use agentarena_core::identifiers::EnvSlug;
use agentarena_core::store::PersistentStore;
use agentarena_engine::admin;
use agentarena_engine::dispatcher::ActManager;
use agentarena_engine::telemetry::NoopMetrics;
use agentarena_engine::testing::nim::NimCapabilityFactory;
use agentarena_registry::CapabilityRegistry;
use agentarena_store_sqlite::SqliteStore;
use serde_json::json;

fn env_slug() -> EnvSlug {
    EnvSlug::parse("nim").unwrap()
}

fn agent_name() -> AgentName {
    AgentName::parse("player").unwrap()
}

fn setup(min_runs_for_fully_evaluated: u64) -> (SqliteStore, CapabilityRegistry, String) {
    let store = SqliteStore::open_in_memory().unwrap();
    admin::create_environment(
        &store,
        &env_slug(),
        "nim".to_owned(),
        "Nim".to_owned(),
        json!({ "strong": true, "random_start": false, "min_runs_for_fully_evaluated": min_runs_for_fully_evaluated }),
        false,
    )
    .unwrap();
    let created = admin::create_agent(&store, &env_slug(), &agent_name(), false).unwrap();
    let registry = CapabilityRegistry::builder().factory("nim", NimCapabilityFactory).build();
    (store, registry, created.password)
}

fn request(pwd: &str, actions: Vec<ActionV1>, to_abandon: Vec<agentarena_core::identifiers::RunId>) -> RequestV1 {
    RequestV1 {
        protocol_version: 1,
        agent: "player".to_owned(),
        pwd: Some(pwd.to_owned()),
        actions,
        to_abandon,
        parallel_runs: true,
        client: None,
    }
}

/// Optimal Nim move against the `strong` opponent: leave a multiple of 4.
fn best_move(remaining: i64) -> i64 {
    let m = remaining % 4;
    if m == 0 { 1 } else { m }
}

fn offer(ar: &ActionRequestV1) -> i64 {
    ar.percept.as_i64().unwrap()
}

#[test]
fn initial_batch_offers_five_fresh_runs_at_act_no_zero() {
    let (store, registry, pwd) = setup(50);
    let manager = ActManager::new(&store, &registry, &NoopMetrics);

    let response = manager.process_batch(&env_slug(), request(&pwd, Vec::new(), Vec::new())).unwrap();

    assert_eq!(response.action_requests.len(), 5);
    assert_eq!(response.active_runs.len(), 5);
    for ar in &response.action_requests {
        assert_eq!(ar.act_no, 0);
        assert_eq!(offer(ar), 10);
    }
}

#[test]
fn playing_optimally_wins_within_four_rounds() {
    let (store, registry, pwd) = setup(50);
    let manager = ActManager::new(&store, &registry, &NoopMetrics);

    let mut response = manager.process_batch(&env_slug(), request(&pwd, Vec::new(), Vec::new())).unwrap();
    let run = response.action_requests[0].run;

    let mut rounds = 0;
    let mut won = false;
    while rounds < 4 {
        let offered = response.action_requests.iter().find(|ar| ar.run == run).unwrap();
        let action = ActionV1 { run, act_no: offered.act_no, action: json!(best_move(offer(offered))) };
        response = manager.process_batch(&env_slug(), request(&pwd, vec![action], Vec::new())).unwrap();
        rounds += 1;
        if let Some(outcome) = response.finished_runs.get(&run) {
            assert_eq!(*outcome, 1.0);
            won = true;
            break;
        }
    }
    assert!(won, "expected a win within 4 rounds of optimal play");
}

#[test]
fn fully_evaluated_latches_after_min_runs_and_best_rating_tracks_current() {
    let min_runs = 3u64;
    let (store, registry, pwd) = setup(min_runs);
    let manager = ActManager::new(&store, &registry, &NoopMetrics);

    let agent_id = AgentId::new(env_slug(), agent_name());
    let mut wins = 0u64;

    while wins < min_runs {
        let mut response = manager.process_batch(&env_slug(), request(&pwd, Vec::new(), Vec::new())).unwrap();
        let run = response.action_requests[0].run;
        loop {
            let offered = response.action_requests.iter().find(|ar| ar.run == run).unwrap();
            let action = ActionV1 { run, act_no: offered.act_no, action: json!(best_move(offer(offered))) };
            response = manager.process_batch(&env_slug(), request(&pwd, vec![action], Vec::new())).unwrap();
            if response.finished_runs.contains_key(&run) {
                wins += 1;
                break;
            }
        }
    }

    let mut session = store.begin().unwrap();
    let aggregate = session.load_aggregate(&agent_id).unwrap().expect("aggregate created after first finished run");
    assert!(aggregate.fully_evaluated);
    assert_eq!(aggregate.total_runs, min_runs);
    assert_eq!(aggregate.current_rating, 1.0);
    assert_eq!(aggregate.best_rating, 1.0);
}

#[test]
fn wrong_act_no_is_rejected_without_mutating_the_run() {
    let (store, registry, pwd) = setup(50);
    let manager = ActManager::new(&store, &registry, &NoopMetrics);

    let first = manager.process_batch(&env_slug(), request(&pwd, Vec::new(), Vec::new())).unwrap();
    let run = first.action_requests[0].run;

    let stale_action = ActionV1 { run, act_no: 7, action: json!(1) };
    let response = manager.process_batch(&env_slug(), request(&pwd, vec![stale_action], Vec::new())).unwrap();

    assert_eq!(response.messages.len(), 1);
    assert_eq!(response.messages[0].kind.as_str(), "error");
    assert!(response.messages[0].content.contains("Wrong action number"));
    assert!(response.finished_runs.is_empty());

    let offered_again = response.action_requests.iter().find(|ar| ar.run == run).unwrap();
    assert_eq!(offered_again.act_no, 0, "run must still be at act_no 0 after the rejected submission");
}

#[test]
fn illegal_move_is_rejected_and_the_run_is_re_offered() {
    let (store, registry, pwd) = setup(50);
    let manager = ActManager::new(&store, &registry, &NoopMetrics);

    let first = manager.process_batch(&env_slug(), request(&pwd, Vec::new(), Vec::new())).unwrap();
    let run = first.action_requests[0].run;

    let illegal_action = ActionV1 { run, act_no: 0, action: json!(5) };
    let response = manager.process_batch(&env_slug(), request(&pwd, vec![illegal_action], Vec::new())).unwrap();

    assert_eq!(response.messages.len(), 1);
    assert_eq!(response.messages[0].kind.as_str(), "error");

    let offered_again = response.action_requests.iter().find(|ar| ar.run == run).unwrap();
    assert_eq!(offered_again.act_no, 0);
    assert!(response.active_runs.contains(&run));
}

#[test]
fn abandoning_a_run_records_a_zero_outcome_and_increments_total_runs() {
    let (store, registry, pwd) = setup(50);
    let manager = ActManager::new(&store, &registry, &NoopMetrics);

    let first = manager.process_batch(&env_slug(), request(&pwd, Vec::new(), Vec::new())).unwrap();
    let run = first.action_requests[0].run;

    let response = manager.process_batch(&env_slug(), request(&pwd, Vec::new(), vec![run])).unwrap();

    assert_eq!(response.messages.len(), 1);
    assert_eq!(response.messages[0].kind.as_str(), "warning");
    assert!(response.messages[0].content.contains("Run abandoned"));
    assert_eq!(response.finished_runs.get(&run), Some(&0.0));

    let agent_id = AgentId::new(env_slug(), agent_name());
    let mut session = store.begin().unwrap();
    let aggregate = session.load_aggregate(&agent_id).unwrap().expect("aggregate created after the abandoned run");
    assert_eq!(aggregate.total_runs, 1);
}
