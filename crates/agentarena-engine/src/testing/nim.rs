// crates/agentarena-engine/src/testing/nim.rs
// ============================================================================
// Module: Nim Test Capability
// Description: A tiny subtraction game used only to exercise the dispatcher.
// Purpose: Give integration tests a minimal, deterministic-enough capability
//          with both a winning and a losing path reachable in few moves.
// Dependencies: agentarena-core, serde_json
// ============================================================================

//! ## Overview
//! Not a production plugin: this reproduces `example_envs/simple_nim` purely
//! as test scaffolding for `agentarena-engine`'s integration suite. Two
//! players alternately remove 1-3 objects from a pile; whoever takes the
//! last one wins. A "strong" opponent always forces a losing position
//! (`remaining % 4`) when one exists, which lets a test drive a run to
//! victory in a bounded, predictable number of rounds.

use rand::Rng;
use rand::thread_rng;
use serde_json::Value;
use serde_json::json;

use agentarena_core::capability::CapabilityError;
use agentarena_core::capability::EnvironmentCapability;
use agentarena_core::capability::EnvironmentCapabilityFactory;
use agentarena_core::model::ActionResult;
use agentarena_core::model::EnvSettings;
use agentarena_core::model::Percept;
use agentarena_core::model::RatingObjective;
use agentarena_core::model::RatingStrategy;
use agentarena_core::model::RunData;

/// Starting pile size used when `random_start` is not requested.
const FIXED_START: i64 = 10;
/// Inclusive range of the opening pile when `random_start` is requested; the
/// agent moves first, so every value in this range is a first-player win.
const RANDOM_START_RANGE: (i64, i64) = (9, 11);

/// Test-only capability implementing the Nim subtraction game.
pub struct NimCapability {
    /// Whether the opponent always forces a losing position when one exists.
    strong: bool,
    /// Whether the opening pile is randomized rather than fixed.
    random_start: bool,
    /// Finished-run threshold past which an agent's rating is `fully_evaluated`.
    min_runs_for_fully_evaluated: u32,
}

impl NimCapability {
    /// Builds a capability directly, bypassing the factory/config path.
    #[must_use]
    pub const fn new(strong: bool, random_start: bool, min_runs_for_fully_evaluated: u32) -> Self {
        Self { strong, random_start, min_runs_for_fully_evaluated }
    }
}

impl EnvironmentCapability for NimCapability {
    fn settings(&self) -> EnvSettings {
        EnvSettings {
            initial_rating: 0.0,
            rating_strategy: RatingStrategy::Average,
            min_runs_for_fully_evaluated: self.min_runs_for_fully_evaluated,
            rating_objective: RatingObjective::Max,
            number_of_action_requests: 5,
            can_abandon_runs: true,
        }
    }

    fn new_run(&self) -> Value {
        let initial = if self.random_start {
            thread_rng().gen_range(RANDOM_START_RANGE.0..=RANDOM_START_RANGE.1)
        } else {
            FIXED_START
        };
        json!({ "remaining": initial, "initial": initial })
    }

    fn act(&self, action: &Value, run_data: &RunData) -> ActionResult {
        let remaining = run_data.state["remaining"].as_i64().unwrap_or(0);

        let Some(move_count) = action.as_i64() else {
            return ActionResult {
                new_state: None,
                message: Some(format!("Invalid action: {action:?}")),
                action_extra_info: None,
                outcome: None,
            };
        };
        if !(1..=3).contains(&move_count) {
            return ActionResult {
                new_state: None,
                message: Some("You have to remove 1, 2, or 3 objects".to_owned()),
                action_extra_info: None,
                outcome: None,
            };
        }
        if move_count > remaining {
            return ActionResult {
                new_state: None,
                message: Some(format!("You tried to take {move_count} objects, but only {remaining} are remaining")),
                action_extra_info: None,
                outcome: None,
            };
        }

        let updated = remaining - move_count;
        if updated == 0 {
            return ActionResult {
                new_state: Some(json!({ "remaining": 0, "initial": run_data.state["initial"] })),
                message: Some("Congratulations, you won!".to_owned()),
                action_extra_info: None,
                outcome: Some(1.0),
            };
        }

        let counter = if self.strong {
            let forced = updated % 4;
            if forced == 0 { thread_rng().gen_range(1..=3) } else { forced }
        } else {
            thread_rng().gen_range(1..=updated.min(3))
        };
        let after_counter = updated - counter;
        let message = if after_counter == 0 {
            format!("Opponent removed {counter} \u{2013} you lost.")
        } else {
            format!("Opponent removed {counter}")
        };
        ActionResult {
            new_state: Some(json!({ "remaining": after_counter, "initial": run_data.state["initial"] })),
            message: Some(message),
            action_extra_info: Some(counter.to_string()),
            outcome: if after_counter == 0 { Some(0.0) } else { None },
        }
    }

    fn get_action_request(&self, run_data: &RunData) -> Percept {
        Percept { content: run_data.state["remaining"].clone() }
    }

    fn get_abandon_outcome(&self, _run_data: &RunData) -> f64 {
        0.0
    }
}

/// Factory for [`NimCapability`], reading `strong`/`random_start` booleans
/// out of an environment's configuration blob.
pub struct NimCapabilityFactory;

impl EnvironmentCapabilityFactory for NimCapabilityFactory {
    fn build(&self, config: &Value) -> Result<Box<dyn EnvironmentCapability>, CapabilityError> {
        let strong = config.get("strong").and_then(Value::as_bool).unwrap_or(false);
        let random_start = config.get("random_start").and_then(Value::as_bool).unwrap_or(false);
        let min_runs_for_fully_evaluated =
            config.get("min_runs_for_fully_evaluated").and_then(Value::as_u64).and_then(|v| u32::try_from(v).ok()).unwrap_or(10);
        Ok(Box::new(NimCapability::new(strong, random_start, min_runs_for_fully_evaluated)))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::panic,
    reason = "Test assertions are permitted to unwrap and panic directly."
)]
mod tests {
    use super::*;
    use agentarena_core::identifiers::RunId;
    use agentarena_core::model::ActionHistoryEntry;

    fn run_data(remaining: i64) -> RunData {
        RunData {
            run_id: RunId::new(1),
            history: Vec::<ActionHistoryEntry>::new(),
            state: json!({ "remaining": remaining, "initial": remaining }),
            outcome: None,
            agent_display_name: "a".to_owned(),
        }
    }

    #[test]
    fn taking_the_last_object_wins() {
        let cap = NimCapability::new(false, false, 10);
        let result = cap.act(&json!(1), &run_data(1));
        assert_eq!(result.outcome, Some(1.0));
        assert_eq!(result.new_state.unwrap()["remaining"], json!(0));
    }

    #[test]
    fn out_of_range_move_is_rejected_without_mutating_state() {
        let cap = NimCapability::new(false, false, 10);
        let result = cap.act(&json!(4), &run_data(5));
        assert!(result.new_state.is_none());
        assert!(result.message.is_some());
    }

    #[test]
    fn strong_opponent_forces_losing_position_when_available() {
        let cap = NimCapability::new(true, false, 10);
        // remaining=5, agent takes 1 -> updated=4 -> forced = 4 % 4 = 0 -> random fallback (1..=3)
        // remaining=5, agent takes 2 -> updated=3 -> forced = 3 % 4 = 3 -> opponent takes all 3, agent loses
        let result = cap.act(&json!(2), &run_data(5));
        let remaining_after = result.new_state.unwrap()["remaining"].as_i64().unwrap();
        assert_eq!(remaining_after, 0);
        assert_eq!(result.outcome, Some(0.0));
    }

    #[test]
    fn non_numeric_action_is_rejected() {
        let cap = NimCapability::new(false, false, 10);
        let result = cap.act(&json!("nope"), &run_data(5));
        assert!(result.new_state.is_none());
    }
}
