// Round-trip law: V0 -> V1 -> V0 is the identity on fields V0 can carry.

//! Round-trip tests for V0/V1 wire protocol conversions.

use agentarena_contract::RequestV0;
use agentarena_contract::v0::ActionV0;
use serde_json::json;

#[test]
fn v0_request_round_trips_through_v1() {
    let original = RequestV0 {
        protocol_version: 0,
        agent: "nimplayer".to_owned(),
        pwd: Some("secret".to_owned()),
        actions: vec![ActionV0 { run: "5#2".to_owned(), action: json!(3) }],
        single_request: true,
        client: Some("cli".to_owned()),
    };

    let v1 = original.to_v1().expect("valid conversion");
    assert_eq!(v1.agent, original.agent);
    assert_eq!(v1.pwd, original.pwd);
    assert!(!v1.parallel_runs);
    assert_eq!(v1.actions.len(), 1);
    assert_eq!(v1.actions[0].run.get(), 5);
    assert_eq!(v1.actions[0].act_no, 2);
    assert_eq!(v1.actions[0].action, original.actions[0].action);
}
