use ex_app::{Response, ResponseKind, Session, DriverConfig};
use ex_sim::EngineConfig;
use serde_json::json;

const DEFINITION: &str = r#"{
    "name": "two compartments",
    "modeling_stepsize": 0.0005,
    "models": {
        "A": { "model_type": "BloodCapacitance", "vol": 0.1, "u_vol": 0.05, "el_base": 1000.0 },
        "B": { "model_type": "BloodCapacitance", "vol": 0.05, "u_vol": 0.05, "el_base": 1000.0 },
        "AB": { "model_type": "BloodResistor", "comp_from": "A", "comp_to": "B", "r_for": 100.0, "r_back": 100.0 }
    }
}"#;

fn envelope(method: &str, message: &str, payload: serde_json::Value) -> String {
    json!({ "type": method, "message": message, "payload": payload }).to_string()
}

fn find(out: &[Response], kind: ResponseKind) -> &Response {
    out.iter()
        .find(|r| r.kind == kind)
        .unwrap_or_else(|| panic!("no {kind:?} in {out:?}"))
}

fn session() -> Session {
    let mut s = Session::new(EngineConfig::default(), DriverConfig::default());
    let out = s.handle_json(&envelope("POST", "build", json!(DEFINITION)));
    find(&out, ResponseKind::ModelReady);
    s
}

#[test]
fn host_round_trip_over_json() {
    let mut s = session();
    assert!(s.handle_json(&envelope("POST", "watch", json!(["AB.flow", "A.pres"]))).is_empty());
    assert!(s.handle_json(&envelope("POST", "watch_slow", json!("B.vol"))).is_empty());

    let out = s.handle_json(&envelope("POST", "calc", json!(2)));
    let data = find(&out, ResponseKind::Data).payload.as_array().unwrap().clone();
    assert!(data.len() > 100);
    assert!(data[0].get("AB.flow").is_some());
    assert!(data[0].get("time").is_some());
    let slow = find(&out, ResponseKind::DataSlow).payload.as_array().unwrap().clone();
    assert_eq!(slow.len(), 1);

    let again = s.handle_json(&envelope("GET", "data", json!(null)));
    assert_eq!(again[0].payload, json!([]));
}

#[test]
fn property_tasks_and_function_calls() {
    let mut s = session();
    let task = json!({"model": "AB", "prop1": "r_for", "prop2": null, "t": 200.0, "it": 0.0, "at": 0.0});
    assert!(s.handle_json(&envelope("PUT", "property_value", task)).is_empty());
    let call = json!({"func": "AB.close", "args": [], "at": 0.0});
    assert!(s.handle_json(&envelope("POST", "call", call)).is_empty());
    s.handle_json(&envelope("POST", "calc", json!(0.1)));

    let out = s.handle_json(&envelope("GET", "property", json!("AB.r_for")));
    assert_eq!(find(&out, ResponseKind::PropValue).payload["value"], json!(200.0));
    let out = s.handle_json(&envelope("GET", "property", json!("AB.no_flow")));
    assert_eq!(find(&out, ResponseKind::PropValue).payload["value"], json!(true));
}

#[test]
fn errors_come_back_as_status() {
    let mut s = session();
    let out = s.handle_json(&envelope("GET", "property", json!("Nope.vol")));
    assert!(out[0].is_error());
    let out = s.handle_json(&envelope("POST", "watch", json!("A.nothing")));
    assert!(out[0].is_error());
    let out = s.handle_json(&envelope("POST", "call", json!({"func": "A.close"})));
    assert!(out.is_empty(), "deferred calls fail at run time, not at submission");
    let out = s.handle_json(&envelope("PATCH", "state", json!(null)));
    assert!(out[0].is_error());
}

#[test]
fn saved_state_rebuilds_to_the_same_state() {
    let mut s = session();
    s.handle_json(&envelope("POST", "calc", json!(0.5)));
    let out = s.handle_json(&envelope("POST", "save", json!(null)));
    let saved = find(&out, ResponseKind::SavedState).payload.clone();
    let definition = saved["definition"].clone();
    assert!(saved["saved_at"].as_str().is_some());

    let state_before = find(&s.handle_json(&envelope("GET", "state", json!(null))), ResponseKind::State)
        .payload
        .clone();
    let mut rebuilt = Session::new(EngineConfig::default(), DriverConfig::default());
    let out = rebuilt.handle_json(&envelope("POST", "build", definition));
    find(&out, ResponseKind::ModelReady);
    let state_after = find(&rebuilt.handle_json(&envelope("GET", "state", json!(null))), ResponseKind::State)
        .payload
        .clone();
    assert_eq!(state_before["A"]["vol"], state_after["A"]["vol"]);
    assert_eq!(state_before["B"]["vol"], state_after["B"]["vol"]);
}
