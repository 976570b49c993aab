use handoff::GraphError;
use handoff::planner::{GraphBuilder, NextRef, PlanParser, TaskGraph};
use serde_json::{Value, json};

fn build(plan: Value) -> Result<TaskGraph, GraphError> {
    GraphBuilder::build(&PlanParser::parse(plan).unwrap())
}

#[test]
fn rebuild_is_structurally_identical() {
    let plan = PlanParser::parse(json!({"plan": {"start": "s1", "steps": [
        {"id": "s1", "desc": "fan", "parallel": ["s2", "s3"], "next": "s4"},
        {"id": "s2", "desc": "a", "action": {"agent": "echo", "params": {"agent": "echo", "x": 1}}},
        {"id": "s3", "desc": "b", "action": {"agent": "status", "params": {"status": "fail"}},
         "next": {"fail": "s4", "default": "s4"}},
        {"id": "s4", "desc": "join", "action": {"agent": "echo"}}
    ]}}))
    .unwrap();

    let first = GraphBuilder::build(&plan).unwrap();
    let second = GraphBuilder::build(&plan).unwrap();
    assert_eq!(first, second);

    let s2 = first.node(first.lookup("s2").unwrap());
    let action = s2.action.as_ref().unwrap();
    assert_eq!(action.agent, "echo");
    assert!(!action.params.contains_key("agent"));
}

#[test]
fn branch_keys_survive_resolution() {
    let graph = build(json!({"plan": {"steps": [
        {"id": "s1", "next": {"success": "s2", "fail": "s3"}},
        {"id": "s2"},
        {"id": "s3"}
    ]}}))
    .unwrap();

    let NextRef::Branch(branches) = &graph.start_node().next else {
        panic!("expected branch");
    };
    assert_eq!(
        branches.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["fail", "success"]
    );
    assert_eq!(branches["fail"], graph.lookup("s3").unwrap());
}

#[test]
fn back_edge_in_outcome_map_is_rejected() {
    let err = build(json!({"plan": {"start": "s1", "steps": [
        {"id": "s1", "action": {"agent": "status"}, "next": "s2"},
        {"id": "s2", "action": {"agent": "status"}, "next": {"retry": "s1", "success": "s3"}},
        {"id": "s3"}
    ]}}))
    .unwrap_err();

    assert!(matches!(err, GraphError::CycleDetected { .. }));
}

#[test]
fn dangling_parallel_reference_is_rejected() {
    let err = build(json!({"plan": {"steps": [
        {"id": "s1", "parallel": ["s2", "ghost"]},
        {"id": "s2"}
    ]}}))
    .unwrap_err();

    assert_eq!(err.to_string(), "step s1 references unknown step: ghost");
}

#[test]
fn explicit_start_must_exist() {
    let err = build(json!({"plan": {"start": "s9", "steps": [{"id": "s1"}]}})).unwrap_err();
    assert!(matches!(err, GraphError::NoStart { requested: Some(ref id) } if id == "s9"));
}
