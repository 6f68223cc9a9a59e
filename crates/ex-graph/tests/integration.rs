//! Scenario tests stepping whole graphs.

use ex_components::PropertyValue;
use ex_definition::{Definition, ModelDef};
use ex_graph::{GraphError, ModelGraph, PropertyPath};
use proptest::prelude::*;

fn two_compartments(r: f64) -> Definition {
    let mut def = Definition {
        modeling_stepsize: 0.01,
        ..Definition::default()
    };
    def.models.insert("A", ModelDef::new("Capacitance").with("vol", 1.0).with("el_base", 1.0));
    def.models.insert("B", ModelDef::new("Capacitance").with("vol", 0.0).with("el_base", 1.0));
    def.models.insert(
        "R",
        ModelDef::new("Resistor")
            .with("comp_from", "A")
            .with("comp_to", "B")
            .with("r_for", r)
            .with("r_back", r),
    );
    def
}

fn step_all(graph: &mut ModelGraph, dt: f64, time: f64) {
    let ids: Vec<_> = graph.ids().collect();
    for id in ids {
        if graph.is_active(id) {
            graph.step_component(id, dt, time).unwrap();
        }
    }
}

fn number(graph: &ModelGraph, path: &str) -> f64 {
    graph.resolve_str(path).unwrap().as_number().unwrap()
}

#[test]
fn two_compartment_decay_conserves_volume() {
    let (mut graph, report) = ModelGraph::from_definition(&two_compartments(1.0));
    assert!(report.is_ok());
    let mut last_flow = f64::INFINITY;
    for i in 0..100 {
        step_all(&mut graph, 0.01, i as f64 * 0.01);
        let flow = number(&graph, "R.flow");
        assert!(flow <= last_flow);
        last_flow = flow;
        let total = number(&graph, "A.vol") + number(&graph, "B.vol");
        assert!((total - 1.0).abs() < 1e-12);
    }
    assert!(last_flow > 0.0);
}

#[test]
fn disabled_link_stops_transfer() {
    let (mut graph, _) = ModelGraph::from_definition(&two_compartments(1.0));
    graph.call("R", "disable", &[]).unwrap();
    for _ in 0..10 {
        step_all(&mut graph, 0.01, 0.0);
    }
    assert_eq!(number(&graph, "A.vol"), 1.0);
    assert_eq!(graph.resolve_str("R.is_enabled").unwrap(), PropertyValue::Bool(false));
}

#[test]
fn closing_a_valve_uses_flow_capability() {
    let (mut graph, _) = ModelGraph::from_definition(&two_compartments(1.0));
    graph.call("R", "close", &[]).unwrap();
    step_all(&mut graph, 0.01, 0.0);
    assert_eq!(number(&graph, "R.flow"), 0.0);
    assert!(matches!(
        graph.call("A", "close", &[]),
        Err(GraphError::NotFlowControllable { .. })
    ));
}

#[test]
fn set_and_resolve_paths() {
    let (mut graph, _) = ModelGraph::from_definition(&two_compartments(1.0));
    let path = PropertyPath::new("A", "el_base_factor");
    graph.set(&path, &PropertyValue::Number(2.0)).unwrap();
    assert_eq!(graph.number(&path).unwrap(), 2.0);
    assert!(matches!(
        graph.resolve_str("A.colour"),
        Err(GraphError::UnknownProperty { .. })
    ));
    assert!(matches!(
        graph.resolve_str("Z.vol"),
        Err(GraphError::UnknownModel { .. })
    ));
    assert!(matches!(graph.resolve_str("A"), Err(GraphError::InvalidPath { .. })));
}

#[test]
fn broken_reference_is_reported_per_component() {
    let mut def = two_compartments(1.0);
    def.models.get_mut("R").unwrap().properties.insert("comp_to".into(), "NOPE".into());
    let (mut graph, report) = ModelGraph::from_definition(&def);
    assert!(report.is_ok());
    let id = graph.id("R").unwrap();
    let err = graph.step_component(id, 0.01, 0.0).unwrap_err();
    assert!(matches!(err, GraphError::Component { .. }));
    // the slot is restored after a failed step
    assert!(graph.resolve_str("R.flow").is_ok());
}

proptest! {
    #[test]
    fn total_volume_is_invariant(r in 0.05f64..20.0, steps in 1usize..300) {
        let (mut graph, _) = ModelGraph::from_definition(&two_compartments(r));
        for _ in 0..steps {
            step_all(&mut graph, 0.01, 0.0);
        }
        let total = number(&graph, "A.vol") + number(&graph, "B.vol");
        prop_assert!((total - 1.0).abs() < 1e-12);
    }
}
