use ex_definition::{
    Definition, ModelDef, from_json_str, load, load_json, load_yaml, save_json, save_yaml,
};

fn circulation() -> Definition {
    let mut def = Definition {
        name: "two chambers".to_string(),
        weight: Some(3.3),
        ..Definition::default()
    };
    def.models.insert(
        "AA",
        ModelDef::new("BloodCapacitance")
            .with("vol", 0.2)
            .with("el_base", 1000.0)
            .with("solutes", serde_json::json!({"na": 138.0, "k": 4.0})),
    );
    def.models.insert(
        "PERI",
        ModelDef::new("Container")
            .with("contained_components", serde_json::json!(["LV"]))
            .with_component("LV", ModelDef::new("BloodTimeVaryingElastance").with("el_min", 5.0)),
    );
    def.models.insert(
        "AA_LV",
        ModelDef::new("BloodResistor")
            .with("comp_from", "AA")
            .with("comp_to", "LV")
            .with("no_back_flow", true),
    );
    def
}

#[test]
fn roundtrip_json() {
    let def = circulation();
    let path = std::env::temp_dir().join("ex_definition_roundtrip.json");
    save_json(&path, &def).unwrap();
    let loaded = load_json(&path).unwrap();
    assert_eq!(def, loaded);
    assert_eq!(load(&path).unwrap(), def);
}

#[test]
fn roundtrip_yaml() {
    let def = circulation();
    let path = std::env::temp_dir().join("ex_definition_roundtrip.yaml");
    save_yaml(&path, &def).unwrap();
    let loaded = load_yaml(&path).unwrap();
    assert_eq!(def, loaded);
    let order: Vec<_> = loaded.models.iter().map(|(n, _)| n).collect();
    assert_eq!(order, ["AA", "PERI", "AA_LV"]);
}

#[test]
fn invalid_document_is_rejected() {
    let err = from_json_str(r#"{"modeling_stepsize": -1.0, "models": {}}"#).unwrap_err();
    assert!(err.to_string().contains("modeling_stepsize"));
}

#[test]
fn demo_definitions_load() {
    let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos");
    for name in ["two_compartments.json", "circulation.yaml"] {
        let def = load(&root.join(name)).unwrap_or_else(|e| panic!("Failed to load {name}: {e}"));
        assert!(!def.models.is_empty(), "{name}");
    }
}
