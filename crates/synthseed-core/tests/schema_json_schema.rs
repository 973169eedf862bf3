use schemars::schema_for;
use synthseed_core::TableDocument;

#[test]
fn json_schema_describes_table_document() {
    let generated = schema_for!(TableDocument);
    let json = serde_json::to_value(&generated).expect("serialize generated schema");

    let properties = json
        .get("properties")
        .and_then(|value| value.as_object())
        .expect("properties object");
    for key in ["faker_schema", "amount", "parent_table_ratio", "populated_by_migration"] {
        assert!(properties.contains_key(key), "missing property {key}");
    }

    assert_eq!(
        json.get("additionalProperties"),
        Some(&serde_json::Value::Bool(false))
    );

    let definitions = json
        .get("definitions")
        .and_then(|value| value.as_object())
        .expect("definitions object");
    assert!(definitions.contains_key("GenerationRule"));
    assert!(definitions.contains_key("ForeignKeyRef"));
}
