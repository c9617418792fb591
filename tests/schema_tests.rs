//! Tests for schema tree construction.

use preflight::schema::*;
use serde_json::json;

// ============================================================================
// Primitive Types
// ============================================================================

#[test]
fn test_parse_primitive_string_schemas() {
    assert_eq!(parse_schema(r#""null""#).unwrap().root(), &AvroSchema::Null);
    assert_eq!(
        parse_schema(r#""boolean""#).unwrap().root(),
        &AvroSchema::Boolean
    );
    assert_eq!(parse_schema(r#""int""#).unwrap().root(), &AvroSchema::Int);
    assert_eq!(parse_schema(r#""long""#).unwrap().root(), &AvroSchema::Long);
    assert_eq!(
        parse_schema(r#""float""#).unwrap().root(),
        &AvroSchema::Float
    );
    assert_eq!(
        parse_schema(r#""double""#).unwrap().root(),
        &AvroSchema::Double
    );
    assert_eq!(
        parse_schema(r#""bytes""#).unwrap().root(),
        &AvroSchema::Bytes
    );
    assert_eq!(
        parse_schema(r#""string""#).unwrap().root(),
        &AvroSchema::String
    );
}

#[test]
fn test_parse_primitive_object_schemas() {
    assert_eq!(
        parse_schema(r#"{"type":"int"}"#).unwrap().root(),
        &AvroSchema::Int
    );
    assert_eq!(
        parse_schema(r#"{"type":"string"}"#).unwrap().root(),
        &AvroSchema::String
    );
}

#[test]
fn test_logical_type_annotations_are_ignored() {
    let schema = parse_schema(r#"{"type":"long","logicalType":"timestamp-millis"}"#).unwrap();
    assert_eq!(schema.root(), &AvroSchema::Long);
}

#[test]
fn test_unknown_kind_rejected() {
    assert!(parse_schema(r#""sometype""#).is_err());
    assert!(parse_schema(r#"{"type":"imaginary"}"#).is_err());
    assert!(parse_schema(r#"true"#).is_err());
}

// ============================================================================
// Records
// ============================================================================

#[test]
fn test_parse_record_with_fields() {
    let schema = parse_schema(
        r#"{"type":"record","name":"User","namespace":"com.example","fields":[
            {"name":"id","type":"long"},
            {"name":"name","type":"string"},
            {"name":"score","type":"int","default":0}
        ]}"#,
    )
    .unwrap();

    let record = match schema.root() {
        AvroSchema::Record(r) => r,
        other => panic!("expected record, got {:?}", other),
    };
    assert_eq!(record.name.fullname(), "com.example.User");
    assert_eq!(record.fields.len(), 3);
    assert_eq!(record.fields[0].name, "id");
    assert_eq!(record.fields[0].schema, AvroSchema::Long);
    assert_eq!(record.fields[2].default, Some(json!(0)));
    assert!(record.fields[0].default.is_none());
}

#[test]
fn test_record_field_order_preserved() {
    let schema = parse_schema(
        r#"{"type":"record","name":"R","fields":[
            {"name":"z","type":"int"},
            {"name":"a","type":"int"},
            {"name":"m","type":"int"}
        ]}"#,
    )
    .unwrap();
    let record = match schema.root() {
        AvroSchema::Record(r) => r,
        other => panic!("expected record, got {:?}", other),
    };
    let names: Vec<&str> = record.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["z", "a", "m"]);
}

#[test]
fn test_duplicate_field_names_rejected() {
    let result = parse_schema(
        r#"{"type":"record","name":"R","fields":[
            {"name":"a","type":"int"},
            {"name":"a","type":"string"}
        ]}"#,
    );
    assert!(result.is_err());
}

#[test]
fn test_record_missing_fields_rejected() {
    assert!(parse_schema(r#"{"type":"record","name":"R"}"#).is_err());
}

#[test]
fn test_null_default_is_distinguished_from_no_default() {
    let schema = parse_schema(
        r#"{"type":"record","name":"R","fields":[
            {"name":"a","type":["null","int"],"default":null},
            {"name":"b","type":"int"}
        ]}"#,
    )
    .unwrap();
    let record = match schema.root() {
        AvroSchema::Record(r) => r,
        other => panic!("expected record, got {:?}", other),
    };
    assert_eq!(record.fields[0].default, Some(serde_json::Value::Null));
    assert!(record.fields[0].resolvable_default().is_none());
    assert!(record.fields[1].default.is_none());
}

// ============================================================================
// Enums
// ============================================================================

#[test]
fn test_parse_enum() {
    let schema = parse_schema(
        r#"{"type":"enum","name":"Color","symbols":["RED","GREEN","BLUE"],"default":"RED"}"#,
    )
    .unwrap();
    let color = match schema.root() {
        AvroSchema::Enum(e) => e,
        other => panic!("expected enum, got {:?}", other),
    };
    assert_eq!(color.symbols, ["RED", "GREEN", "BLUE"]);
    assert_eq!(color.default.as_deref(), Some("RED"));
    assert!(color.has_symbol("GREEN"));
    assert!(!color.has_symbol("PUCE"));
}

#[test]
fn test_duplicate_enum_symbols_rejected() {
    assert!(parse_schema(r#"{"type":"enum","name":"E","symbols":["A","A"]}"#).is_err());
}

#[test]
fn test_enum_default_must_be_declared_symbol() {
    assert!(parse_schema(r#"{"type":"enum","name":"E","symbols":["A"],"default":"B"}"#).is_err());
}

#[test]
fn test_empty_or_missing_symbols_rejected() {
    assert!(parse_schema(r#"{"type":"enum","name":"E","symbols":[]}"#).is_err());
    assert!(parse_schema(r#"{"type":"enum","name":"E"}"#).is_err());
    assert!(parse_schema(r#"{"type":"enum","name":"E","symbols":["A",3]}"#).is_err());
}

// ============================================================================
// Arrays, Maps, Fixed
// ============================================================================

#[test]
fn test_parse_array_and_map() {
    let array = parse_schema(r#"{"type":"array","items":"int"}"#).unwrap();
    assert_eq!(array.root(), &AvroSchema::Array(Box::new(AvroSchema::Int)));

    let map = parse_schema(r#"{"type":"map","values":"string"}"#).unwrap();
    assert_eq!(map.root(), &AvroSchema::Map(Box::new(AvroSchema::String)));

    assert!(parse_schema(r#"{"type":"array"}"#).is_err());
    assert!(parse_schema(r#"{"type":"map"}"#).is_err());
}

#[test]
fn test_parse_fixed() {
    let schema = parse_schema(r#"{"type":"fixed","name":"Digest","size":16}"#).unwrap();
    match schema.root() {
        AvroSchema::Fixed(f) => assert_eq!(f.size, 16),
        other => panic!("expected fixed, got {:?}", other),
    }
}

#[test]
fn test_fixed_size_must_be_non_negative_integer() {
    assert!(parse_schema(r#"{"type":"fixed","name":"F","size":-1}"#).is_err());
    assert!(parse_schema(r#"{"type":"fixed","name":"F","size":1.5}"#).is_err());
    assert!(parse_schema(r#"{"type":"fixed","name":"F","size":"big"}"#).is_err());
    assert!(parse_schema(r#"{"type":"fixed","name":"F"}"#).is_err());
    // Zero-length fixed is allowed.
    assert!(parse_schema(r#"{"type":"fixed","name":"F","size":0}"#).is_ok());
}

// ============================================================================
// Unions
// ============================================================================

#[test]
fn test_parse_union() {
    let schema = parse_schema(r#"["null","string"]"#).unwrap();
    assert_eq!(
        schema.root(),
        &AvroSchema::Union(vec![AvroSchema::Null, AvroSchema::String])
    );
}

#[test]
fn test_union_rules() {
    // Flat unions only.
    assert!(parse_schema(r#"["null",["int","string"]]"#).is_err());
    // No duplicate kinds.
    assert!(parse_schema(r#"["int","int"]"#).is_err());
    assert!(parse_schema(
        r#"[{"type":"array","items":"int"},{"type":"array","items":"string"}]"#
    )
    .is_err());
    // No empty unions.
    assert!(parse_schema(r#"[]"#).is_err());
}

#[test]
fn test_union_allows_distinct_named_types_of_same_kind() {
    let schema = parse_schema(
        r#"[{"type":"record","name":"A","fields":[]},{"type":"record","name":"B","fields":[]}]"#,
    )
    .unwrap();
    match schema.root() {
        AvroSchema::Union(branches) => assert_eq!(branches.len(), 2),
        other => panic!("expected union, got {:?}", other),
    }
}

// ============================================================================
// Named Types & References
// ============================================================================

#[test]
fn test_named_reference_resolves_to_definition() {
    let schema = parse_schema(
        r#"{"type":"record","name":"Wrapper","fields":[
            {"name":"first","type":{"type":"fixed","name":"Hash","size":32}},
            {"name":"second","type":"Hash"}
        ]}"#,
    )
    .unwrap();
    let record = match schema.root() {
        AvroSchema::Record(r) => r,
        other => panic!("expected record, got {:?}", other),
    };
    let second = schema.resolve(&record.fields[1].schema);
    match second {
        AvroSchema::Fixed(f) => assert_eq!(f.size, 32),
        other => panic!("expected fixed behind reference, got {:?}", other),
    }
}

#[test]
fn test_recursive_record_parses() {
    let schema = parse_schema(
        r#"{"type":"record","name":"LinkedList","fields":[
            {"name":"value","type":"int"},
            {"name":"next","type":["null","LinkedList"]}
        ]}"#,
    )
    .unwrap();
    assert!(schema.lookup("LinkedList").is_some());
}

#[test]
fn test_unresolved_reference_rejected() {
    assert!(parse_schema(
        r#"{"type":"record","name":"R","fields":[{"name":"x","type":"Missing"}]}"#
    )
    .is_err());
}

#[test]
fn test_duplicate_definition_rejected() {
    let result = parse_schema(
        r#"{"type":"record","name":"R","fields":[
            {"name":"a","type":{"type":"enum","name":"E","symbols":["X"]}},
            {"name":"b","type":{"type":"enum","name":"E","symbols":["Y"]}}
        ]}"#,
    );
    assert!(result.is_err());
}

#[test]
fn test_lookup_by_fullname() {
    let schema = parse_schema(
        r#"{"type":"record","name":"R","namespace":"com.example","fields":[]}"#,
    )
    .unwrap();
    assert!(schema.lookup("com.example.R").is_some());
    assert!(schema.lookup("R").is_none());
}

// ============================================================================
// Default Validation
// ============================================================================

#[test]
fn test_defaults_are_type_checked() {
    assert!(parse_schema(
        r#"{"type":"record","name":"R","fields":[{"name":"a","type":"int","default":"zero"}]}"#
    )
    .is_err());
    assert!(parse_schema(
        r#"{"type":"record","name":"R","fields":[{"name":"a","type":"string","default":5}]}"#
    )
    .is_err());
    assert!(parse_schema(
        r#"{"type":"record","name":"R","fields":[{"name":"a","type":"int","default":0}]}"#
    )
    .is_ok());
}

#[test]
fn test_union_default_checked_against_first_branch() {
    // ["null","int"] with default null: null matches the first branch.
    assert!(parse_schema(
        r#"{"type":"record","name":"R","fields":[{"name":"a","type":["null","int"],"default":null}]}"#
    )
    .is_ok());
    // Default 3 does not match the first branch "null".
    assert!(parse_schema(
        r#"{"type":"record","name":"R","fields":[{"name":"a","type":["null","int"],"default":3}]}"#
    )
    .is_err());
    // ["int","null"] with default 3 is fine.
    assert!(parse_schema(
        r#"{"type":"record","name":"R","fields":[{"name":"a","type":["int","null"],"default":3}]}"#
    )
    .is_ok());
}

#[test]
fn test_complex_defaults() {
    assert!(parse_schema(
        r#"{"type":"record","name":"R","fields":[
            {"name":"tags","type":{"type":"array","items":"string"},"default":["a","b"]}
        ]}"#
    )
    .is_ok());
    assert!(parse_schema(
        r#"{"type":"record","name":"R","fields":[
            {"name":"tags","type":{"type":"array","items":"string"},"default":[1]}
        ]}"#
    )
    .is_err());
    assert!(parse_schema(
        r#"{"type":"record","name":"R","fields":[
            {"name":"counts","type":{"type":"map","values":"long"},"default":{"x":1}}
        ]}"#
    )
    .is_ok());
}

#[test]
fn test_int_default_range_checked() {
    assert!(parse_schema(
        r#"{"type":"record","name":"R","fields":[{"name":"a","type":"int","default":2147483647}]}"#
    )
    .is_ok());
    assert!(parse_schema(
        r#"{"type":"record","name":"R","fields":[{"name":"a","type":"int","default":2147483648}]}"#
    )
    .is_err());
}

// ============================================================================
// Serialization Round Trip
// ============================================================================

#[test]
fn test_to_json_round_trips() {
    let inputs = [
        r#""int""#,
        r#"["null","string"]"#,
        r#"{"type":"record","name":"User","namespace":"com.example","fields":[
            {"name":"id","type":"long"},
            {"name":"color","type":{"type":"enum","name":"Color","symbols":["R","G","B"]}},
            {"name":"again","type":"Color"},
            {"name":"score","type":["null","double"],"default":null}
        ]}"#,
        r#"{"type":"array","items":{"type":"fixed","name":"F","size":4}}"#,
    ];
    for input in inputs {
        let schema = parse_schema(input).unwrap();
        let reparsed = parse_schema(&schema.to_json()).unwrap();
        assert_eq!(
            schema.root(),
            reparsed.root(),
            "to_json should round trip {}",
            input
        );
    }
}
