//! Schema sanitization.
//!
//! Normalizes user-submitted Avro schema JSON before tree construction. The
//! walk is deliberately selective: at each object only the `"name"` member
//! (stripped to its final dot-separated segment) and the `"type"` member
//! (recursed, with `"record"` additionally requiring a `"fields"` array) are
//! touched; arrays recurse per element and everything else passes through.
//! The mutated DOM is re-emitted as compact JSON in traversal order, which
//! makes the pass idempotent and its output canonical.

use serde_json::{Deserializer, Map, Value};
use tracing::debug;

use crate::error::SchemaError;

/// Sanitize an Avro schema document into its canonical JSON text.
///
/// # Example
/// ```
/// use preflight::sanitize_schema;
///
/// let canonical = sanitize_schema(
///     r#"{"type": "record", "name": "com.acme.Widget", "fields": []}"#,
/// )
/// .unwrap();
/// assert_eq!(canonical, r#"{"type":"record","name":"Widget","fields":[]}"#);
/// ```
pub fn sanitize_schema(input: &str) -> Result<String, SchemaError> {
    let mut stream = Deserializer::from_str(input).into_iter::<Value>();
    let mut doc = match stream.next() {
        Some(Ok(value)) => value,
        Some(Err(err)) => return Err(SchemaError::from_json(&err, input)),
        None => {
            return Err(SchemaError::Parse {
                offset: 0,
                message: "empty schema document".to_string(),
            })
        }
    };

    // Exactly one JSON value; anything but whitespace after it is an error
    // pointing at the first trailing byte.
    let end = stream.byte_offset();
    if let Some(extra) = input[end..].find(|c: char| !c.is_whitespace()) {
        return Err(SchemaError::Parse {
            offset: end + extra,
            message: "trailing characters after schema".to_string(),
        });
    }

    if let Err(err) = sanitize_value(&mut doc) {
        // The original text is appended to aid debugging at the call site.
        return Err(match err {
            SchemaError::Invalid(message) => {
                SchemaError::Invalid(format!("{} {}", message, input))
            }
            other => other,
        });
    }

    serde_json::to_string(&doc).map_err(|e| SchemaError::invalid(e.to_string()))
}

fn sanitize_value(value: &mut Value) -> Result<(), SchemaError> {
    match value {
        Value::Object(obj) => sanitize_object(obj),
        Value::Array(items) => {
            for item in items {
                sanitize_value(item)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn sanitize_object(obj: &mut Map<String, Value>) -> Result<(), SchemaError> {
    if let Some(name) = obj.get_mut("name") {
        sanitize_name(name)?;
    }

    let is_record = match obj.get_mut("type") {
        Some(type_value) => {
            // The type may itself be an object or array describing a nested
            // schema; rewrite it before looking at its tag.
            sanitize_value(type_value)?;
            matches!(type_value.as_str(), Some("record"))
        }
        None => false,
    };

    if is_record {
        sanitize_record(obj)?;
    }
    Ok(())
}

/// `"name"` must be a non-empty string; everything up to and including the
/// last `.` is dropped so an accidentally namespaced inline name compares
/// against the parent scope's namespace rule. A name whose final segment is
/// empty would only fail on the next pass, so it is rejected here.
fn sanitize_name(name: &mut Value) -> Result<(), SchemaError> {
    let s = match name.as_str() {
        Some(s) if !s.is_empty() => s,
        _ => return Err(SchemaError::invalid("invalid JSON field \"name\"")),
    };
    if let Some(dot) = s.rfind('.') {
        let local = s[dot + 1..].to_string();
        if local.is_empty() {
            return Err(SchemaError::invalid("invalid JSON field \"name\""));
        }
        debug!(from = %s, to = %local, "stripped namespace from inline name");
        *name = Value::String(local);
    }
    Ok(())
}

fn sanitize_record(obj: &mut Map<String, Value>) -> Result<(), SchemaError> {
    let fields = obj
        .get_mut("fields")
        .ok_or_else(|| SchemaError::invalid("missing JSON field \"fields\""))?;
    if !fields.is_array() {
        return Err(SchemaError::invalid(
            "JSON field \"fields\" is not an array",
        ));
    }
    sanitize_value(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_namespace_from_name() {
        let out = sanitize_schema(
            r#"{"type":"record","name":"com.acme.Widget","fields":[]}"#,
        )
        .unwrap();
        assert_eq!(out, r#"{"type":"record","name":"Widget","fields":[]}"#);
    }

    #[test]
    fn test_name_without_dots_unchanged() {
        let out = sanitize_schema(r#"{"type":"record","name":"Widget","fields":[]}"#).unwrap();
        assert_eq!(out, r#"{"type":"record","name":"Widget","fields":[]}"#);
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = sanitize_schema(r#"{"type":"record","name":"","fields":[]}"#).unwrap_err();
        assert!(err.to_string().contains("\"name\""));
    }

    #[test]
    fn test_non_string_name_rejected() {
        assert!(sanitize_schema(r#"{"type":"record","name":7,"fields":[]}"#).is_err());
    }

    #[test]
    fn test_record_requires_fields_array() {
        assert!(sanitize_schema(r#"{"type":"record","name":"R"}"#).is_err());
        assert!(sanitize_schema(r#"{"type":"record","name":"R","fields":{}}"#).is_err());
    }

    #[test]
    fn test_walk_error_appends_original_text() {
        let input = r#"{"type":"record","name":"R"}"#;
        let err = sanitize_schema(input).unwrap_err();
        assert!(err.to_string().ends_with(input));
    }

    #[test]
    fn test_trailing_garbage_offset() {
        let err = sanitize_schema(r#""int" x"#).unwrap_err();
        match err {
            SchemaError::Parse { offset, .. } => assert_eq!(offset, 6),
            other => panic!("expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_trailing_whitespace_allowed() {
        assert_eq!(sanitize_schema("\"int\"  \n").unwrap(), r#""int""#);
    }

    #[test]
    fn test_scalars_pass_through() {
        assert_eq!(sanitize_schema(r#""long""#).unwrap(), r#""long""#);
        assert_eq!(sanitize_schema("[\"null\", \"int\"]").unwrap(), r#"["null","int"]"#);
    }

    #[test]
    fn test_members_outside_the_walk_untouched() {
        // Only name/type/fields participate; an items schema is left as-is.
        let input = r#"{"type":"array","items":{"type":"record","name":"a.b.C"}}"#;
        let out = sanitize_schema(input).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_idempotent_on_sanitized_output() {
        let input = r#"{"type":"record","name":"x.y.R","fields":[
            {"name":"f","type":{"type":"enum","name":"n.E","symbols":["A"]}}
        ]}"#;
        let once = sanitize_schema(input).unwrap();
        let twice = sanitize_schema(&once).unwrap();
        assert_eq!(once, twice);
    }
}
