//! JSON schema parser.
//!
//! Builds a [`Schema`] tree from canonical Avro schema JSON: primitives named
//! by their string tag, complex types as objects with a `"type"` member,
//! unions as JSON arrays. Named types register their qualified name into the
//! schema's arena; later string occurrences of a declared name become
//! [`AvroSchema::Ref`] nodes pointing at the definition.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::SchemaError;
use crate::schema::{
    AvroSchema, EnumSchema, FieldSchema, FixedSchema, NameRef, QualifiedName, RecordSchema, Schema,
    SchemaKind,
};

/// Parse an Avro schema from JSON text.
///
/// # Example
/// ```
/// use preflight::schema::parse_schema;
///
/// let schema = parse_schema(r#""string""#).unwrap();
/// ```
pub fn parse_schema(json: &str) -> Result<Schema, SchemaError> {
    parse_schema_with_options(json, false)
}

/// Parse an Avro schema from JSON text with name validation options.
///
/// In strict mode, names that do not follow the Avro name grammar
/// (`[A-Za-z_][A-Za-z0-9_]*`) fail the parse. In permissive mode (the
/// default) such names only produce a warning; this maximizes compatibility
/// with schemas already registered by lenient producers.
pub fn parse_schema_with_options(json: &str, strict_names: bool) -> Result<Schema, SchemaError> {
    SchemaParser::new()
        .with_strict_names(strict_names)
        .parse(json)
}

/// Schema parser with named type registration.
///
/// Tracks the enclosing namespace while descending into named types and
/// maintains the arena of named definitions that [`AvroSchema::Ref`] nodes
/// index into.
#[derive(Debug, Default)]
pub struct SchemaParser {
    /// Named type definitions in declaration order.
    names: Vec<AvroSchema>,
    /// Full names aligned with `names`, available before a definition is
    /// complete (needed while parsing a recursive type's own body).
    fullnames: Vec<String>,
    /// Full name to arena slot.
    index: HashMap<String, NameRef>,
    /// Namespace inherited from the enclosing named type; empty means none.
    namespace: String,
    /// Whether Avro name grammar violations fail the parse.
    strict_names: bool,
}

impl SchemaParser {
    /// Create a parser with default settings (permissive names).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser that rejects names outside the Avro name grammar.
    pub fn new_strict() -> Self {
        Self {
            strict_names: true,
            ..Self::default()
        }
    }

    /// Set whether name grammar violations fail the parse.
    pub fn with_strict_names(mut self, strict: bool) -> Self {
        self.strict_names = strict;
        self
    }

    /// Parse JSON text into a [`Schema`], consuming the parser.
    pub fn parse(mut self, json: &str) -> Result<Schema, SchemaError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| SchemaError::from_json(&e, json))?;
        let root = self.parse_value(&value)?;
        debug!(named_types = self.names.len(), "built schema tree");
        let schema = Schema::new(root, self.names, self.index);
        validate_defaults(&schema)?;
        Ok(schema)
    }

    fn parse_value(&mut self, value: &Value) -> Result<AvroSchema, SchemaError> {
        match value {
            Value::String(s) => self.parse_string_schema(s),
            Value::Object(obj) => self.parse_object_schema(obj),
            Value::Array(branches) => self.parse_union_schema(branches),
            other => Err(SchemaError::invalid(format!(
                "schema must be a string, object, or array, found {}",
                json_kind(other)
            ))),
        }
    }

    /// A primitive type tag or a reference to a declared named type.
    fn parse_string_schema(&self, s: &str) -> Result<AvroSchema, SchemaError> {
        match s {
            "null" => Ok(AvroSchema::Null),
            "boolean" => Ok(AvroSchema::Boolean),
            "int" => Ok(AvroSchema::Int),
            "long" => Ok(AvroSchema::Long),
            "float" => Ok(AvroSchema::Float),
            "double" => Ok(AvroSchema::Double),
            "bytes" => Ok(AvroSchema::Bytes),
            "string" => Ok(AvroSchema::String),
            name => self.parse_reference(name),
        }
    }

    /// Resolve a name against the current namespace first, then as written.
    ///
    /// Only previously declared names resolve; forward references are
    /// rejected.
    fn parse_reference(&self, raw: &str) -> Result<AvroSchema, SchemaError> {
        let qualified = QualifiedName::parse(raw, &self.namespace).fullname();
        if let Some(slot) = self.index.get(&qualified) {
            return Ok(AvroSchema::Ref(*slot));
        }
        if let Some(slot) = self.index.get(raw) {
            return Ok(AvroSchema::Ref(*slot));
        }
        Err(SchemaError::invalid(format!("unknown type \"{}\"", raw)))
    }

    fn parse_object_schema(&mut self, obj: &Map<String, Value>) -> Result<AvroSchema, SchemaError> {
        let type_value = obj
            .get("type")
            .ok_or_else(|| SchemaError::invalid("missing JSON field \"type\""))?;

        let type_str = match type_value {
            Value::String(s) => s.as_str(),
            // A nested schema (or union) in type position.
            Value::Object(_) | Value::Array(_) => return self.parse_value(type_value),
            other => {
                return Err(SchemaError::invalid(format!(
                    "JSON field \"type\" must be a string, object, or array, found {}",
                    json_kind(other)
                )))
            }
        };

        match type_str {
            // Primitives may appear in object form, e.g. with a logicalType
            // annotation; annotations have no kind of their own here.
            "null" => Ok(AvroSchema::Null),
            "boolean" => Ok(AvroSchema::Boolean),
            "int" => Ok(AvroSchema::Int),
            "long" => Ok(AvroSchema::Long),
            "float" => Ok(AvroSchema::Float),
            "double" => Ok(AvroSchema::Double),
            "bytes" => Ok(AvroSchema::Bytes),
            "string" => Ok(AvroSchema::String),
            "record" => self.parse_record_schema(obj),
            "enum" => self.parse_enum_schema(obj),
            "array" => self.parse_array_schema(obj),
            "map" => self.parse_map_schema(obj),
            "fixed" => self.parse_fixed_schema(obj),
            other => self.parse_reference(other),
        }
    }

    fn parse_union_schema(&mut self, branch_values: &[Value]) -> Result<AvroSchema, SchemaError> {
        if branch_values.is_empty() {
            return Err(SchemaError::invalid("union must have at least one branch"));
        }
        let mut branches = Vec::with_capacity(branch_values.len());
        let mut seen = HashSet::with_capacity(branch_values.len());
        for branch_value in branch_values {
            let branch = self.parse_value(branch_value)?;
            if branch.kind() == SchemaKind::Union {
                return Err(SchemaError::invalid(
                    "unions may not immediately contain other unions",
                ));
            }
            let key = self.union_branch_key(&branch);
            if !seen.insert(key.clone()) {
                return Err(SchemaError::invalid(format!(
                    "union has more than one branch of type \"{}\"",
                    key
                )));
            }
            branches.push(branch);
        }
        Ok(AvroSchema::Union(branches))
    }

    /// Key used to detect duplicate union branches: named types are
    /// distinguished by full name, everything else by kind.
    fn union_branch_key(&self, branch: &AvroSchema) -> String {
        match branch {
            AvroSchema::Record(r) => r.name.fullname(),
            AvroSchema::Enum(e) => e.name.fullname(),
            AvroSchema::Fixed(f) => f.name.fullname(),
            AvroSchema::Ref(r) => self.fullnames[r.index()].clone(),
            other => other.kind().as_str().to_string(),
        }
    }

    fn parse_record_schema(&mut self, obj: &Map<String, Value>) -> Result<AvroSchema, SchemaError> {
        let name = self.named_type_name(obj, "record")?;
        let slot = self.declare(&name)?;

        // Fields see this record's namespace, and may refer back to the
        // record itself.
        let previous = std::mem::replace(&mut self.namespace, name.namespace.clone());

        let field_values = obj
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                SchemaError::invalid(format!("record \"{}\" is missing a \"fields\" array", name))
            })?;

        let mut fields = Vec::with_capacity(field_values.len());
        let mut seen = HashSet::with_capacity(field_values.len());
        for field_value in field_values {
            let field = self.parse_field_schema(field_value)?;
            if !seen.insert(field.name.clone()) {
                return Err(SchemaError::invalid(format!(
                    "duplicate field \"{}\" in record \"{}\"",
                    field.name, name
                )));
            }
            fields.push(field);
        }
        self.namespace = previous;

        let record = AvroSchema::Record(RecordSchema {
            name,
            fields,
            doc: doc_string(obj),
        });
        self.define(slot, record.clone());
        Ok(record)
    }

    fn parse_field_schema(&mut self, value: &Value) -> Result<FieldSchema, SchemaError> {
        let obj = value
            .as_object()
            .ok_or_else(|| SchemaError::invalid("record field must be a JSON object"))?;

        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| SchemaError::invalid("record field is missing a \"name\""))?;
        if name.is_empty() {
            return Err(SchemaError::invalid("record field has an empty \"name\""));
        }
        self.validate_name(name, "field")?;

        let type_value = obj.get("type").ok_or_else(|| {
            SchemaError::invalid(format!("field \"{}\" is missing a \"type\"", name))
        })?;
        let schema = self.parse_value(type_value)?;

        Ok(FieldSchema {
            name: name.to_string(),
            schema,
            default: obj.get("default").cloned(),
        })
    }

    fn parse_enum_schema(&mut self, obj: &Map<String, Value>) -> Result<AvroSchema, SchemaError> {
        let name = self.named_type_name(obj, "enum")?;
        let slot = self.declare(&name)?;

        let symbol_values = obj
            .get("symbols")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                SchemaError::invalid(format!("enum \"{}\" is missing a \"symbols\" array", name))
            })?;
        if symbol_values.is_empty() {
            return Err(SchemaError::invalid(format!(
                "enum \"{}\" must declare at least one symbol",
                name
            )));
        }

        let mut symbols = Vec::with_capacity(symbol_values.len());
        let mut seen = HashSet::with_capacity(symbol_values.len());
        for symbol_value in symbol_values {
            let symbol = symbol_value.as_str().ok_or_else(|| {
                SchemaError::invalid(format!("enum \"{}\" has a non-string symbol", name))
            })?;
            self.validate_name(symbol, "enum symbol")?;
            if !seen.insert(symbol.to_string()) {
                return Err(SchemaError::invalid(format!(
                    "duplicate symbol \"{}\" in enum \"{}\"",
                    symbol, name
                )));
            }
            symbols.push(symbol.to_string());
        }

        let default = match obj.get("default") {
            Some(Value::String(s)) => {
                if !symbols.iter().any(|sym| sym == s) {
                    return Err(SchemaError::invalid(format!(
                        "default symbol \"{}\" is not declared by enum \"{}\"",
                        s, name
                    )));
                }
                Some(s.clone())
            }
            Some(other) => {
                return Err(SchemaError::invalid(format!(
                    "enum \"{}\" default must be a string, found {}",
                    name,
                    json_kind(other)
                )))
            }
            None => None,
        };

        let node = AvroSchema::Enum(EnumSchema {
            name,
            symbols,
            default,
            doc: doc_string(obj),
        });
        self.define(slot, node.clone());
        Ok(node)
    }

    fn parse_array_schema(&mut self, obj: &Map<String, Value>) -> Result<AvroSchema, SchemaError> {
        let items = obj
            .get("items")
            .ok_or_else(|| SchemaError::invalid("array is missing an \"items\" schema"))?;
        Ok(AvroSchema::Array(Box::new(self.parse_value(items)?)))
    }

    fn parse_map_schema(&mut self, obj: &Map<String, Value>) -> Result<AvroSchema, SchemaError> {
        let values = obj
            .get("values")
            .ok_or_else(|| SchemaError::invalid("map is missing a \"values\" schema"))?;
        Ok(AvroSchema::Map(Box::new(self.parse_value(values)?)))
    }

    fn parse_fixed_schema(&mut self, obj: &Map<String, Value>) -> Result<AvroSchema, SchemaError> {
        let name = self.named_type_name(obj, "fixed")?;
        let slot = self.declare(&name)?;

        let size = obj
            .get("size")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                SchemaError::invalid(format!(
                    "fixed \"{}\" requires a non-negative integer \"size\"",
                    name
                ))
            })? as usize;

        let node = AvroSchema::Fixed(FixedSchema {
            name,
            size,
            doc: doc_string(obj),
        });
        self.define(slot, node.clone());
        Ok(node)
    }

    /// Read and qualify the `"name"` of a named type. An explicit
    /// `"namespace"` member overrides the inherited one; a dotted name
    /// carries its own namespace.
    fn named_type_name(
        &self,
        obj: &Map<String, Value>,
        kind: &str,
    ) -> Result<QualifiedName, SchemaError> {
        let raw = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| SchemaError::invalid(format!("{} is missing a \"name\"", kind)))?;
        if raw.is_empty() {
            return Err(SchemaError::invalid(format!(
                "{} has an empty \"name\"",
                kind
            )));
        }
        let enclosing = match obj.get("namespace").and_then(Value::as_str) {
            Some(ns) => ns,
            None => self.namespace.as_str(),
        };
        let name = QualifiedName::parse(raw, enclosing);
        self.validate_name(&name.name, kind)?;
        Ok(name)
    }

    /// Reserve an arena slot for a named type, rejecting redefinitions.
    /// The slot holds a placeholder until [`Self::define`] fills it, which
    /// lets the type's own body refer back to it.
    fn declare(&mut self, name: &QualifiedName) -> Result<NameRef, SchemaError> {
        let fullname = name.fullname();
        if self.index.contains_key(&fullname) {
            return Err(SchemaError::invalid(format!(
                "type \"{}\" is declared more than once",
                fullname
            )));
        }
        let slot = NameRef(self.names.len());
        self.names.push(AvroSchema::Null);
        self.fullnames.push(fullname.clone());
        self.index.insert(fullname, slot);
        Ok(slot)
    }

    fn define(&mut self, slot: NameRef, definition: AvroSchema) {
        self.names[slot.0] = definition;
    }

    /// Enforce the Avro name grammar: `[A-Za-z_][A-Za-z0-9_]*`.
    fn validate_name(&self, name: &str, context: &str) -> Result<(), SchemaError> {
        let mut chars = name.chars();
        let valid = match chars.next() {
            Some(first) => {
                (first.is_ascii_alphabetic() || first == '_')
                    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            None => false,
        };
        if valid {
            return Ok(());
        }
        if self.strict_names {
            return Err(SchemaError::invalid(format!(
                "{} name \"{}\" is not a valid Avro name",
                context, name
            )));
        }
        warn!(context, name, "name does not follow the Avro name grammar");
        Ok(())
    }
}

/// Check every declared field default against its field's type.
fn validate_defaults(schema: &Schema) -> Result<(), SchemaError> {
    validate_node_defaults(schema, schema.root())
}

fn validate_node_defaults(schema: &Schema, node: &AvroSchema) -> Result<(), SchemaError> {
    match node {
        AvroSchema::Record(record) => {
            for field in &record.fields {
                if let Some(default) = &field.default {
                    if !default_matches(schema, &field.schema, default) {
                        return Err(SchemaError::invalid(format!(
                            "invalid default for field \"{}\" of record \"{}\"",
                            field.name, record.name
                        )));
                    }
                }
                validate_node_defaults(schema, &field.schema)?;
            }
            Ok(())
        }
        AvroSchema::Array(items) => validate_node_defaults(schema, items),
        AvroSchema::Map(values) => validate_node_defaults(schema, values),
        AvroSchema::Union(branches) => {
            for branch in branches {
                validate_node_defaults(schema, branch)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Check a JSON default value against a schema node. A union default is
/// checked against the first branch, per the Avro rules. Bytes and fixed
/// defaults arrive as JSON strings.
fn default_matches(schema: &Schema, node: &AvroSchema, value: &Value) -> bool {
    match schema.resolve(node) {
        AvroSchema::Null => value.is_null(),
        AvroSchema::Boolean => value.is_boolean(),
        AvroSchema::Int => value
            .as_i64()
            .is_some_and(|v| i32::try_from(v).is_ok()),
        AvroSchema::Long => value.as_i64().is_some(),
        AvroSchema::Float | AvroSchema::Double => value.is_number(),
        AvroSchema::Bytes | AvroSchema::String => value.is_string(),
        AvroSchema::Fixed(f) => value.as_str().is_some_and(|s| s.len() == f.size),
        AvroSchema::Enum(e) => value.as_str().is_some_and(|s| e.has_symbol(s)),
        AvroSchema::Record(r) => match value.as_object() {
            Some(members) => members.iter().all(|(member, v)| match r.field(member) {
                Some(field) => default_matches(schema, &field.schema, v),
                None => false,
            }),
            None => false,
        },
        AvroSchema::Array(items) => value
            .as_array()
            .is_some_and(|elems| elems.iter().all(|v| default_matches(schema, items, v))),
        AvroSchema::Map(values) => value
            .as_object()
            .is_some_and(|members| members.values().all(|v| default_matches(schema, values, v))),
        AvroSchema::Union(branches) => match branches.first() {
            Some(first) => default_matches(schema, first, value),
            None => false,
        },
        // resolve() already followed one reference; definitions are never
        // references themselves.
        AvroSchema::Ref(_) => false,
    }
}

fn doc_string(obj: &Map<String, Value>) -> Option<String> {
    obj.get("doc").and_then(Value::as_str).map(String::from)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_inherited_by_nested_types() {
        let schema = parse_schema(
            r#"{"type":"record","name":"Outer","namespace":"com.acme","fields":[
                {"name":"inner","type":{"type":"record","name":"Inner","fields":[]}}
            ]}"#,
        )
        .unwrap();
        assert!(schema.lookup("com.acme.Inner").is_some());
    }

    #[test]
    fn test_explicit_namespace_overrides_inherited() {
        let schema = parse_schema(
            r#"{"type":"record","name":"Outer","namespace":"com.acme","fields":[
                {"name":"inner","type":{"type":"record","name":"Inner","namespace":"org.other","fields":[]}}
            ]}"#,
        )
        .unwrap();
        assert!(schema.lookup("org.other.Inner").is_some());
        assert!(schema.lookup("com.acme.Inner").is_none());
    }

    #[test]
    fn test_dotted_name_carries_namespace() {
        let schema =
            parse_schema(r#"{"type":"fixed","name":"com.acme.Digest","size":16}"#).unwrap();
        let fixed = schema.lookup("com.acme.Digest").unwrap();
        match fixed {
            AvroSchema::Fixed(f) => {
                assert_eq!(f.name.namespace, "com.acme");
                assert_eq!(f.name.name, "Digest");
            }
            other => panic!("expected fixed, got {:?}", other),
        }
    }

    #[test]
    fn test_self_reference_resolves_to_declaration() {
        let schema = parse_schema(
            r#"{"type":"record","name":"Node","fields":[
                {"name":"next","type":["null","Node"]}
            ]}"#,
        )
        .unwrap();
        let root = match schema.root() {
            AvroSchema::Record(r) => r,
            other => panic!("expected record, got {:?}", other),
        };
        let next = match &root.fields[0].schema {
            AvroSchema::Union(branches) => &branches[1],
            other => panic!("expected union, got {:?}", other),
        };
        let resolved = schema.resolve(next);
        assert_eq!(resolved.fullname().as_deref(), Some("Node"));
    }

    #[test]
    fn test_reference_resolves_in_current_namespace() {
        let schema = parse_schema(
            r#"{"type":"record","name":"Outer","namespace":"com.acme","fields":[
                {"name":"e","type":{"type":"enum","name":"Mode","symbols":["ON","OFF"]}},
                {"name":"again","type":"Mode"}
            ]}"#,
        )
        .unwrap();
        let root = match schema.root() {
            AvroSchema::Record(r) => r,
            other => panic!("expected record, got {:?}", other),
        };
        let resolved = schema.resolve(&root.fields[1].schema);
        assert_eq!(resolved.fullname().as_deref(), Some("com.acme.Mode"));
    }

    #[test]
    fn test_forward_reference_is_rejected() {
        let result = parse_schema(
            r#"{"type":"record","name":"R","fields":[
                {"name":"later","type":"NotYetDeclared"}
            ]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_strict_names_reject_bad_symbols() {
        let json = r#"{"type":"enum","name":"E","symbols":["ok","not-ok"]}"#;
        assert!(parse_schema(json).is_ok());
        assert!(parse_schema_with_options(json, true).is_err());
    }

    #[test]
    fn test_union_duplicate_named_branches_rejected() {
        let result = parse_schema(
            r#"{"type":"record","name":"R","fields":[
                {"name":"f","type":[{"type":"fixed","name":"F","size":4},"F"]}
            ]}"#,
        );
        assert!(result.is_err());
    }
}
