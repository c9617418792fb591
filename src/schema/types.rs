//! Avro schema tree model.
//!
//! Defines the schema node type, the named-type structs it carries, and the
//! [`Schema`] handle that owns a parsed tree together with its arena of
//! named-type definitions.

use std::collections::HashMap;
use std::fmt;

use serde_json::{json, Map, Value};

/// The kind tag of a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Record,
    Enum,
    Array,
    Map,
    Union,
    Fixed,
    /// A symbolic reference to a previously declared named type.
    Ref,
}

impl SchemaKind {
    /// The Avro type tag for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaKind::Null => "null",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Int => "int",
            SchemaKind::Long => "long",
            SchemaKind::Float => "float",
            SchemaKind::Double => "double",
            SchemaKind::Bytes => "bytes",
            SchemaKind::String => "string",
            SchemaKind::Record => "record",
            SchemaKind::Enum => "enum",
            SchemaKind::Array => "array",
            SchemaKind::Map => "map",
            SchemaKind::Union => "union",
            SchemaKind::Fixed => "fixed",
            SchemaKind::Ref => "ref",
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully qualified type name: a possibly empty dot-separated namespace plus
/// a local name.
///
/// Two qualified names are equal iff both components are byte-equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    /// Dot-separated namespace; empty means no namespace.
    pub namespace: String,
    /// The unqualified local name.
    pub name: String,
}

impl QualifiedName {
    /// Create a name with no namespace.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            namespace: String::new(),
            name: name.into(),
        }
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Interpret a raw name against an enclosing namespace.
    ///
    /// A dotted name carries its own namespace; an undotted name inherits
    /// `enclosing`.
    pub fn parse(raw: &str, enclosing: &str) -> Self {
        match raw.rsplit_once('.') {
            Some((namespace, name)) => Self {
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            None => Self {
                namespace: enclosing.to_string(),
                name: raw.to_string(),
            },
        }
    }

    /// The dotted full name.
    pub fn fullname(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}.{}", self.namespace, self.name)
        }
    }
}

/// A stable index into the owning [`Schema`]'s arena of named-type
/// definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameRef(pub(crate) usize);

impl NameRef {
    /// The arena slot this reference points at.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A node in an Avro schema tree.
#[derive(Debug, Clone, PartialEq)]
pub enum AvroSchema {
    /// Null type, no value.
    Null,
    /// Boolean type.
    Boolean,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 32-bit IEEE 754 floating point.
    Float,
    /// 64-bit IEEE 754 floating point.
    Double,
    /// Sequence of bytes.
    Bytes,
    /// Unicode string.
    String,
    /// Record type with named fields.
    Record(RecordSchema),
    /// Enumeration type.
    Enum(EnumSchema),
    /// Array of items with a single schema.
    Array(Box<AvroSchema>),
    /// Map with string keys and values of a single schema.
    Map(Box<AvroSchema>),
    /// Tagged union over the branch schemas, in declaration order.
    Union(Vec<AvroSchema>),
    /// Fixed-size byte array.
    Fixed(FixedSchema),
    /// Reference to a previously declared named type in the same schema.
    Ref(NameRef),
}

impl AvroSchema {
    /// The kind tag of this node.
    pub fn kind(&self) -> SchemaKind {
        match self {
            AvroSchema::Null => SchemaKind::Null,
            AvroSchema::Boolean => SchemaKind::Boolean,
            AvroSchema::Int => SchemaKind::Int,
            AvroSchema::Long => SchemaKind::Long,
            AvroSchema::Float => SchemaKind::Float,
            AvroSchema::Double => SchemaKind::Double,
            AvroSchema::Bytes => SchemaKind::Bytes,
            AvroSchema::String => SchemaKind::String,
            AvroSchema::Record(_) => SchemaKind::Record,
            AvroSchema::Enum(_) => SchemaKind::Enum,
            AvroSchema::Array(_) => SchemaKind::Array,
            AvroSchema::Map(_) => SchemaKind::Map,
            AvroSchema::Union(_) => SchemaKind::Union,
            AvroSchema::Fixed(_) => SchemaKind::Fixed,
            AvroSchema::Ref(_) => SchemaKind::Ref,
        }
    }

    /// Check if this node is a primitive type.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            AvroSchema::Null
                | AvroSchema::Boolean
                | AvroSchema::Int
                | AvroSchema::Long
                | AvroSchema::Float
                | AvroSchema::Double
                | AvroSchema::Bytes
                | AvroSchema::String
        )
    }

    /// Check if this node is a named type definition (record, enum, fixed).
    pub fn is_named(&self) -> bool {
        matches!(
            self,
            AvroSchema::Record(_) | AvroSchema::Enum(_) | AvroSchema::Fixed(_)
        )
    }

    /// The qualified name of a named type definition, if this is one.
    pub fn qualified_name(&self) -> Option<&QualifiedName> {
        match self {
            AvroSchema::Record(r) => Some(&r.name),
            AvroSchema::Enum(e) => Some(&e.name),
            AvroSchema::Fixed(f) => Some(&f.name),
            _ => None,
        }
    }

    /// The dotted full name of a named type definition, if this is one.
    pub fn fullname(&self) -> Option<String> {
        self.qualified_name().map(QualifiedName::fullname)
    }
}

/// A record type: an ordered sequence of named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    /// The qualified name of the record.
    pub name: QualifiedName,
    /// The fields, in declaration order.
    pub fields: Vec<FieldSchema>,
    /// Optional documentation.
    pub doc: Option<String>,
}

impl RecordSchema {
    /// Create a record with the given local name and fields.
    pub fn new(name: impl Into<String>, fields: Vec<FieldSchema>) -> Self {
        Self {
            name: QualifiedName::new(name),
            fields,
            doc: None,
        }
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.name.namespace = namespace.into();
        self
    }

    /// Look up a field by its unqualified name.
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A single field within a record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    /// The unqualified field name, unique within the record.
    pub name: String,
    /// The schema of the field's value.
    pub schema: AvroSchema,
    /// The declared default value.
    ///
    /// `None` means no default was declared; `Some(Value::Null)` is a
    /// declared JSON-null default. Schema resolution treats the two the
    /// same, but the distinction is preserved in the tree.
    pub default: Option<Value>,
}

impl FieldSchema {
    /// Create a field with the given name and schema and no default.
    pub fn new(name: impl Into<String>, schema: AvroSchema) -> Self {
        Self {
            name: name.into(),
            schema,
            default: None,
        }
    }

    /// Set the default value.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// The default value as seen by schema resolution.
    ///
    /// A declared default of JSON `null` counts as absent here.
    pub fn resolvable_default(&self) -> Option<&Value> {
        self.default.as_ref().filter(|v| !v.is_null())
    }
}

/// An enumeration type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    /// The qualified name of the enum.
    pub name: QualifiedName,
    /// The symbols, in declaration order; unique within the enum.
    pub symbols: Vec<String>,
    /// Default symbol used when a written symbol is unknown to the reader.
    pub default: Option<String>,
    /// Optional documentation.
    pub doc: Option<String>,
}

impl EnumSchema {
    /// Create an enum with the given local name and symbols.
    pub fn new(name: impl Into<String>, symbols: Vec<String>) -> Self {
        Self {
            name: QualifiedName::new(name),
            symbols,
            default: None,
            doc: None,
        }
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.name.namespace = namespace.into();
        self
    }

    /// Check whether `symbol` is declared by this enum.
    pub fn has_symbol(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }
}

/// A fixed-size byte array type.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedSchema {
    /// The qualified name of the fixed type.
    pub name: QualifiedName,
    /// The size in bytes.
    pub size: usize,
    /// Optional documentation.
    pub doc: Option<String>,
}

impl FixedSchema {
    /// Create a fixed type with the given local name and size.
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: QualifiedName::new(name),
            size,
            doc: None,
        }
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.name.namespace = namespace.into();
        self
    }
}

/// An immutable, fully resolved Avro schema.
///
/// Owns the root of the tree plus an arena of named-type definitions in
/// declaration order; [`AvroSchema::Ref`] nodes index into the arena. A
/// `Schema` is built by [`parse_schema`](crate::schema::parse_schema), is
/// immutable afterwards, and may be shared freely across threads.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    root: AvroSchema,
    names: Vec<AvroSchema>,
    index: HashMap<String, NameRef>,
}

impl Schema {
    pub(crate) fn new(
        root: AvroSchema,
        names: Vec<AvroSchema>,
        index: HashMap<String, NameRef>,
    ) -> Self {
        Self { root, names, index }
    }

    /// The root node of the schema tree.
    pub fn root(&self) -> &AvroSchema {
        &self.root
    }

    /// The definition behind a name reference.
    pub fn named(&self, name_ref: NameRef) -> &AvroSchema {
        &self.names[name_ref.0]
    }

    /// Look up a named type definition by its dotted full name.
    pub fn lookup(&self, fullname: &str) -> Option<&AvroSchema> {
        self.index.get(fullname).map(|r| &self.names[r.0])
    }

    /// Follow a node through at most one name reference to its definition.
    pub fn resolve<'a>(&'a self, node: &'a AvroSchema) -> &'a AvroSchema {
        match node {
            AvroSchema::Ref(r) => &self.names[r.0],
            _ => node,
        }
    }

    /// Serialize the schema to canonical JSON text.
    ///
    /// The output parses back to an equal schema.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.to_json_value()).unwrap_or_else(|_| "null".to_string())
    }

    /// Serialize the schema to a JSON value.
    pub fn to_json_value(&self) -> Value {
        self.node_to_json(&self.root)
    }

    fn node_to_json(&self, node: &AvroSchema) -> Value {
        match node {
            AvroSchema::Null => json!("null"),
            AvroSchema::Boolean => json!("boolean"),
            AvroSchema::Int => json!("int"),
            AvroSchema::Long => json!("long"),
            AvroSchema::Float => json!("float"),
            AvroSchema::Double => json!("double"),
            AvroSchema::Bytes => json!("bytes"),
            AvroSchema::String => json!("string"),
            AvroSchema::Record(r) => {
                let mut obj = Map::new();
                obj.insert("type".to_string(), json!("record"));
                obj.insert("name".to_string(), json!(&r.name.name));
                if !r.name.namespace.is_empty() {
                    obj.insert("namespace".to_string(), json!(&r.name.namespace));
                }
                if let Some(doc) = &r.doc {
                    obj.insert("doc".to_string(), json!(doc));
                }
                let fields: Vec<Value> = r
                    .fields
                    .iter()
                    .map(|f| {
                        let mut field = Map::new();
                        field.insert("name".to_string(), json!(&f.name));
                        field.insert("type".to_string(), self.node_to_json(&f.schema));
                        if let Some(default) = &f.default {
                            field.insert("default".to_string(), default.clone());
                        }
                        Value::Object(field)
                    })
                    .collect();
                obj.insert("fields".to_string(), Value::Array(fields));
                Value::Object(obj)
            }
            AvroSchema::Enum(e) => {
                let mut obj = Map::new();
                obj.insert("type".to_string(), json!("enum"));
                obj.insert("name".to_string(), json!(&e.name.name));
                if !e.name.namespace.is_empty() {
                    obj.insert("namespace".to_string(), json!(&e.name.namespace));
                }
                if let Some(doc) = &e.doc {
                    obj.insert("doc".to_string(), json!(doc));
                }
                obj.insert("symbols".to_string(), json!(&e.symbols));
                if let Some(default) = &e.default {
                    obj.insert("default".to_string(), json!(default));
                }
                Value::Object(obj)
            }
            AvroSchema::Array(items) => json!({
                "type": "array",
                "items": self.node_to_json(items),
            }),
            AvroSchema::Map(values) => json!({
                "type": "map",
                "values": self.node_to_json(values),
            }),
            AvroSchema::Union(branches) => {
                Value::Array(branches.iter().map(|b| self.node_to_json(b)).collect())
            }
            AvroSchema::Fixed(f) => {
                let mut obj = Map::new();
                obj.insert("type".to_string(), json!("fixed"));
                obj.insert("name".to_string(), json!(&f.name.name));
                if !f.name.namespace.is_empty() {
                    obj.insert("namespace".to_string(), json!(&f.name.namespace));
                }
                if let Some(doc) = &f.doc {
                    obj.insert("doc".to_string(), json!(doc));
                }
                obj.insert("size".to_string(), json!(f.size));
                Value::Object(obj)
            }
            AvroSchema::Ref(r) => {
                json!(self.names[r.0]
                    .fullname()
                    .unwrap_or_else(|| "null".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_name_parse_dotted() {
        let name = QualifiedName::parse("com.acme.Widget", "ignored.ns");
        assert_eq!(name.namespace, "com.acme");
        assert_eq!(name.name, "Widget");
        assert_eq!(name.fullname(), "com.acme.Widget");
    }

    #[test]
    fn test_qualified_name_parse_inherits_enclosing() {
        let name = QualifiedName::parse("Widget", "com.acme");
        assert_eq!(name.namespace, "com.acme");
        assert_eq!(name.fullname(), "com.acme.Widget");
    }

    #[test]
    fn test_qualified_name_no_namespace() {
        let name = QualifiedName::parse("Widget", "");
        assert_eq!(name.fullname(), "Widget");
        assert_eq!(name.to_string(), "Widget");
    }

    #[test]
    fn test_qualified_name_equality_is_byte_equality() {
        let a = QualifiedName::new("W").with_namespace("com.acme");
        let b = QualifiedName::parse("com.acme.W", "");
        assert_eq!(a, b);
        assert_ne!(a, QualifiedName::new("W"));
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(AvroSchema::Int.kind(), SchemaKind::Int);
        assert_eq!(
            AvroSchema::Union(vec![AvroSchema::Null]).kind(),
            SchemaKind::Union
        );
        assert_eq!(SchemaKind::Record.as_str(), "record");
    }

    #[test]
    fn test_resolvable_default_treats_null_as_absent() {
        let plain = FieldSchema::new("f", AvroSchema::Int);
        assert!(plain.resolvable_default().is_none());

        let null_default = FieldSchema::new("f", AvroSchema::Int).with_default(Value::Null);
        assert!(null_default.default.is_some());
        assert!(null_default.resolvable_default().is_none());

        let real_default = FieldSchema::new("f", AvroSchema::Int).with_default(json!(0));
        assert!(real_default.resolvable_default().is_some());
    }
}
