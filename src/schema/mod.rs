//! Avro schema trees, parsing, and compatibility.
//!
//! This module defines the schema tree model (primitives, records, enums,
//! arrays, maps, unions, fixed, and named references resolved through an
//! arena), the JSON schema parser, and reader/writer compatibility checking.

mod compatibility;
mod parser;
mod types;

pub use compatibility::{
    check_compatible, explain_compatible, CompatibilityResult, IncompatibilityReason,
    SchemaIncompatibility,
};
pub use parser::{parse_schema, parse_schema_with_options, SchemaParser};
pub use types::{
    AvroSchema, EnumSchema, FieldSchema, FixedSchema, NameRef, QualifiedName, RecordSchema, Schema,
    SchemaKind,
};
