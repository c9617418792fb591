//! Avro schema normalization and compatibility engine.
//!
//! This library is the schema core of a registry: it accepts Avro schemas
//! submitted as JSON text, rewrites them into a canonical form, builds an
//! immutable schema tree, and decides whether a candidate reader schema can
//! consume data written under an older writer schema.
//!
//! The three operations compose left to right:
//!
//! ```
//! use preflight::{check_compatible, parse_schema, sanitize_schema};
//!
//! let writer = parse_schema(&sanitize_schema(
//!     r#"{"type":"record","name":"Event","fields":[{"name":"id","type":"int"}]}"#,
//! )?)?;
//! let reader = parse_schema(&sanitize_schema(
//!     r#"{"type":"record","name":"Event","fields":[{"name":"id","type":"long"}]}"#,
//! )?)?;
//!
//! assert!(check_compatible(&reader, &writer));
//! # Ok::<(), preflight::SchemaError>(())
//! ```
//!
//! All operations are pure: there is no I/O, no global state, and a parsed
//! [`Schema`] may be shared across threads without synchronization.

pub mod error;
pub mod sanitize;
pub mod schema;

// Re-export main types
pub use error::SchemaError;
pub use sanitize::sanitize_schema;
pub use schema::{
    check_compatible, explain_compatible, parse_schema, parse_schema_with_options, AvroSchema,
    CompatibilityResult, EnumSchema, FieldSchema, FixedSchema, IncompatibilityReason, NameRef,
    QualifiedName, RecordSchema, Schema, SchemaIncompatibility, SchemaKind, SchemaParser,
};
