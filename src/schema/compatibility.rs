//! Schema compatibility checking.
//!
//! Decides whether a reader schema can consume data written with an older
//! writer schema under the Avro schema-resolution rules. The boolean
//! predicate [`check_compatible`] is the hot path and allocates nothing
//! beyond the visited-pair set needed to terminate on recursive schemas;
//! [`explain_compatible`] re-runs the same traversal collecting path-tagged
//! reasons for a `false` verdict.
//!
//! Union semantics are deliberately the conservative reading of the Avro
//! resolution rules: every writer branch must be absorbable by some reader
//! branch, while a reader union against a non-union writer succeeds on the
//! first matching branch.

use std::collections::HashSet;
use std::fmt;

use crate::schema::{AvroSchema, EnumSchema, RecordSchema, Schema};

/// Check whether `reader` can consume data written with `writer`.
///
/// Pure over its inputs; never errors. Ill-formed schemas cannot reach this
/// predicate because only a successful parse produces a [`Schema`].
///
/// # Example
/// ```
/// use preflight::schema::{check_compatible, parse_schema};
///
/// let reader = parse_schema(r#""long""#).unwrap();
/// let writer = parse_schema(r#""int""#).unwrap();
/// assert!(check_compatible(&reader, &writer));
/// assert!(!check_compatible(&writer, &reader));
/// ```
pub fn check_compatible(reader: &Schema, writer: &Schema) -> bool {
    Checker::new(reader, writer).check(reader.root(), writer.root())
}

struct Checker<'a> {
    reader: &'a Schema,
    writer: &'a Schema,
    /// Named-type pairs on the current derivation path. A second encounter
    /// of a pair is assumed compatible (co-induction over recursive types);
    /// entries are removed on unwind so union backtracking is unaffected.
    visiting: HashSet<(String, String)>,
}

impl<'a> Checker<'a> {
    fn new(reader: &'a Schema, writer: &'a Schema) -> Self {
        Self {
            reader,
            writer,
            visiting: HashSet::new(),
        }
    }

    fn check(&mut self, reader: &'a AvroSchema, writer: &'a AvroSchema) -> bool {
        let reader = self.reader.resolve(reader);
        let writer = self.writer.resolve(writer);

        let pair = match (reader.qualified_name(), writer.qualified_name()) {
            (Some(r), Some(w)) => {
                let key = (r.fullname(), w.fullname());
                if self.visiting.contains(&key) {
                    return true;
                }
                self.visiting.insert(key.clone());
                Some(key)
            }
            _ => None,
        };

        let compatible = self.check_resolved(reader, writer);

        if let Some(key) = pair {
            self.visiting.remove(&key);
        }
        compatible
    }

    fn check_resolved(&mut self, reader: &'a AvroSchema, writer: &'a AvroSchema) -> bool {
        if reader.kind() == writer.kind() {
            if !resolves(reader, writer) {
                return false;
            }
            match (reader, writer) {
                (AvroSchema::Record(r), AvroSchema::Record(w)) => self.check_record(r, w),
                (AvroSchema::Enum(r), AvroSchema::Enum(w)) => check_enum(r, w),
                (AvroSchema::Union(r), AvroSchema::Union(w)) => self.check_union_pair(r, w),
                (AvroSchema::Array(r), AvroSchema::Array(w)) => self.check(r, w),
                (AvroSchema::Map(r), AvroSchema::Map(w)) => self.check(r, w),
                _ => true,
            }
        } else if let AvroSchema::Union(branches) = reader {
            // The first reader branch that matches the writer wins.
            branches.iter().any(|branch| self.check(branch, writer))
        } else if let AvroSchema::Union(branches) = writer {
            // A non-union reader must absorb every writer branch.
            branches.iter().all(|branch| self.check(reader, branch))
        } else {
            promotes(writer, reader)
        }
    }

    /// Reader-driven field walk: same-named writer fields are resolved
    /// recursively, missing ones must have a usable default on the reader
    /// side. Extra writer fields are ignored.
    fn check_record(&mut self, reader: &'a RecordSchema, writer: &'a RecordSchema) -> bool {
        for reader_field in &reader.fields {
            match writer.field(&reader_field.name) {
                Some(writer_field) => {
                    if !self.check(&reader_field.schema, &writer_field.schema) {
                        return false;
                    }
                }
                None => {
                    if reader_field.resolvable_default().is_none() {
                        return false;
                    }
                }
            }
        }
        true
    }

    fn check_union_pair(&mut self, reader: &'a [AvroSchema], writer: &'a [AvroSchema]) -> bool {
        writer
            .iter()
            .all(|wb| reader.iter().any(|rb| self.check(rb, wb)))
    }
}

fn check_enum(reader: &EnumSchema, writer: &EnumSchema) -> bool {
    // A reader-side default absorbs writer symbols the reader does not know.
    if reader.default.is_some() {
        return true;
    }
    writer.symbols.iter().all(|s| reader.has_symbol(s))
}

/// The scalar-level resolve test for two nodes of the same kind: names must
/// match for named types, sizes must match for fixed.
fn resolves(reader: &AvroSchema, writer: &AvroSchema) -> bool {
    match (reader, writer) {
        (AvroSchema::Record(r), AvroSchema::Record(w)) => r.name == w.name,
        (AvroSchema::Enum(r), AvroSchema::Enum(w)) => r.name == w.name,
        (AvroSchema::Fixed(r), AvroSchema::Fixed(w)) => r.name == w.name && r.size == w.size,
        _ => true,
    }
}

/// The documented promotions: int widens to long/float/double, long to
/// float/double, float to double, and string and bytes are interchangeable.
fn promotes(writer: &AvroSchema, reader: &AvroSchema) -> bool {
    matches!(
        (writer, reader),
        (AvroSchema::Int, AvroSchema::Long)
            | (AvroSchema::Int, AvroSchema::Float)
            | (AvroSchema::Int, AvroSchema::Double)
            | (AvroSchema::Long, AvroSchema::Float)
            | (AvroSchema::Long, AvroSchema::Double)
            | (AvroSchema::Float, AvroSchema::Double)
            | (AvroSchema::String, AvroSchema::Bytes)
            | (AvroSchema::Bytes, AvroSchema::String)
    )
}

/// Result of a diagnostic compatibility check.
#[derive(Debug, Clone)]
pub struct CompatibilityResult {
    /// Whether the schemas are compatible.
    pub is_compatible: bool,
    /// The incompatibilities found; empty when compatible.
    pub incompatibilities: Vec<SchemaIncompatibility>,
}

impl CompatibilityResult {
    /// A compatible result.
    pub fn compatible() -> Self {
        Self {
            is_compatible: true,
            incompatibilities: Vec::new(),
        }
    }

    /// An incompatible result with a single finding.
    pub fn incompatible(incompatibility: SchemaIncompatibility) -> Self {
        Self {
            is_compatible: false,
            incompatibilities: vec![incompatibility],
        }
    }

    /// Fold another result into this one.
    pub fn merge(&mut self, other: CompatibilityResult) {
        if !other.is_compatible {
            self.is_compatible = false;
        }
        self.incompatibilities.extend(other.incompatibilities);
    }
}

/// A single incompatibility, anchored to the element it was found at.
#[derive(Debug, Clone)]
pub struct SchemaIncompatibility {
    /// Path to the element, e.g. `field 'address'.field 'city'`.
    pub path: String,
    /// Why the element is incompatible.
    pub reason: IncompatibilityReason,
}

impl fmt::Display for SchemaIncompatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.reason)
        } else {
            write!(f, "at {}: {}", self.path, self.reason)
        }
    }
}

/// Reasons a reader cannot consume a writer's data.
#[derive(Debug, Clone)]
pub enum IncompatibilityReason {
    /// The kinds cannot be resolved against each other.
    TypeMismatch {
        writer_type: String,
        reader_type: String,
    },
    /// Named types have different names.
    NameMismatch {
        writer_name: String,
        reader_name: String,
    },
    /// Fixed types have different sizes.
    FixedSizeMismatch {
        writer_size: usize,
        reader_size: usize,
    },
    /// The reader declares a field the writer lacks, with no usable default.
    MissingRequiredField { field_name: String },
    /// A writer symbol is unknown to the reader, which has no default.
    MissingEnumSymbol { symbol: String },
    /// A writer union branch is not absorbable by any reader branch.
    UnionBranchIncompatible { branch_index: usize },
}

impl fmt::Display for IncompatibilityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncompatibilityReason::TypeMismatch {
                writer_type,
                reader_type,
            } => write!(
                f,
                "type mismatch: writer has '{}', reader expects '{}'",
                writer_type, reader_type
            ),
            IncompatibilityReason::NameMismatch {
                writer_name,
                reader_name,
            } => write!(
                f,
                "name mismatch: writer has '{}', reader expects '{}'",
                writer_name, reader_name
            ),
            IncompatibilityReason::FixedSizeMismatch {
                writer_size,
                reader_size,
            } => write!(
                f,
                "fixed size mismatch: writer has {} bytes, reader expects {}",
                writer_size, reader_size
            ),
            IncompatibilityReason::MissingRequiredField { field_name } => write!(
                f,
                "reader field '{}' is not written and has no default",
                field_name
            ),
            IncompatibilityReason::MissingEnumSymbol { symbol } => write!(
                f,
                "writer symbol '{}' is unknown to the reader, which has no default",
                symbol
            ),
            IncompatibilityReason::UnionBranchIncompatible { branch_index } => write!(
                f,
                "writer union branch {} does not match any reader branch",
                branch_index
            ),
        }
    }
}

/// Diagnostic variant of [`check_compatible`]: same verdict, with
/// path-tagged reasons collected for an incompatible pair.
pub fn explain_compatible(reader: &Schema, writer: &Schema) -> CompatibilityResult {
    let mut explainer = Explainer {
        reader,
        writer,
        visiting: HashSet::new(),
    };
    explainer.explain(reader.root(), writer.root(), String::new())
}

struct Explainer<'a> {
    reader: &'a Schema,
    writer: &'a Schema,
    visiting: HashSet<(String, String)>,
}

impl<'a> Explainer<'a> {
    fn explain(
        &mut self,
        reader: &'a AvroSchema,
        writer: &'a AvroSchema,
        path: String,
    ) -> CompatibilityResult {
        let reader = self.reader.resolve(reader);
        let writer = self.writer.resolve(writer);

        let pair = match (reader.qualified_name(), writer.qualified_name()) {
            (Some(r), Some(w)) => {
                let key = (r.fullname(), w.fullname());
                if self.visiting.contains(&key) {
                    return CompatibilityResult::compatible();
                }
                self.visiting.insert(key.clone());
                Some(key)
            }
            _ => None,
        };

        let result = self.explain_resolved(reader, writer, path);

        if let Some(key) = pair {
            self.visiting.remove(&key);
        }
        result
    }

    fn explain_resolved(
        &mut self,
        reader: &'a AvroSchema,
        writer: &'a AvroSchema,
        path: String,
    ) -> CompatibilityResult {
        if reader.kind() == writer.kind() {
            if let Some(reason) = resolve_failure(reader, writer) {
                return CompatibilityResult::incompatible(SchemaIncompatibility { path, reason });
            }
            match (reader, writer) {
                (AvroSchema::Record(r), AvroSchema::Record(w)) => self.explain_record(r, w, path),
                (AvroSchema::Enum(r), AvroSchema::Enum(w)) => explain_enum(r, w, path),
                (AvroSchema::Union(r), AvroSchema::Union(w)) => {
                    self.explain_union_pair(r, w, path)
                }
                (AvroSchema::Array(r), AvroSchema::Array(w)) => {
                    let item_path = extend_path(&path, "items");
                    self.explain(r, w, item_path)
                }
                (AvroSchema::Map(r), AvroSchema::Map(w)) => {
                    let value_path = extend_path(&path, "values");
                    self.explain(r, w, value_path)
                }
                _ => CompatibilityResult::compatible(),
            }
        } else if let AvroSchema::Union(branches) = reader {
            let matched = {
                let mut probe = Checker::new(self.reader, self.writer);
                branches.iter().any(|branch| probe.check(branch, writer))
            };
            if matched {
                CompatibilityResult::compatible()
            } else {
                CompatibilityResult::incompatible(SchemaIncompatibility {
                    path,
                    reason: IncompatibilityReason::TypeMismatch {
                        writer_type: describe(writer),
                        reader_type: "union".to_string(),
                    },
                })
            }
        } else if let AvroSchema::Union(branches) = writer {
            let mut result = CompatibilityResult::compatible();
            for (index, branch) in branches.iter().enumerate() {
                let branch_path = extend_path(&path, &format!("union branch {}", index));
                result.merge(self.explain(reader, branch, branch_path));
            }
            result
        } else if promotes(writer, reader) {
            CompatibilityResult::compatible()
        } else {
            CompatibilityResult::incompatible(SchemaIncompatibility {
                path,
                reason: IncompatibilityReason::TypeMismatch {
                    writer_type: describe(writer),
                    reader_type: describe(reader),
                },
            })
        }
    }

    fn explain_record(
        &mut self,
        reader: &'a RecordSchema,
        writer: &'a RecordSchema,
        path: String,
    ) -> CompatibilityResult {
        let mut result = CompatibilityResult::compatible();
        for reader_field in &reader.fields {
            let field_path = extend_path(&path, &format!("field '{}'", reader_field.name));
            match writer.field(&reader_field.name) {
                Some(writer_field) => {
                    result.merge(self.explain(
                        &reader_field.schema,
                        &writer_field.schema,
                        field_path,
                    ));
                }
                None => {
                    if reader_field.resolvable_default().is_none() {
                        result.merge(CompatibilityResult::incompatible(SchemaIncompatibility {
                            path: field_path,
                            reason: IncompatibilityReason::MissingRequiredField {
                                field_name: reader_field.name.clone(),
                            },
                        }));
                    }
                }
            }
        }
        result
    }

    fn explain_union_pair(
        &mut self,
        reader: &'a [AvroSchema],
        writer: &'a [AvroSchema],
        path: String,
    ) -> CompatibilityResult {
        let mut result = CompatibilityResult::compatible();
        for (index, writer_branch) in writer.iter().enumerate() {
            let matched = {
                let mut probe = Checker::new(self.reader, self.writer);
                reader
                    .iter()
                    .any(|reader_branch| probe.check(reader_branch, writer_branch))
            };
            if !matched {
                result.merge(CompatibilityResult::incompatible(SchemaIncompatibility {
                    path: path.clone(),
                    reason: IncompatibilityReason::UnionBranchIncompatible {
                        branch_index: index,
                    },
                }));
            }
        }
        result
    }
}

fn explain_enum(
    reader: &EnumSchema,
    writer: &EnumSchema,
    path: String,
) -> CompatibilityResult {
    if reader.default.is_some() {
        return CompatibilityResult::compatible();
    }
    let mut result = CompatibilityResult::compatible();
    for symbol in &writer.symbols {
        if !reader.has_symbol(symbol) {
            result.merge(CompatibilityResult::incompatible(SchemaIncompatibility {
                path: path.clone(),
                reason: IncompatibilityReason::MissingEnumSymbol {
                    symbol: symbol.clone(),
                },
            }));
        }
    }
    result
}

/// Mirror of [`resolves`] that says why the primary test failed.
fn resolve_failure(reader: &AvroSchema, writer: &AvroSchema) -> Option<IncompatibilityReason> {
    match (reader, writer) {
        (AvroSchema::Record(r), AvroSchema::Record(w)) if r.name != w.name => {
            Some(IncompatibilityReason::NameMismatch {
                writer_name: w.name.fullname(),
                reader_name: r.name.fullname(),
            })
        }
        (AvroSchema::Enum(r), AvroSchema::Enum(w)) if r.name != w.name => {
            Some(IncompatibilityReason::NameMismatch {
                writer_name: w.name.fullname(),
                reader_name: r.name.fullname(),
            })
        }
        (AvroSchema::Fixed(r), AvroSchema::Fixed(w)) => {
            if r.name != w.name {
                Some(IncompatibilityReason::NameMismatch {
                    writer_name: w.name.fullname(),
                    reader_name: r.name.fullname(),
                })
            } else if r.size != w.size {
                Some(IncompatibilityReason::FixedSizeMismatch {
                    writer_size: w.size,
                    reader_size: r.size,
                })
            } else {
                None
            }
        }
        _ => None,
    }
}

fn extend_path(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", path, segment)
    }
}

fn describe(node: &AvroSchema) -> String {
    match node {
        AvroSchema::Record(r) => format!("record '{}'", r.name),
        AvroSchema::Enum(e) => format!("enum '{}'", e.name),
        AvroSchema::Fixed(f) => format!("fixed '{}' ({} bytes)", f.name, f.size),
        // References are resolved before anything is reported.
        AvroSchema::Ref(_) => "ref".to_string(),
        other => other.kind().as_str().to_string(),
    }
}
