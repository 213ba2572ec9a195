//! Target shape descriptions.
//!
//! Rust has no runtime reflection, so every bindable type states its own
//! field table once through [`ConfigShape::schema`]. The binder walks that
//! table instead of inspecting the type.
//!
//! # Data Flow
//! ```text
//! ConfigShape::schema()
//!     → TargetSchema (default group + ordered field descriptors)
//!     → binder (field-driven traversal)
//!     → serde document → T
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Kind of a single scalar value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Int,
    UInt,
    Float,
    String,
    /// Unit enum variant, passed through as its serde name.
    Enum,
    /// Human-readable span such as `30s` or `1h 30m`.
    Duration,
    /// RFC 3339 timestamp.
    Timestamp,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Int => "int",
            ScalarKind::UInt => "uint",
            ScalarKind::Float => "float",
            ScalarKind::String => "string",
            ScalarKind::Enum => "enum",
            ScalarKind::Duration => "duration",
            ScalarKind::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

/// Declared kind of a target field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Scalar(ScalarKind),
    /// Comma separated list of scalars.
    Sequence(ScalarKind),
    /// JSON document parsed into the field's own type.
    Structured,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Scalar(kind) => write!(f, "{}", kind),
            FieldKind::Sequence(kind) => write!(f, "sequence<{}>", kind),
            FieldKind::Structured => f.write_str("structured"),
        }
    }
}

/// One field of a target shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    /// Excluded fields are never written by binding or refresh.
    pub excluded: bool,
}

/// Ordered field table of a bindable type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TargetSchema {
    /// Group used when the caller does not pass one.
    pub default_group: Option<String>,
    pub fields: Vec<FieldDescriptor>,
}

impl TargetSchema {
    pub fn builder() -> TargetSchemaBuilder {
        TargetSchemaBuilder::default()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of fields excluded at the type level.
    pub fn excluded_fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter(|f| f.excluded).map(|f| f.name.as_str())
    }
}

/// Error raised when a schema declaration is inconsistent.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("field `{0}` declared more than once")]
    DuplicateField(String),

    #[error("field name must not be empty")]
    EmptyFieldName,
}

/// Builder for [`TargetSchema`].
#[derive(Debug, Default)]
pub struct TargetSchemaBuilder {
    default_group: Option<String>,
    fields: Vec<FieldDescriptor>,
}

impl TargetSchemaBuilder {
    /// Set the type-level default group.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.default_group = Some(group.into());
        self
    }

    pub fn field(self, name: impl Into<String>, kind: ScalarKind) -> Self {
        self.push(name, FieldKind::Scalar(kind), false)
    }

    pub fn sequence(self, name: impl Into<String>, element: ScalarKind) -> Self {
        self.push(name, FieldKind::Sequence(element), false)
    }

    pub fn structured(self, name: impl Into<String>) -> Self {
        self.push(name, FieldKind::Structured, false)
    }

    /// Declare a field that binding must leave alone.
    pub fn excluded(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.push(name, kind, true)
    }

    fn push(mut self, name: impl Into<String>, kind: FieldKind, excluded: bool) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.into(),
            kind,
            excluded,
        });
        self
    }

    /// Finish the schema, rejecting duplicate or empty field names.
    pub fn try_build(self) -> Result<TargetSchema, SchemaError> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(SchemaError::EmptyFieldName);
            }
            if !seen.insert(field.name.to_ascii_lowercase()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
        }

        Ok(TargetSchema {
            default_group: self.default_group,
            fields: self.fields,
        })
    }

    /// Finish the schema without validation.
    ///
    /// Schemas are usually literal declarations; use [`try_build`](Self::try_build)
    /// when the field list is assembled at runtime.
    pub fn build(self) -> TargetSchema {
        TargetSchema {
            default_group: self.default_group,
            fields: self.fields,
        }
    }
}

/// A type that can be bound from configuration records.
///
/// Field names in the schema must match the serde names of the struct
/// fields.
///
/// ```
/// use live_config::schema::{ConfigShape, ScalarKind, TargetSchema};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// struct AppConfig {
///     a: i64,
///     b: bool,
/// }
///
/// impl ConfigShape for AppConfig {
///     fn schema() -> TargetSchema {
///         TargetSchema::builder()
///             .group("app")
///             .field("a", ScalarKind::Int)
///             .field("b", ScalarKind::Bool)
///             .build()
///     }
/// }
/// ```
pub trait ConfigShape: Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static {
    fn schema() -> TargetSchema;
}
