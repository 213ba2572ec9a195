//! Record binding.
//!
//! # Data Flow
//! ```text
//! records
//!     → filter (enabled, group match)
//!     → per schema field: select by name, enforce uniqueness
//!     → convert.rs (raw string → typed value)
//!     → serde document → T
//! ```
//!
//! # Design Decisions
//! - Field-driven traversal: missing and ambiguous fields are explicit outcomes
//! - A bind either produces a whole value or fails; nothing is half-assigned
//! - Binding onto an existing value leaves excluded fields untouched

mod convert;

use crate::record::Record;
use crate::schema::{ConfigShape, FieldDescriptor, TargetSchema};
use serde::Serialize;
use serde_path_to_error::Segment;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while binding records into a target shape.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindError {
    /// More than one enabled record matches one field.
    #[error("ambiguous config: field `{field}` in group `{group}` matched {count} enabled records")]
    Ambiguous {
        field: String,
        group: String,
        count: usize,
    },

    /// A raw value cannot be coerced to the field's declared kind.
    #[error("cannot convert {value:?} for field `{field}` to {kind}: {reason}")]
    Conversion {
        field: String,
        value: String,
        kind: String,
        reason: String,
    },

    /// The populated document does not fit the target type.
    #[error("cannot build {target}: {reason}")]
    Shape { target: &'static str, reason: String },
}

/// Bind records into a fresh `T` using `T::schema()`.
///
/// `group` overrides the schema's default group. `excluded` names fields
/// that are skipped in addition to the schema's excluded fields.
pub fn bind<T: ConfigShape>(
    records: &[Record],
    group: Option<&str>,
    excluded: &[&str],
) -> Result<T, BindError> {
    bind_with_schema(records, &T::schema(), group, excluded)
}

/// Bind records into a fresh `T` with an already computed schema.
pub fn bind_with_schema<T: ConfigShape>(
    records: &[Record],
    schema: &TargetSchema,
    group: Option<&str>,
    excluded: &[&str],
) -> Result<T, BindError> {
    rebind_onto(records, schema, &T::default(), group, excluded)
}

/// Bind records onto a copy of `current`.
///
/// Non-excluded fields are rewritten from the records (or reset to their
/// default when no record matches). Excluded fields keep the value they
/// have in `current`.
pub fn rebind_onto<T: ConfigShape>(
    records: &[Record],
    schema: &TargetSchema,
    current: &T,
    group: Option<&str>,
    excluded: &[&str],
) -> Result<T, BindError> {
    let group = group.or(schema.default_group.as_deref());
    let candidates: Vec<&Record> = records
        .iter()
        .filter(|r| r.enabled && group.map_or(true, |g| r.matches_group(g)))
        .collect();

    let mut document = to_object(current)?;
    let defaults = to_object(&T::default())?;
    let mut assigned: Vec<(&FieldDescriptor, &str)> = Vec::new();

    for field in &schema.fields {
        if field.excluded || excluded.contains(&field.name.as_str()) {
            continue;
        }

        let matches: Vec<&Record> = candidates
            .iter()
            .copied()
            .filter(|r| r.matches_name(&field.name))
            .collect();

        let value = match matches.as_slice() {
            [] => None,
            [record] => {
                let value = convert_field(field, record)?;
                if let (Some(_), Some(raw)) = (&value, record.value.as_deref()) {
                    assigned.push((field, raw));
                }
                value
            }
            _ => {
                return Err(BindError::Ambiguous {
                    field: field.name.clone(),
                    group: group.unwrap_or("*").to_string(),
                    count: matches.len(),
                })
            }
        };

        match value {
            Some(value) => {
                document.insert(field.name.clone(), value);
            }
            None => match defaults.get(&field.name) {
                Some(default) => {
                    document.insert(field.name.clone(), default.clone());
                }
                None => {
                    document.remove(&field.name);
                }
            },
        }
    }

    serde_path_to_error::deserialize(Value::Object(document)).map_err(|e| {
        let field = match e.path().iter().next() {
            Some(Segment::Map { key }) => assigned.iter().find(|(f, _)| f.name == *key),
            _ => None,
        };

        match field {
            Some((field, raw)) => BindError::Conversion {
                field: field.name.clone(),
                value: raw.to_string(),
                kind: field.kind.to_string(),
                reason: e.inner().to_string(),
            },
            None => BindError::Shape {
                target: std::any::type_name::<T>(),
                reason: e.to_string(),
            },
        }
    })
}

fn convert_field(field: &FieldDescriptor, record: &Record) -> Result<Option<Value>, BindError> {
    let Some(raw) = record.value.as_deref() else {
        return Ok(None);
    };

    convert::convert(raw, field.kind).map_err(|reason| BindError::Conversion {
        field: field.name.clone(),
        value: raw.to_string(),
        kind: field.kind.to_string(),
        reason,
    })
}

fn to_object<T: Serialize>(value: &T) -> Result<Map<String, Value>, BindError> {
    let shape = |reason: String| BindError::Shape {
        target: std::any::type_name::<T>(),
        reason,
    };

    match serde_json::to_value(value).map_err(|e| shape(e.to_string()))? {
        Value::Object(map) => Ok(map),
        other => Err(shape(format!("expected a struct, serialized to {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldKind, ScalarKind};
    use serde::Deserialize;
    use std::time::Duration;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct AppConfig {
        a: i64,
        b: bool,
        ids: Vec<i64>,
        owner: Option<Owner>,
        timeout: Duration,
        note: String,
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Owner {
        name: String,
        age: u32,
    }

    impl ConfigShape for AppConfig {
        fn schema() -> TargetSchema {
            TargetSchema::builder()
                .group("app")
                .field("a", ScalarKind::Int)
                .field("b", ScalarKind::Bool)
                .sequence("ids", ScalarKind::Int)
                .structured("owner")
                .field("timeout", ScalarKind::Duration)
                .excluded("note", FieldKind::Scalar(ScalarKind::String))
                .build()
        }
    }

    #[test]
    fn test_scalar_scenario() {
        let records = vec![Record::new("app", "a", "1"), Record::new("app", "b", "0")];
        let config: AppConfig = bind(&records, None, &[]).unwrap();

        assert_eq!(config.a, 1);
        assert!(!config.b);
    }

    #[test]
    fn test_rebinding_is_deterministic() {
        let records = vec![
            Record::new("app", "a", "7"),
            Record::new("app", "ids", "3, 2, 1"),
            Record::new("app", "owner", "{'name':'x','age':2}"),
        ];

        let first: AppConfig = bind(&records, None, &[]).unwrap();
        let second: AppConfig = bind(&records, None, &[]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_ambiguous_field_fails() {
        let records = vec![Record::new("app", "a", "1"), Record::new("APP", "A", "2")];
        let err = bind::<AppConfig>(&records, None, &[]).unwrap_err();

        assert_eq!(
            err,
            BindError::Ambiguous {
                field: "a".into(),
                group: "app".into(),
                count: 2
            }
        );
    }

    #[test]
    fn test_disabled_records_are_ignored() {
        let records = vec![
            Record::new("app", "a", "1"),
            Record::new("app", "a", "99").disabled(),
            Record::new("app", "b", "true").disabled(),
        ];
        let config: AppConfig = bind(&records, None, &[]).unwrap();

        assert_eq!(config.a, 1);
        assert!(!config.b);
    }

    #[test]
    fn test_sequence_and_structured_fields() {
        let records = vec![
            Record::new("app", "ids", "2, 1"),
            Record::new("app", "owner", "{'name':'fjay','age':1}"),
            Record::new("app", "timeout", "45s"),
        ];
        let config: AppConfig = bind(&records, None, &[]).unwrap();

        assert_eq!(config.ids, vec![2, 1]);
        assert_eq!(
            config.owner,
            Some(Owner {
                name: "fjay".into(),
                age: 1
            })
        );
        assert_eq!(config.timeout, Duration::from_secs(45));
    }

    #[test]
    fn test_group_filter() {
        let records = vec![Record::new("app", "a", "1"), Record::new("other", "a", "2")];

        let default_group: AppConfig = bind(&records, None, &[]).unwrap();
        let explicit: AppConfig = bind(&records, Some("OTHER"), &[]).unwrap();

        assert_eq!(default_group.a, 1);
        assert_eq!(explicit.a, 2);
    }

    #[test]
    fn test_no_group_means_no_filter() {
        #[derive(Debug, Clone, Default, Serialize, Deserialize)]
        struct Loose {
            port: u16,
        }
        impl ConfigShape for Loose {
            fn schema() -> TargetSchema {
                TargetSchema::builder().field("port", ScalarKind::UInt).build()
            }
        }

        let records = vec![Record::new("anything", "Port", "8080")];
        let loose: Loose = bind(&records, None, &[]).unwrap();
        assert_eq!(loose.port, 8080);
    }

    #[test]
    fn test_conversion_error_names_field() {
        let records = vec![Record::new("app", "a", "1"), Record::new("app", "b", "perhaps")];
        let err = bind::<AppConfig>(&records, None, &[]).unwrap_err();

        match err {
            BindError::Conversion { field, value, kind, .. } => {
                assert_eq!(field, "b");
                assert_eq!(value, "perhaps");
                assert_eq!(kind, "bool");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_out_of_range_names_field() {
        #[derive(Debug, Clone, Default, Serialize, Deserialize)]
        struct Small {
            level: u8,
        }
        impl ConfigShape for Small {
            fn schema() -> TargetSchema {
                TargetSchema::builder().field("level", ScalarKind::UInt).build()
            }
        }

        let records = vec![Record::new("x", "level", "300")];
        match bind::<Small>(&records, None, &[]).unwrap_err() {
            BindError::Conversion { field, value, kind, reason } => {
                assert_eq!(field, "level");
                assert_eq!(value, "300");
                assert_eq!(kind, "uint");
                assert!(reason.contains("u8"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unset_value_keeps_default() {
        let records = vec![Record::unset("app", "a"), Record::new("app", "b", " ")];
        let config: AppConfig = bind(&records, None, &[]).unwrap();

        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_excluded_fields_are_untouched() {
        let records = vec![
            Record::new("app", "a", "5"),
            Record::new("app", "note", "from records"),
            Record::new("app", "b", "true"),
        ];
        let current = AppConfig {
            a: 1,
            b: false,
            note: "kept".into(),
            ..Default::default()
        };

        let schema = AppConfig::schema();
        let next = rebind_onto(&records, &schema, &current, None, &["b"]).unwrap();

        assert_eq!(next.a, 5);
        assert_eq!(next.note, "kept");
        assert!(!next.b);
    }

    #[test]
    fn test_rebind_resets_fields_that_disappeared() {
        let current = AppConfig {
            a: 9,
            ids: vec![1],
            ..Default::default()
        };

        let next = rebind_onto(&[], &AppConfig::schema(), &current, None, &[]).unwrap();
        assert_eq!(next.a, 0);
        assert!(next.ids.is_empty());
    }

    #[test]
    fn test_failed_bind_leaves_current_untouched() {
        let current = AppConfig {
            a: 3,
            ..Default::default()
        };
        let records = vec![Record::new("app", "a", "4"), Record::new("app", "ids", "1, two")];

        assert!(rebind_onto(&records, &AppConfig::schema(), &current, None, &[]).is_err());
        assert_eq!(current.a, 3);
    }
}
