//! TOML file source.
//!
//! Each top-level table is a group and each key inside it a record:
//!
//! ```toml
//! [app]
//! a = 1
//! ids = [2, 1]
//! owner = { name = "fjay", age = 1 }
//! ```
//!
//! Scalars are stringified, arrays of scalars are joined with `", "`, and
//! tables or nested arrays are rendered as JSON so they bind into
//! structured fields.

use crate::loader::{modified_time, read_source, Loader, LoaderError};
use crate::record::Record;
use std::path::{Path, PathBuf};
use toml::Value;

pub struct TomlLoader {
    path: PathBuf,
}

impl TomlLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn invalid(&self, message: String) -> LoaderError {
        LoaderError::Invalid {
            path: self.path.clone(),
            message,
        }
    }
}

impl Loader for TomlLoader {
    fn load(&self) -> Result<Vec<Record>, LoaderError> {
        let text = read_source(&self.path)?;
        let update_time = modified_time(&self.path);

        let table: toml::Table = text.parse().map_err(|source| LoaderError::Toml {
            path: self.path.clone(),
            source,
        })?;

        let mut records = Vec::new();
        for (group, section) in &table {
            let Value::Table(fields) = section else {
                return Err(self.invalid(format!(
                    "top-level key `{}` must be a table of records",
                    group
                )));
            };

            for (name, value) in fields {
                let raw = render(value).map_err(|e| self.invalid(format!("{}.{}: {}", group, name, e)))?;
                let mut record = Record::new(group.as_str(), name.as_str(), raw);
                record.update_time = update_time;
                records.push(record);
            }
        }

        tracing::trace!(path = %self.path.display(), size = records.len(), "Loaded TOML records");
        Ok(records)
    }

    fn describe(&self) -> String {
        format!("toml:{}", self.path.display())
    }
}

/// Render a TOML value as the raw string the binder expects.
fn render(value: &Value) -> Result<String, serde_json::Error> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Integer(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::Boolean(b) => Ok(b.to_string()),
        Value::Datetime(d) => Ok(d.to_string()),
        Value::Array(items) if items.iter().all(is_scalar) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                parts.push(render(item)?);
            }
            Ok(parts.join(", "))
        }
        Value::Array(_) | Value::Table(_) => serde_json::to_string(value),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Table(_))
}
