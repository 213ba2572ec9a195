//! Raw string to typed value conversion.
//!
//! Every converter produces a `serde_json::Value` in the shape serde expects
//! for the declared kind. `Ok(None)` means "unset": the caller keeps the
//! field at its default.

use crate::schema::{FieldKind, ScalarKind};
use serde_json::{Number, Value};

pub(crate) fn convert(raw: &str, kind: FieldKind) -> Result<Option<Value>, String> {
    match kind {
        FieldKind::Scalar(scalar_kind) => scalar(raw, scalar_kind),
        FieldKind::Sequence(element) => sequence(raw, element).map(Some),
        FieldKind::Structured => structured(raw),
    }
}

fn scalar(raw: &str, kind: ScalarKind) -> Result<Option<Value>, String> {
    if kind == ScalarKind::String {
        return Ok(Some(Value::String(raw.to_string())));
    }

    let token = raw.trim();
    if token.is_empty() {
        return Ok(None);
    }

    let value = match kind {
        ScalarKind::Bool => parse_bool(token)
            .map(Value::Bool)
            .ok_or_else(|| "expected one of true/false/1/0/yes/no/on/off".to_string())?,
        ScalarKind::Int => token.parse::<i64>().map(Value::from).map_err(|e| e.to_string())?,
        ScalarKind::UInt => token.parse::<u64>().map(Value::from).map_err(|e| e.to_string())?,
        ScalarKind::Float => {
            let float = token.parse::<f64>().map_err(|e| e.to_string())?;
            Number::from_f64(float)
                .map(Value::Number)
                .ok_or_else(|| "value is not a finite number".to_string())?
        }
        ScalarKind::String | ScalarKind::Enum => Value::String(token.to_string()),
        ScalarKind::Duration => {
            let duration = humantime::parse_duration(token).map_err(|e| e.to_string())?;
            serde_json::to_value(duration).map_err(|e| e.to_string())?
        }
        ScalarKind::Timestamp => {
            let time = humantime::parse_rfc3339_weak(token).map_err(|e| e.to_string())?;
            serde_json::to_value(time).map_err(|e| e.to_string())?
        }
    };

    Ok(Some(value))
}

fn parse_bool(token: &str) -> Option<bool> {
    match token.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "on" => Some(true),
        "false" | "0" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn sequence(raw: &str, element: ScalarKind) -> Result<Value, String> {
    let mut items = Vec::new();
    for (index, token) in raw.split(',').map(str::trim).filter(|t| !t.is_empty()).enumerate() {
        let item = scalar(token, element).map_err(|reason| format!("element {}: {}", index, reason))?;
        items.push(item.unwrap_or(Value::Null));
    }
    Ok(Value::Array(items))
}

fn structured(raw: &str) -> Result<Option<Value>, String> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse_relaxed(raw).map(Some).map_err(|e| e.to_string())
}

/// Parse JSON, falling back to the single-quoted form (`{'a':1}`).
pub(crate) fn parse_relaxed(raw: &str) -> Result<Value, serde_json::Error> {
    match serde_json::from_str(raw) {
        Ok(value) => Ok(value),
        Err(strict) => serde_json::from_str(&requote(raw)).map_err(|_| strict),
    }
}

/// Rewrite single-quoted strings as double-quoted JSON strings.
fn requote(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        match quote {
            None => {
                if c == '\'' || c == '"' {
                    quote = Some(c);
                    out.push('"');
                } else {
                    out.push(c);
                }
            }
            Some(open) => match c {
                '\\' => match chars.next() {
                    Some('\'') => out.push('\''),
                    Some(escaped) => {
                        out.push('\\');
                        out.push(escaped);
                    }
                    None => out.push('\\'),
                },
                c if c == open => {
                    quote = None;
                    out.push('"');
                }
                '"' => out.push_str("\\\""),
                _ => out.push(c),
            },
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bool_spellings() {
        for raw in ["true", "TRUE", "1", "yes", "on", " y "] {
            assert_eq!(scalar(raw, ScalarKind::Bool), Ok(Some(json!(true))), "{raw}");
        }
        for raw in ["false", "0", "No", "off", "n"] {
            assert_eq!(scalar(raw, ScalarKind::Bool), Ok(Some(json!(false))), "{raw}");
        }
        assert!(scalar("maybe", ScalarKind::Bool).is_err());
    }

    #[test]
    fn test_numbers() {
        assert_eq!(scalar(" -42 ", ScalarKind::Int), Ok(Some(json!(-42))));
        assert_eq!(scalar("7", ScalarKind::UInt), Ok(Some(json!(7))));
        assert!(scalar("-7", ScalarKind::UInt).is_err());
        assert_eq!(scalar("1.5", ScalarKind::Float), Ok(Some(json!(1.5))));
        assert!(scalar("NaN", ScalarKind::Float).is_err());
        assert!(scalar("abc", ScalarKind::Int).is_err());
    }

    #[test]
    fn test_blank_non_string_is_unset() {
        assert_eq!(scalar("  ", ScalarKind::Int), Ok(None));
        assert_eq!(scalar("", ScalarKind::String), Ok(Some(json!(""))));
    }

    #[test]
    fn test_strings_are_not_trimmed() {
        assert_eq!(scalar(" padded ", ScalarKind::String), Ok(Some(json!(" padded "))));
        assert_eq!(scalar(" Fast ", ScalarKind::Enum), Ok(Some(json!("Fast"))));
    }

    #[test]
    fn test_duration() {
        assert_eq!(
            scalar("1m 30s", ScalarKind::Duration),
            Ok(Some(json!({"secs": 90, "nanos": 0})))
        );
        assert!(scalar("soon", ScalarKind::Duration).is_err());
    }

    #[test]
    fn test_timestamp() {
        let value = scalar("1970-01-01T00:01:00Z", ScalarKind::Timestamp).unwrap().unwrap();
        assert_eq!(value["secs_since_epoch"], json!(60));
    }

    #[test]
    fn test_sequence_preserves_order_and_trims() {
        assert_eq!(sequence("2, 1", ScalarKind::Int), Ok(json!([2, 1])));
        assert_eq!(sequence(" a ,b,, c", ScalarKind::String), Ok(json!(["a", "b", "c"])));
        assert_eq!(sequence("", ScalarKind::Int), Ok(json!([])));
    }

    #[test]
    fn test_sequence_reports_bad_element() {
        let err = sequence("1, x", ScalarKind::Int).unwrap_err();
        assert!(err.starts_with("element 1"), "{err}");
    }

    #[test]
    fn test_relaxed_json() {
        assert_eq!(
            parse_relaxed("{'name':'fjay','age':1}").unwrap(),
            json!({"name": "fjay", "age": 1})
        );
        assert_eq!(
            parse_relaxed(r#"{'quote':'say "hi"','it':'it\'s'}"#).unwrap(),
            json!({"quote": "say \"hi\"", "it": "it's"})
        );
        assert_eq!(parse_relaxed(r#"{"strict":[1,2]}"#).unwrap(), json!({"strict": [1, 2]}));
        assert!(parse_relaxed("{'open':").is_err());
    }
}
