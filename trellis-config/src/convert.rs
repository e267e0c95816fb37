//! Lenient conversions for configuration values.
//!
//! Values read from the environment or `.env` files are always strings, so the
//! typed getters accept `"8"` where they expect a number and `"yes"` where they
//! expect a boolean.

use serde_json::{Number, Value};

pub fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        Value::String(s) => parse_bool(s),
        _ => None,
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

pub fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

pub fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

pub fn to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Replace string leaves that read as booleans or numbers with those values
pub fn coerce_scalars(value: Value) -> Value {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(b) = trimmed.parse::<bool>() {
                Value::Bool(b)
            } else if let Ok(i) = trimmed.parse::<i64>() {
                Value::Number(i.into())
            } else if let Some(n) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
                Value::Number(n)
            } else {
                Value::String(s)
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(coerce_scalars).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, coerce_scalars(v)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bool_coercion() {
        assert_eq!(to_bool(&json!(true)), Some(true));
        assert_eq!(to_bool(&json!("Yes")), Some(true));
        assert_eq!(to_bool(&json!("off")), Some(false));
        assert_eq!(to_bool(&json!(0)), Some(false));
        assert_eq!(to_bool(&json!("maybe")), None);
        assert_eq!(to_bool(&json!(null)), None);
    }

    #[test]
    fn test_number_coercion() {
        assert_eq!(to_i64(&json!(" 42 ")), Some(42));
        assert_eq!(to_i64(&json!(2.9)), Some(2));
        assert_eq!(to_i64(&json!("x")), None);
        assert_eq!(to_f64(&json!("1.5")), Some(1.5));
        assert_eq!(to_f64(&json!(true)), Some(1.0));
    }

    #[test]
    fn test_string_coercion() {
        assert_eq!(to_string(&json!(7)), Some("7".to_string()));
        assert_eq!(to_string(&json!(null)), None);
        assert_eq!(to_string(&json!(["a"])), Some(r#"["a"]"#.to_string()));
    }

    #[test]
    fn test_coerce_scalars() {
        let value = coerce_scalars(json!({ "n": "8", "b": "false", "s": "name", "f": "0.5" }));
        assert_eq!(value, json!({ "n": 8, "b": false, "s": "name", "f": 0.5 }));
    }
}
