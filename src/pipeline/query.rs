//! Query string parsing with scalar coercion.
//!
//! - `true` / `false` become booleans
//! - finite numeric literals become numbers
//! - comma-separated values become arrays, each element coerced
//! - repeated keys accumulate into one array
//! - anything else stays a string

use serde_json::{Map, Number, Value};

/// Parse a raw query string (with or without the leading `?`) into an object.
pub fn parse_query(raw: Option<&str>) -> Value {
    let mut map = Map::new();
    let raw = match raw.map(|q| q.strip_prefix('?').unwrap_or(q)) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Value::Object(map),
    };

    // form-urlencoded parsing cannot fail for string pairs.
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw).unwrap_or_default();

    for (key, raw_value) in pairs {
        let value = coerce(&raw_value);
        match map.remove(&key) {
            Some(existing) => {
                let mut items = into_items(existing);
                items.extend(into_items(value));
                map.insert(key, Value::Array(items));
            }
            None => {
                map.insert(key, value);
            }
        }
    }

    Value::Object(map)
}

fn into_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        other => vec![other],
    }
}

fn coerce(raw: &str) -> Value {
    if raw.contains(',') {
        Value::Array(raw.split(',').map(coerce_scalar).collect())
    } else {
        coerce_scalar(raw)
    }
}

fn coerce_scalar(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "" => return Value::String(String::new()),
        _ => {}
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::Number(int.into());
    }
    if looks_numeric(raw) {
        if let Some(number) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(number);
        }
    }
    Value::String(raw.to_string())
}

/// Rejects spellings `f64::from_str` accepts but that are not numbers in a
/// query string (`inf`, `NaN`, `infinity`).
fn looks_numeric(raw: &str) -> bool {
    raw.chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_strings() {
        assert_eq!(parse_query(Some("name=World")), json!({"name": "World"}));
        assert_eq!(parse_query(Some("?name=Daelrin")), json!({"name": "Daelrin"}));
        assert_eq!(parse_query(Some("greeting=hello%20there")), json!({"greeting": "hello there"}));
    }

    #[test]
    fn test_empty_query() {
        assert_eq!(parse_query(None), json!({}));
        assert_eq!(parse_query(Some("")), json!({}));
        assert_eq!(parse_query(Some("?")), json!({}));
    }

    #[test]
    fn test_scalar_coercion() {
        assert_eq!(
            parse_query(Some("a=true&b=false&c=42&d=-1.5&e=007&f=inf&g=NaN&h=")),
            json!({"a": true, "b": false, "c": 42, "d": -1.5, "e": 7, "f": "inf", "g": "NaN", "h": ""})
        );
    }

    #[test]
    fn test_comma_lists_and_repeated_keys() {
        assert_eq!(parse_query(Some("ids=1,2,3")), json!({"ids": [1, 2, 3]}));
        assert_eq!(parse_query(Some("tag=a&tag=b")), json!({"tag": ["a", "b"]}));
        assert_eq!(parse_query(Some("tag=a,b&tag=c")), json!({"tag": ["a", "b", "c"]}));
        assert_eq!(parse_query(Some("flags=true,x")), json!({"flags": [true, "x"]}));
    }
}
