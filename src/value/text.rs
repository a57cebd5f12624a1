//! Text adapter: `serde_json` does the tokenizing, this module maps its
//! output onto the tagged tree and prints trees back out.
use std::str::FromStr;

use bigdecimal::BigDecimal;
use ordered_float::OrderedFloat;
use serde::de::Error as _;

use super::{JsonObject, JsonValue};

// -------------------------------- Parsing --------------------------------- //

/// Parse JSON text into a tagged tree.
pub fn parse(src: &str) -> Result<JsonValue, serde_json::Error> {
    let raw: serde_json::Value = serde_json::from_str(src)?;
    from_serde(raw)
}

pub fn parse_slice(bytes: &[u8]) -> Result<JsonValue, serde_json::Error> {
    let raw: serde_json::Value = serde_json::from_slice(bytes)?;
    from_serde(raw)
}

/// Convert a `serde_json` tree. Integers take the narrowest of int/long that
/// fits (falling back to decimal); anything with a fraction or exponent is a
/// decimal.
pub fn from_serde(raw: serde_json::Value) -> Result<JsonValue, serde_json::Error> {
    Ok(match raw {
        serde_json::Value::Null => JsonValue::Null,
        serde_json::Value::Bool(b) => JsonValue::Bool(b),
        serde_json::Value::Number(n) => number(&n.to_string())?,
        serde_json::Value::String(s) => JsonValue::String(s),
        serde_json::Value::Array(items) => {
            JsonValue::Array(items.into_iter().map(from_serde).collect::<Result<_, _>>()?)
        }
        serde_json::Value::Object(map) => {
            let mut object = JsonObject::with_capacity(map.len());
            for (k, v) in map {
                object.insert(k, from_serde(v)?);
            }
            JsonValue::Object(object)
        }
    })
}

fn number(literal: &str) -> Result<JsonValue, serde_json::Error> {
    let integral = !literal.contains(['.', 'e', 'E']);
    if integral {
        if let Ok(i) = literal.parse::<i32>() {
            return Ok(JsonValue::Int(i));
        }
        if let Ok(l) = literal.parse::<i64>() {
            return Ok(JsonValue::Long(l));
        }
    }
    BigDecimal::from_str(literal)
        .map(JsonValue::Decimal)
        .map_err(|e| serde_json::Error::custom(format!("bad number {literal}: {e}")))
}

// -------------------------------- Printing -------------------------------- //

pub fn write_value(out: &mut String, value: &JsonValue) {
    match value {
        JsonValue::Null => out.push_str("null"),
        JsonValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        JsonValue::Int(i) => out.push_str(&i.to_string()),
        JsonValue::Long(l) => out.push_str(&l.to_string()),
        JsonValue::Float(OrderedFloat(f)) => write_float(out, *f),
        JsonValue::Double(OrderedFloat(d)) => write_double(out, *d),
        JsonValue::Decimal(d) => out.push_str(&d.to_plain_string()),
        JsonValue::String(s) => write_string(out, s),
        JsonValue::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        JsonValue::Object(map) => {
            out.push('{');
            for (i, (k, v)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, k);
                out.push(':');
                write_value(out, v);
            }
            out.push('}');
        }
    }
}

/// Quoted, escaped string literal.
pub fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        escape_char(out, c);
    }
    out.push('"');
}

fn escape_char(out: &mut String, c: char) {
    match c {
        '"' => out.push_str("\\\""),
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\t' => out.push_str("\\t"),
        '\r' => out.push_str("\\r"),
        '\u{08}' => out.push_str("\\b"),
        '\u{0C}' => out.push_str("\\f"),
        ' '..='~' => out.push(c),
        _ => {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04X}", unit));
            }
        }
    }
}

/// Floating output always carries a fraction so it reads back as non-integral.
pub fn write_double(out: &mut String, d: f64) {
    if !d.is_finite() {
        out.push_str("null");
        return;
    }
    let s = d.to_string();
    out.push_str(&s);
    if !s.contains('.') {
        out.push_str(".0");
    }
}

pub fn write_float(out: &mut String, f: f32) {
    if !f.is_finite() {
        out.push_str("null");
        return;
    }
    let s = f.to_string();
    out.push_str(&s);
    if !s.contains('.') {
        out.push_str(".0");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_take_narrowest_tag() {
        let v = parse(r#"[1, 3000000000, 123456789012345678901234, 1.5, 2e3]"#).unwrap();
        let items = v.as_array().unwrap();
        assert_eq!(items[0], JsonValue::Int(1));
        assert_eq!(items[1], JsonValue::Long(3_000_000_000));
        assert!(matches!(items[2], JsonValue::Decimal(_)));
        assert_eq!(items[3], JsonValue::Decimal(BigDecimal::from_str("1.5").unwrap()));
        assert!(matches!(items[4], JsonValue::Decimal(_)));
    }

    #[test]
    fn object_order_survives_parse() {
        let v = parse(r#"{"z":1,"a":2,"m":3}"#).unwrap();
        let keys: Vec<_> = v.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["z", "a", "m"]);
        assert_eq!(v.to_json_string(), r#"{"z":1,"a":2,"m":3}"#);
    }

    #[test]
    fn escapes() {
        let mut out = String::new();
        write_string(&mut out, "a\u{2014}c");
        assert_eq!(out, "\"a\\u2014c\"");

        out.clear();
        write_string(&mut out, "q\"b\\n\nt\tx\u{1}");
        assert_eq!(out, "\"q\\\"b\\\\n\\nt\\tx\\u0001\"");

        out.clear();
        write_string(&mut out, "\u{1F600}");
        assert_eq!(out, "\"\\uD83D\\uDE00\"");
    }

    #[test]
    fn floating_output() {
        let mut out = String::new();
        write_double(&mut out, 1.0);
        assert_eq!(out, "1.0");
        out.clear();
        write_double(&mut out, 0.25);
        assert_eq!(out, "0.25");
        out.clear();
        write_float(&mut out, f32::NAN);
        assert_eq!(out, "null");
    }

    #[test]
    fn decimals_print_without_exponent() {
        assert_eq!(parse("1.5E+20").unwrap().to_json_string(), "150000000000000000000");
        assert_eq!(parse("0.0000001").unwrap().to_json_string(), "0.0000001");
        assert_eq!(parse("[2.50]").unwrap().to_json_string(), "[2.50]");
    }

    #[test]
    fn syntax_errors_surface() {
        assert!(parse("{\"a\":").is_err());
    }
}
