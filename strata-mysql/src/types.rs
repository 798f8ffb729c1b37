//! Conversion between JSON values and MySQL values.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use mysql_async::consts::ColumnType;
use mysql_async::{Params, Value};
use serde_json::Value as JsonValue;

/// Convert a JSON argument to a MySQL value.
///
/// Arrays and objects are sent as their JSON text.
pub fn json_to_mysql(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::NULL,
        JsonValue::Bool(b) => Value::from(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(u) = n.as_u64() {
                Value::UInt(u)
            } else {
                n.as_f64().map(Value::Double).unwrap_or(Value::NULL)
            }
        }
        JsonValue::String(s) => Value::from(s.as_str()),
        JsonValue::Array(_) | JsonValue::Object(_) => Value::from(value.to_string()),
    }
}

/// Positional parameters for a statement, or none.
pub fn to_params(args: &[JsonValue]) -> Params {
    if args.is_empty() {
        Params::Empty
    } else {
        Params::Positional(args.iter().map(json_to_mysql).collect())
    }
}

/// Convert a MySQL value to a JSON value, guided by its column type.
///
/// The text protocol (queries without args) sends every value as bytes; the
/// column type decides how they are read back, so both protocols agree:
/// - numeric columns become JSON numbers, `DECIMAL` stays a string
/// - `JSON` columns are parsed
/// - temporal columns are rendered as MySQL prints them, with `decimals`
///   fractional digits
/// - other UTF-8 text is a string, other bytes are base64-encoded
pub fn from_mysql_value(value: Value, column_type: ColumnType, decimals: u8) -> JsonValue {
    match value {
        Value::NULL => JsonValue::Null,
        Value::Bytes(bytes) => from_bytes(bytes, column_type),
        Value::Int(i) => JsonValue::Number(i.into()),
        Value::UInt(u) => JsonValue::Number(u.into()),
        Value::Float(f) => float(f64::from(f)),
        Value::Double(d) => float(d),
        Value::Date(year, month, day, hour, minute, second, micro) => {
            let date = format!("{:04}-{:02}-{:02}", year, month, day);
            if column_type == ColumnType::MYSQL_TYPE_DATE {
                return JsonValue::String(date);
            }
            JsonValue::String(format!(
                "{} {:02}:{:02}:{:02}{}",
                date,
                hour,
                minute,
                second,
                fraction(micro, decimals)
            ))
        }
        Value::Time(is_neg, days, hours, minutes, seconds, micro) => {
            let sign = if is_neg { "-" } else { "" };
            JsonValue::String(format!(
                "{}{:02}:{:02}:{:02}{}",
                sign,
                days * 24 + u32::from(hours),
                minutes,
                seconds,
                fraction(micro, decimals)
            ))
        }
    }
}

fn from_bytes(bytes: Vec<u8>, column_type: ColumnType) -> JsonValue {
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => return JsonValue::String(STANDARD.encode(e.into_bytes())),
    };

    match column_type {
        ColumnType::MYSQL_TYPE_TINY
        | ColumnType::MYSQL_TYPE_SHORT
        | ColumnType::MYSQL_TYPE_INT24
        | ColumnType::MYSQL_TYPE_LONG
        | ColumnType::MYSQL_TYPE_LONGLONG
        | ColumnType::MYSQL_TYPE_YEAR
        | ColumnType::MYSQL_TYPE_FLOAT
        | ColumnType::MYSQL_TYPE_DOUBLE => match serde_json::from_str(&text) {
            Ok(number @ JsonValue::Number(_)) => number,
            _ => JsonValue::String(text),
        },
        ColumnType::MYSQL_TYPE_JSON => {
            serde_json::from_str(&text).unwrap_or(JsonValue::String(text))
        }
        _ => JsonValue::String(text),
    }
}

fn float(value: f64) -> JsonValue {
    serde_json::Number::from_f64(value)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

fn fraction(micro: u32, decimals: u8) -> String {
    let digits = usize::from(decimals.min(6));
    if digits == 0 {
        return String::new();
    }
    let full = format!("{:06}", micro);
    format!(".{}", &full[..digits])
}
