//! Decoding of BigQuery's `{"f": [{"v": ...}]}` row encoding into JSON objects.
//!
//! The engine sends every scalar as a string. Values are converted according
//! to the declared column type:
//!
//! | Type | JSON |
//! |---|---|
//! | INTEGER / INT64 | number |
//! | FLOAT / FLOAT64 | number (`NaN`, `Infinity`, `-Infinity` stay strings) |
//! | BOOLEAN / BOOL | bool |
//! | TIMESTAMP | RFC 3339, UTC, microseconds |
//! | RECORD / STRUCT | object |
//! | anything else | string as sent |
//!
//! `REPEATED` columns become arrays of the element type.

use crate::error::{GcpError, Result};
use crate::types::{TableFieldSchema, TableRow, TableSchema};
use bigdummy_analytics_core::RowMapping;
use chrono::{DateTime, SecondsFormat};
use serde_json::{Map, Number, Value};

/// Decode every row against the result schema, preserving row and column order.
pub fn decode_rows(schema: &TableSchema, rows: Vec<TableRow>) -> Result<Vec<RowMapping>> {
    rows.into_iter()
        .map(|row| decode_row(&schema.fields, row.f.into_iter().map(|cell| cell.v)))
        .collect()
}

fn decode_row(
    fields: &[TableFieldSchema],
    cells: impl Iterator<Item = Value>,
) -> Result<RowMapping> {
    let mut mapping = Map::with_capacity(fields.len());
    let mut cells = cells;
    for field in fields {
        let raw = cells.next().unwrap_or(Value::Null);
        mapping.insert(field.name.clone(), decode_field(field, raw)?);
    }
    Ok(mapping)
}

fn decode_field(field: &TableFieldSchema, raw: Value) -> Result<Value> {
    if raw.is_null() {
        return Ok(Value::Null);
    }

    if field.is_repeated() {
        let Value::Array(items) = raw else {
            return Err(invalid(field, "expected an array for a REPEATED column"));
        };
        return items
            .into_iter()
            .map(|item| decode_scalar(field, unwrap_cell(item)))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array);
    }

    decode_scalar(field, raw)
}

/// Repeated elements and record members arrive wrapped as `{"v": x}`.
fn unwrap_cell(item: Value) -> Value {
    match item {
        Value::Object(mut obj) if obj.len() == 1 && obj.contains_key("v") => {
            obj.remove("v").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn decode_scalar(field: &TableFieldSchema, raw: Value) -> Result<Value> {
    if raw.is_null() {
        return Ok(Value::Null);
    }

    if field.is_record() {
        let Value::Object(mut obj) = raw else {
            return Err(invalid(field, "expected an object for a RECORD column"));
        };
        let cells = match obj.remove("f") {
            Some(Value::Array(cells)) => cells,
            _ => return Err(invalid(field, "RECORD value has no \"f\" array")),
        };
        let nested = decode_row(&field.fields, cells.into_iter().map(unwrap_cell))?;
        return Ok(Value::Object(nested));
    }

    let text = match raw {
        Value::String(s) => s,
        Value::Bool(b) => return Ok(Value::Bool(b)),
        Value::Number(n) => n.to_string(),
        other => return Ok(other),
    };

    match field.field_type.to_ascii_uppercase().as_str() {
        "INTEGER" | "INT64" => text
            .parse::<i64>()
            .map(|n| Value::Number(n.into()))
            .map_err(|_| invalid(field, &format!("not an integer: {}", text))),
        "FLOAT" | "FLOAT64" => {
            let parsed = text
                .parse::<f64>()
                .map_err(|_| invalid(field, &format!("not a float: {}", text)))?;
            Ok(Number::from_f64(parsed)
                .map(Value::Number)
                .unwrap_or(Value::String(text)))
        }
        "BOOLEAN" | "BOOL" => match text.to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(invalid(field, &format!("not a boolean: {}", text))),
        },
        "TIMESTAMP" => decode_timestamp(&text)
            .map(Value::String)
            .ok_or_else(|| invalid(field, &format!("not a timestamp: {}", text))),
        _ => Ok(Value::String(text)),
    }
}

/// Accepts integer microseconds, or float seconds as sent without
/// `useInt64Timestamp`.
fn decode_timestamp(text: &str) -> Option<String> {
    let micros = match text.parse::<i64>() {
        Ok(micros) => micros,
        Err(_) => {
            let seconds = text.parse::<f64>().ok()?;
            if !seconds.is_finite() {
                return None;
            }
            (seconds * 1_000_000.0).round() as i64
        }
    };

    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    DateTime::from_timestamp(secs, nanos).map(|ts| ts.to_rfc3339_opts(SecondsFormat::Micros, true))
}

fn invalid(field: &TableFieldSchema, detail: &str) -> GcpError {
    GcpError::InvalidResponse(format!("column '{}': {}", field.name, detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(fields: Value) -> TableSchema {
        serde_json::from_value(json!({ "fields": fields })).unwrap()
    }

    fn rows(rows: Value) -> Vec<TableRow> {
        serde_json::from_value(rows).unwrap()
    }

    #[test]
    fn test_scalar_types() {
        let schema = schema(json!([
            {"name": "event_name", "type": "STRING"},
            {"name": "event_count", "type": "INTEGER"},
            {"name": "revenue", "type": "FLOAT"},
            {"name": "is_active", "type": "BOOLEAN"},
            {"name": "event_date", "type": "DATE"},
            {"name": "price", "type": "NUMERIC"}
        ]));
        let decoded = decode_rows(
            &schema,
            rows(json!([{"f": [
                {"v": "page_view"},
                {"v": "1523"},
                {"v": "12.5"},
                {"v": "true"},
                {"v": "2024-01-15"},
                {"v": "19.99"}
            ]}])),
        )
        .unwrap();

        assert_eq!(
            Value::Object(decoded[0].clone()),
            json!({
                "event_name": "page_view",
                "event_count": 1523,
                "revenue": 12.5,
                "is_active": true,
                "event_date": "2024-01-15",
                "price": "19.99"
            })
        );
    }

    #[test]
    fn test_column_order_preserved() {
        let schema = schema(json!([
            {"name": "z", "type": "STRING"},
            {"name": "a", "type": "STRING"}
        ]));
        let decoded = decode_rows(&schema, rows(json!([{"f": [{"v": "1"}, {"v": "2"}]}]))).unwrap();
        let keys: Vec<&String> = decoded[0].keys().collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn test_nulls_stay_null() {
        let schema = schema(json!([
            {"name": "user_id", "type": "STRING"},
            {"name": "n", "type": "INTEGER"}
        ]));
        let decoded =
            decode_rows(&schema, rows(json!([{"f": [{"v": null}, {"v": null}]}]))).unwrap();
        assert_eq!(decoded[0]["user_id"], Value::Null);
        assert_eq!(decoded[0]["n"], Value::Null);
    }

    #[test]
    fn test_non_finite_floats_stay_strings() {
        let schema = schema(json!([{"name": "ratio", "type": "FLOAT64"}]));
        let decoded = decode_rows(
            &schema,
            rows(json!([{"f": [{"v": "NaN"}]}, {"f": [{"v": "-Infinity"}]}])),
        )
        .unwrap();
        assert_eq!(decoded[0]["ratio"], json!("NaN"));
        assert_eq!(decoded[1]["ratio"], json!("-Infinity"));
    }

    #[test]
    fn test_timestamp_micros() {
        let schema = schema(json!([{"name": "ts", "type": "TIMESTAMP"}]));
        let decoded = decode_rows(
            &schema,
            rows(json!([{"f": [{"v": "1705314600123456"}]}, {"f": [{"v": "1.7053146E9"}]}])),
        )
        .unwrap();
        assert_eq!(decoded[0]["ts"], json!("2024-01-15T10:30:00.123456Z"));
        assert_eq!(decoded[1]["ts"], json!("2024-01-15T10:30:00.000000Z"));
    }

    #[test]
    fn test_record_and_repeated() {
        let schema = schema(json!([
            {"name": "device", "type": "RECORD", "fields": [
                {"name": "category", "type": "STRING"},
                {"name": "is_limited_ad_tracking", "type": "BOOLEAN"}
            ]},
            {"name": "event_params", "type": "RECORD", "mode": "REPEATED", "fields": [
                {"name": "key", "type": "STRING"},
                {"name": "int_value", "type": "INTEGER"}
            ]},
            {"name": "tags", "type": "STRING", "mode": "REPEATED"}
        ]));
        let decoded = decode_rows(
            &schema,
            rows(json!([{"f": [
                {"v": {"f": [{"v": "mobile"}, {"v": "false"}]}},
                {"v": [
                    {"v": {"f": [{"v": "ga_session_id"}, {"v": "17"}]}},
                    {"v": {"f": [{"v": "engaged"}, {"v": null}]}}
                ]},
                {"v": [{"v": "a"}, {"v": "b"}]}
            ]}])),
        )
        .unwrap();

        assert_eq!(
            Value::Object(decoded[0].clone()),
            json!({
                "device": {"category": "mobile", "is_limited_ad_tracking": false},
                "event_params": [
                    {"key": "ga_session_id", "int_value": 17},
                    {"key": "engaged", "int_value": null}
                ],
                "tags": ["a", "b"]
            })
        );
    }

    #[test]
    fn test_bad_integer_is_error() {
        let schema = schema(json!([{"name": "n", "type": "INTEGER"}]));
        let err = decode_rows(&schema, rows(json!([{"f": [{"v": "twelve"}]}]))).unwrap_err();
        assert!(err.to_string().contains("column 'n'"));
    }
}
