//! PII redaction for query result rows.

use serde_json::{Map, Value};

/// Column name to value, in the column order the warehouse returned.
pub type RowMapping = Map<String, Value>;

/// Replacement written over PII values.
pub const MASK_TOKEN: &str = "****";

/// Column names always treated as personally identifying.
pub const PII_FIELDS: [&str; 9] = [
    "user_id",
    "user_email",
    "client_id",
    "user_pseudo_id",
    "device_id",
    "first_name",
    "last_name",
    "phone_number",
    "ip_address",
];

pub fn is_pii_field(name: &str) -> bool {
    PII_FIELDS.contains(&name)
}

/// Truthiness of a result value: null, `false`, zero, `""` and empty
/// arrays/objects are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Mask PII values in place. Returns the number of values replaced.
///
/// Keys are never added or removed; falsy PII values are left untouched.
pub fn mask_row(row: &mut RowMapping) -> usize {
    let mut masked = 0;
    for field in PII_FIELDS {
        if let Some(value) = row.get_mut(field) {
            if is_truthy(value) {
                *value = Value::String(MASK_TOKEN.to_string());
                masked += 1;
            }
        }
    }
    masked
}

/// Mask every row, returning the total number of values replaced.
pub fn mask_rows(rows: &mut [RowMapping]) -> usize {
    rows.iter_mut().map(mask_row).sum()
}
