//! Tolerant decoding of upstream records. Missing, `null` or wrongly typed fields
//! fall back to defaults; only a missing identifier rejects a record.

use chrono::DateTime;
use serde_json::{Map, Value};

/// A JSON object whose fields are consumed as they are read. Whatever is left over
/// is kept as the record's unmodelled fields.
pub(crate) struct WireRecord(Map<String, Value>);

impl WireRecord {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Removes every name in `names` and returns the first non-null value among them.
    fn take(&mut self, names: &[&str]) -> Option<Value> {
        let mut found = None;
        for name in names {
            if let Some(value) = self.0.remove(*name) {
                if found.is_none() && !value.is_null() {
                    found = Some(value);
                }
            }
        }
        found
    }

    /// Identifier sent as a string or a number.
    pub fn id(&mut self, names: &[&str]) -> Option<String> {
        match self.take(names)? {
            Value::String(s) if !s.is_empty() => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Free text. Anything but a string becomes empty.
    pub fn text(&mut self, names: &[&str]) -> String {
        match self.take(names) {
            Some(Value::String(s)) => s,
            _ => String::new(),
        }
    }

    /// Categorical value. Anything but a non-empty string is absent and later encoded
    /// as "unknown".
    pub fn category(&mut self, names: &[&str]) -> Option<String> {
        match self.take(names)? {
            Value::String(s) if !s.trim().is_empty() => Some(s),
            _ => None,
        }
    }

    /// Number sent as a JSON number or a numeric string.
    pub fn number_opt(&mut self, names: &[&str]) -> Option<f64> {
        let value = match self.take(names)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        value.filter(|v| v.is_finite())
    }

    pub fn number(&mut self, names: &[&str]) -> f64 {
        self.number_opt(names).unwrap_or(0.0)
    }

    /// Epoch seconds from a number, a numeric string or an RFC 3339 string.
    pub fn timestamp(&mut self, names: &[&str]) -> f64 {
        match self.take(names) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.timestamp() as f64)
                .or_else(|_| s.trim().parse::<f64>())
                .unwrap_or(0.0),
            _ => 0.0,
        }
    }

    /// List of strings; non-string entries are dropped, anything but an array is empty.
    pub fn string_list(&mut self, names: &[&str]) -> Vec<String> {
        match self.take(names) {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn into_rest(self) -> Map<String, Value> {
        self.0
    }
}
