//! Documents mirrored from the live document store.
//!
//! Field values are plain JSON. Store-assigned timestamps are written as
//! fixed-width RFC 3339 strings in UTC, so comparing them as strings orders
//! them chronologically.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use coursedesk_shared::types::DocumentId;

use crate::error::{Result, StoreError};

/// The field map of a document.
pub type Fields = Map<String, Value>;

/// A document as currently held by the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: DocumentId, fields: Fields) -> Self {
        Self { id, fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// A string field, or `None` if missing or null.
    pub fn str_field(&self, field: &str) -> Result<Option<&str>> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(StoreError::Shape {
                field: field.to_string(),
                expected: "string",
            }),
        }
    }

    /// A string field that must be present.
    pub fn required_str(&self, field: &str) -> Result<&str> {
        self.str_field(field)?.ok_or_else(|| StoreError::Shape {
            field: field.to_string(),
            expected: "string",
        })
    }

    pub fn bool_field(&self, field: &str) -> Result<Option<bool>> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(StoreError::Shape {
                field: field.to_string(),
                expected: "bool",
            }),
        }
    }

    /// An array of strings; missing or null reads as empty.
    pub fn string_list(&self, field: &str) -> Result<Vec<String>> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| {
                    v.as_str().map(str::to_string).ok_or_else(|| StoreError::Shape {
                        field: field.to_string(),
                        expected: "string array",
                    })
                })
                .collect(),
            Some(_) => Err(StoreError::Shape {
                field: field.to_string(),
                expected: "string array",
            }),
        }
    }

    pub fn timestamp_field(&self, field: &str) -> Result<Option<DateTime<Utc>>> {
        match self.str_field(field)? {
            None => Ok(None),
            Some(raw) => parse_timestamp(raw).map(Some).ok_or_else(|| StoreError::Shape {
                field: field.to_string(),
                expected: "timestamp",
            }),
        }
    }
}

/// Render a timestamp the way the store writes it.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Build a field map from `(name, value)` pairs.
pub fn fields<I, K, V>(pairs: I) -> Fields
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn formatted_timestamps_sort_chronologically() {
        let a = Utc.with_ymd_and_hms(2024, 1, 9, 23, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 1, 10, 1, 0, 0).unwrap();
        assert!(format_timestamp(a) < format_timestamp(b));
        assert_eq!(parse_timestamp(&format_timestamp(a)), Some(a));
    }

    #[test]
    fn typed_accessors_report_shape_errors() {
        let doc = Document::new(
            "d1".into(),
            fields([("message", json!("hi")), ("likes", json!(["u1", 3]))]),
        );
        assert_eq!(doc.required_str("message").unwrap(), "hi");
        assert_eq!(doc.bool_field("solved").unwrap(), None);
        assert!(matches!(
            doc.string_list("likes"),
            Err(StoreError::Shape { .. })
        ));
        assert!(doc.required_str("missing").is_err());
    }
}
