//! Field-level document patches.
//!
//! A [`FieldPatch`] names only the fields it touches; everything else in the
//! stored document is left as is. Array deltas are applied against the value
//! held by the store at write time, not against a cached copy.

use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::models::Fields;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    Set(Value),
    Delete,
    /// Replaced by the store clock when the patch is applied.
    ServerTimestamp,
    /// Append each element not already present.
    ArrayUnion(Vec<Value>),
    /// Remove every occurrence of each element.
    ArrayRemove(Vec<Value>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldPatch {
    ops: Vec<(String, FieldOp)>,
}

impl FieldPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.ops.push((field.to_string(), FieldOp::Set(value.into())));
        self
    }

    pub fn delete(mut self, field: &str) -> Self {
        self.ops.push((field.to_string(), FieldOp::Delete));
        self
    }

    pub fn server_timestamp(mut self, field: &str) -> Self {
        self.ops.push((field.to_string(), FieldOp::ServerTimestamp));
        self
    }

    pub fn array_union(mut self, field: &str, values: Vec<Value>) -> Self {
        self.ops.push((field.to_string(), FieldOp::ArrayUnion(values)));
        self
    }

    pub fn array_remove(mut self, field: &str, values: Vec<Value>) -> Self {
        self.ops.push((field.to_string(), FieldOp::ArrayRemove(values)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[(String, FieldOp)] {
        &self.ops
    }

    /// Apply every operation to `target` in order. `now` is the store clock
    /// rendering used for [`FieldOp::ServerTimestamp`].
    ///
    /// Either all operations apply or `target` is left untouched.
    pub fn apply(&self, target: &mut Fields, now: &str) -> Result<()> {
        let mut staged = target.clone();

        for (field, op) in &self.ops {
            match op {
                FieldOp::Set(value) => {
                    staged.insert(field.clone(), value.clone());
                }
                FieldOp::Delete => {
                    staged.remove(field);
                }
                FieldOp::ServerTimestamp => {
                    staged.insert(field.clone(), Value::String(now.to_string()));
                }
                FieldOp::ArrayUnion(values) => {
                    let items = array_slot(&mut staged, field)?;
                    for value in values {
                        if !items.contains(value) {
                            items.push(value.clone());
                        }
                    }
                }
                FieldOp::ArrayRemove(values) => {
                    let items = array_slot(&mut staged, field)?;
                    items.retain(|item| !values.contains(item));
                }
            }
        }

        *target = staged;
        Ok(())
    }
}

/// The array held in `field`, created empty when missing or null.
fn array_slot<'a>(fields: &'a mut Fields, field: &str) -> Result<&'a mut Vec<Value>> {
    let slot = fields
        .entry(field.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if slot.is_null() {
        *slot = Value::Array(Vec::new());
    }
    match slot {
        Value::Array(items) => Ok(items),
        _ => Err(StoreError::Patch(format!(
            "field `{field}` is not an array"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fields;
    use serde_json::json;

    #[test]
    fn set_touches_only_named_fields() {
        let mut doc = fields([("message", json!("q")), ("solved", json!(false))]);
        FieldPatch::new()
            .set("solved", true)
            .apply(&mut doc, "now")
            .unwrap();
        assert_eq!(doc["message"], json!("q"));
        assert_eq!(doc["solved"], json!(true));
    }

    #[test]
    fn array_union_and_remove_are_set_deltas() {
        let mut doc = fields([("likes", json!(["a"]))]);
        FieldPatch::new()
            .array_union("likes", vec![json!("a"), json!("b")])
            .apply(&mut doc, "now")
            .unwrap();
        assert_eq!(doc["likes"], json!(["a", "b"]));

        FieldPatch::new()
            .array_remove("likes", vec![json!("a")])
            .apply(&mut doc, "now")
            .unwrap();
        assert_eq!(doc["likes"], json!(["b"]));
    }

    #[test]
    fn union_on_missing_field_creates_array() {
        let mut doc = Fields::new();
        FieldPatch::new()
            .array_union("likes", vec![json!("u")])
            .server_timestamp("timestamp")
            .apply(&mut doc, "2024-01-01T00:00:00.000000Z")
            .unwrap();
        assert_eq!(doc["likes"], json!(["u"]));
        assert_eq!(doc["timestamp"], json!("2024-01-01T00:00:00.000000Z"));
    }

    #[test]
    fn failed_patch_leaves_document_untouched() {
        let mut doc = fields([("likes", json!("oops")), ("solved", json!(false))]);
        let result = FieldPatch::new()
            .set("solved", true)
            .array_union("likes", vec![json!("u")])
            .apply(&mut doc, "now");
        assert!(result.is_err());
        assert_eq!(doc["solved"], json!(false));
    }
}
