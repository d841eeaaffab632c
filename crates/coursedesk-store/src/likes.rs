//! Set-membership toggles (reply likes).
//!
//! The decision to add or remove is taken from the viewer's current
//! snapshot, but the write itself is an array delta applied by the store, so
//! two viewers toggling at once never overwrite each other's membership.

use serde_json::Value;

use coursedesk_shared::types::UserUid;

use crate::patch::FieldPatch;

/// Which way a toggle went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Added,
    Removed,
}

/// Pure toggle over a membership list: remove `actor` if present, else add it.
///
/// `toggle(&toggle(s, a), a) == s` for any `s` holding `a` at most once.
pub fn toggle(members: &[String], actor: &str) -> Vec<String> {
    if members.iter().any(|m| m == actor) {
        members.iter().filter(|m| *m != actor).cloned().collect()
    } else {
        let mut out = members.to_vec();
        out.push(actor.to_string());
        out
    }
}

/// The atomic patch that toggles `actor` in `field`, given the membership the
/// caller currently sees.
pub fn toggle_patch(field: &str, members: &[String], actor: &UserUid) -> (FieldPatch, Toggle) {
    let value = Value::String(actor.as_str().to_string());
    if members.iter().any(|m| m == actor.as_str()) {
        (FieldPatch::new().array_remove(field, vec![value]), Toggle::Removed)
    } else {
        (FieldPatch::new().array_union(field, vec![value]), Toggle::Added)
    }
}
