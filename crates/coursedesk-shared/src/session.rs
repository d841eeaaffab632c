//! Explicit session context.
//!
//! A [`Session`] is created once the authentication provider has accepted the
//! instructor and the backend has resolved their record. It is handed to every
//! controller that needs to know who is acting; nothing reads it from ambient
//! storage.

use serde::{Deserialize, Serialize};

use crate::types::{InstructorId, UserUid};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Backend id of the instructor (`insId`).
    pub instructor_id: InstructorId,
    /// Auth-provider uid of the instructor (`insUID`). Identifies them in the
    /// document store.
    pub instructor_uid: UserUid,
    pub display_name: String,
    pub email: String,
}

impl Session {
    pub fn new(
        instructor_id: InstructorId,
        instructor_uid: UserUid,
        display_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        let session = Self {
            instructor_id,
            instructor_uid,
            display_name: display_name.into(),
            email: email.into(),
        };
        tracing::info!(
            instructor = %session.instructor_id,
            uid = %session.instructor_uid,
            "session started"
        );
        session
    }

    /// Consume the session on logout.
    pub fn end(self) {
        tracing::info!(instructor = %self.instructor_id, "session ended");
    }
}
