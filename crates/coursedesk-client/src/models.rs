//! Records exchanged with the REST backend.
//!
//! Wire names are camelCase. Optional backend fields default instead of
//! failing the whole response.

use serde::{Deserialize, Serialize};

use coursedesk_shared::types::{AnnouncementId, CourseId, InstructorId, StudentId, UserUid};

// ------------------------------------------------------------------
// Courses
// ------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub instructor_entity: Option<Instructor>,
}

// ------------------------------------------------------------------
// Instructors
// ------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instructor {
    pub id: InstructorId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile_link: Option<String>,
    /// Stored file name of the profile image.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, rename = "insUID")]
    pub ins_uid: Option<UserUid>,
}

/// `GET /instructors/details`: the instructor with their courses and students.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructorDetails {
    pub id: InstructorId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, rename = "insUID")]
    pub ins_uid: Option<UserUid>,
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub students: Vec<StudentSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub id: StudentId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub education: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "userUID")]
    pub user_uid: Option<UserUid>,
    #[serde(default)]
    pub instructor_ids: Vec<InstructorId>,
}

/// `profileData` part of a profile update.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: String,
    pub email: String,
    pub bio: String,
    pub profile_link: String,
}

impl From<&Instructor> for ProfileUpdate {
    fn from(ins: &Instructor) -> Self {
        Self {
            name: ins.name.clone(),
            email: ins.email.clone(),
            bio: ins.bio.clone().unwrap_or_default(),
            profile_link: ins.profile_link.clone().unwrap_or_default(),
        }
    }
}

// ------------------------------------------------------------------
// Enrollments
// ------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: StudentId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRef {
    pub id: CourseId,
    #[serde(default)]
    pub title: String,
}

/// One row of `GET /user-course/{email}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub user: UserRef,
    pub course: CourseRef,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub attendance_average: Option<f64>,
    #[serde(default)]
    pub quiz_average: Option<f64>,
}

// ------------------------------------------------------------------
// Announcements
// ------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetType {
    All,
    InstructorStudents,
    /// One student, named by `targetId`. Unknown target types land here too.
    #[serde(other)]
    Student,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: AnnouncementId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub announce_type: String,
    #[serde(default)]
    pub sender_type: Option<String>,
    #[serde(default)]
    pub sender_id: Option<i64>,
    #[serde(default)]
    pub target_type: Option<TargetType>,
    #[serde(default)]
    pub target_id: Option<i64>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Backend display timestamp, `"<date> | <time>"`.
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Body of `POST /api/announcements/send`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnnouncement {
    pub title: String,
    pub message: String,
    pub announce_type: String,
    pub sender_type: String,
    pub sender_id: InstructorId,
    pub target_type: TargetType,
    pub target_id: Option<i64>,
    #[serde(rename = "type")]
    pub kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn enrollment_tolerates_missing_averages() {
        let e: Enrollment = serde_json::from_value(json!({
            "user": {"id": 4, "name": "Ana", "email": "ana@example.org"},
            "course": {"id": 9, "title": "Rust"},
            "progress": 72.5
        }))
        .unwrap();
        assert_eq!(e.course.id, CourseId(9));
        assert_eq!(e.attendance_average, None);
    }

    #[test]
    fn announcement_wire_names() {
        let body = serde_json::to_value(NewAnnouncement {
            title: "Exam".into(),
            message: "Friday".into(),
            announce_type: "Course Update".into(),
            sender_type: "Instructor".into(),
            sender_id: InstructorId(3),
            target_type: TargetType::InstructorStudents,
            target_id: Some(3),
            kind: "course".into(),
        })
        .unwrap();
        assert_eq!(body["targetType"], "INSTRUCTOR_STUDENTS");
        assert_eq!(body["announceType"], "Course Update");
        assert_eq!(body["type"], "course");
        assert_eq!(body["senderId"], 3);
    }

    #[test]
    fn unknown_target_type_reads_as_student() {
        let a: Announcement = serde_json::from_value(json!({
            "id": 2, "title": "t", "message": "m", "announceType": "Event",
            "targetType": "SINGLE_USER", "targetId": 41
        }))
        .unwrap();
        assert_eq!(a.target_type, Some(TargetType::Student));
    }

    #[test]
    fn instructor_uid_field_name() {
        let ins: Instructor = serde_json::from_value(json!({
            "id": 1, "name": "Dr. K", "email": "k@example.org", "insUID": "uid-1"
        }))
        .unwrap();
        assert_eq!(ins.ins_uid, Some(UserUid::new("uid-1")));
    }
}
