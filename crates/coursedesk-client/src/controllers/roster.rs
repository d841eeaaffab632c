//! Student roster: enrollments in the instructor's courses with progress
//! and an at-risk flag.

use std::collections::HashSet;

use futures::future::try_join_all;
use serde::Serialize;
use tracing::info;

use coursedesk_shared::constants::AT_RISK_PROGRESS_THRESHOLD;
use coursedesk_shared::types::{CourseId, StudentId};
use coursedesk_shared::Session;

use super::CourseSelection;
use crate::api::ApiClient;
use crate::error::Result;
use crate::models::{Course, Enrollment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StudentStatus {
    Active,
    #[serde(rename = "At Risk")]
    AtRisk,
}

impl StudentStatus {
    pub fn from_progress(progress: f64) -> Self {
        if progress >= AT_RISK_PROGRESS_THRESHOLD {
            StudentStatus::Active
        } else {
            StudentStatus::AtRisk
        }
    }
}

/// Status tab of the roster screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(StudentStatus),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterRow {
    pub student_id: StudentId,
    pub name: String,
    pub email: String,
    pub course_id: CourseId,
    pub course: String,
    pub progress: f64,
    pub attendance: f64,
    pub quiz: f64,
    pub status: StudentStatus,
}

/// One row per enrollment in one of `courses`. Enrollments in other
/// instructors' courses are dropped.
pub fn build_roster(
    courses: &[Course],
    enrollments: impl IntoIterator<Item = Enrollment>,
) -> Vec<RosterRow> {
    let taught: HashSet<CourseId> = courses.iter().map(|c| c.id).collect();
    enrollments
        .into_iter()
        .filter(|e| taught.contains(&e.course.id))
        .map(|e| RosterRow {
            student_id: e.user.id,
            name: e.user.name,
            email: e.user.email,
            course_id: e.course.id,
            course: e.course.title,
            progress: e.progress,
            attendance: e.attendance_average.unwrap_or(0.0),
            quiz: e.quiz_average.unwrap_or(0.0),
            status: StudentStatus::from_progress(e.progress),
        })
        .collect()
}

/// Rows in `course` with `status`, whose name or email contains `search`
/// (case-insensitive).
pub fn filter_roster<'a>(
    rows: &'a [RosterRow],
    course: CourseSelection,
    status: StatusFilter,
    search: &str,
) -> Vec<&'a RosterRow> {
    let needle = search.to_lowercase();
    rows.iter()
        .filter(|r| course.matches(r.course_id))
        .filter(|r| match status {
            StatusFilter::All => true,
            StatusFilter::Only(s) => r.status == s,
        })
        .filter(|r| {
            r.name.to_lowercase().contains(&needle) || r.email.to_lowercase().contains(&needle)
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct Roster {
    courses: Vec<Course>,
    rows: Vec<RosterRow>,
}

impl Roster {
    /// Fetch courses, students and enrollments of the signed-in instructor.
    pub async fn load(api: &ApiClient, session: &Session) -> Result<Self> {
        let courses = api.instructor_courses(session.instructor_id).await?;
        let emails = api.instructor_students(session.instructor_id).await?;

        let enrollments = try_join_all(emails.iter().map(|email| api.enrollments(email))).await?;
        let rows = build_roster(&courses, enrollments.into_iter().flatten());

        info!(
            instructor = %session.instructor_id,
            courses = courses.len(),
            rows = rows.len(),
            "roster loaded"
        );
        Ok(Self { courses, rows })
    }

    pub fn from_parts(courses: Vec<Course>, rows: Vec<RosterRow>) -> Self {
        Self { courses, rows }
    }

    /// Course choices for the filter, besides "All Courses".
    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn rows(&self) -> &[RosterRow] {
        &self.rows
    }

    pub fn filter(
        &self,
        course: CourseSelection,
        status: StatusFilter,
        search: &str,
    ) -> Vec<&RosterRow> {
        filter_roster(&self.rows, course, status, search)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CourseRef, UserRef};

    fn course(id: i64, title: &str) -> Course {
        Course {
            id: CourseId(id),
            title: title.into(),
            description: None,
            category: None,
            level: None,
            duration: None,
            image: None,
            instructor_entity: None,
        }
    }

    fn enrollment(student: i64, name: &str, course: i64, progress: f64) -> Enrollment {
        Enrollment {
            user: UserRef {
                id: StudentId(student),
                name: name.into(),
                email: format!("{}@example.org", name.to_lowercase()),
            },
            course: CourseRef {
                id: CourseId(course),
                title: format!("course {course}"),
            },
            progress,
            attendance_average: Some(90.0),
            quiz_average: None,
        }
    }

    #[test]
    fn joins_only_taught_courses() {
        let rows = build_roster(
            &[course(1, "Rust"), course(2, "Go")],
            vec![
                enrollment(10, "Ana", 1, 70.0),
                enrollment(11, "Ben", 2, 69.9),
                enrollment(12, "Cy", 3, 100.0),
            ],
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].status, StudentStatus::Active);
        assert_eq!(rows[1].status, StudentStatus::AtRisk);
        assert_eq!(rows[1].quiz, 0.0);
        assert_eq!(rows[0].attendance, 90.0);
    }

    #[test]
    fn filters_by_course_status_and_search() {
        let rows = build_roster(
            &[course(1, "Rust"), course(2, "Go")],
            vec![
                enrollment(10, "Ana", 1, 80.0),
                enrollment(11, "Ben", 2, 20.0),
                enrollment(10, "Ana", 2, 10.0),
            ],
        );

        let in_go = filter_roster(&rows, CourseSelection::Course(CourseId(2)), StatusFilter::All, "");
        assert_eq!(in_go.len(), 2);

        let at_risk_ana = filter_roster(
            &rows,
            CourseSelection::All,
            StatusFilter::Only(StudentStatus::AtRisk),
            "ANA@",
        );
        assert_eq!(at_risk_ana.len(), 1);
        assert_eq!(at_risk_ana[0].course_id, CourseId(2));
    }

    #[test]
    fn status_serializes_as_label() {
        assert_eq!(serde_json::to_value(StudentStatus::AtRisk).unwrap(), "At Risk");
    }
}
