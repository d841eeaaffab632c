//! REST client for the LMS backend.
//!
//! One [`ApiClient`] per session. Every call logs at debug level and turns a
//! non-2xx answer into [`ClientError::Backend`] carrying the message the
//! backend put in its body.

use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info};

use coursedesk_draft::{CourseSubmission, PendingBinary};
use coursedesk_shared::constants::{PART_COURSE_DETAILS, PART_IMAGE, PART_PROFILE_DATA};
use coursedesk_shared::types::{AnnouncementId, InstructorId, UserUid};
use coursedesk_shared::Session;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::models::{
    Announcement, Course, Enrollment, Instructor, InstructorDetails, NewAnnouncement,
    ProfileUpdate,
};

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// Resolve the instructor behind an authenticated email and open a
    /// session for them. `uid` is the auth provider's id for the same user.
    pub async fn open_session(&self, email: &str, uid: UserUid) -> Result<Session> {
        let ins = self.instructor_by_email(email).await?;
        let uid = ins.ins_uid.clone().unwrap_or(uid);
        Ok(Session::new(ins.id, uid, ins.name, ins.email))
    }

    // ------------------------------------------------------------------
    // Courses
    // ------------------------------------------------------------------

    pub async fn instructor_courses(&self, instructor: InstructorId) -> Result<Vec<Course>> {
        self.get_json(&format!("/courses/instructor/{instructor}")).await
    }

    /// `POST /courses/add` with the `courseDetails` JSON part followed by
    /// every pending binary, in submission order.
    pub async fn submit_course(&self, submission: &CourseSubmission) -> Result<Value> {
        let metadata = submission.metadata_json()?;
        let mut form = Form::new().part(
            PART_COURSE_DETAILS,
            Part::bytes(metadata)
                .file_name("courseDetails.json")
                .mime_str("application/json")?,
        );
        for part in &submission.binaries {
            form = form.part(part.field, binary_part(&part.payload)?);
        }

        info!(
            title = %submission.metadata.title,
            binaries = submission.binaries.len(),
            "uploading course"
        );
        let resp = self
            .send(self.http.post(self.config.endpoint("/courses/add")).multipart(form))
            .await?;
        decode_or_null(resp).await
    }

    // ------------------------------------------------------------------
    // Instructors
    // ------------------------------------------------------------------

    pub async fn instructor(&self, id: InstructorId) -> Result<Instructor> {
        self.get_json(&format!("/instructors/{id}")).await
    }

    pub async fn instructor_by_email(&self, email: &str) -> Result<Instructor> {
        let req = self
            .http
            .get(self.config.endpoint("/instructors/by-email"))
            .query(&[("email", email)]);
        decode(self.send(req).await?).await
    }

    pub async fn instructor_details(&self, email: &str) -> Result<InstructorDetails> {
        let req = self
            .http
            .get(self.config.endpoint("/instructors/details"))
            .query(&[("email", email)]);
        decode(self.send(req).await?).await
    }

    /// Emails of every student enrolled with the instructor.
    pub async fn instructor_students(&self, id: InstructorId) -> Result<Vec<String>> {
        self.get_json(&format!("/instructors/{id}/students")).await
    }

    /// `PUT /instructors/update/{id}`: `profileData` JSON plus an optional
    /// new `image`.
    pub async fn update_profile(
        &self,
        id: InstructorId,
        profile: &ProfileUpdate,
        image: Option<&PendingBinary>,
    ) -> Result<Instructor> {
        let json = serde_json::to_string(profile)
            .map_err(|e| ClientError::Invalid(format!("profile: {e}")))?;
        let mut form = Form::new().text(PART_PROFILE_DATA, json);
        if let Some(image) = image {
            form = form.part(PART_IMAGE, binary_part(image)?);
        }

        info!(instructor = %id, with_image = image.is_some(), "updating profile");
        let url = self.config.endpoint(&format!("/instructors/update/{id}"));
        decode(self.send(self.http.put(url).multipart(form)).await?).await
    }

    // ------------------------------------------------------------------
    // Enrollments
    // ------------------------------------------------------------------

    pub async fn enrollments(&self, email: &str) -> Result<Vec<Enrollment>> {
        let url = self.segment_url("/user-course", email)?;
        decode(self.send(self.http.get(url)).await?).await
    }

    // ------------------------------------------------------------------
    // Announcements
    // ------------------------------------------------------------------

    pub async fn announcements_by(&self, sender: InstructorId) -> Result<Vec<Announcement>> {
        self.get_json(&format!("/api/announcements/sender/{sender}")).await
    }

    pub async fn send_announcement(&self, announcement: &NewAnnouncement) -> Result<()> {
        let req = self
            .http
            .post(self.config.endpoint("/api/announcements/send"))
            .json(announcement);
        self.send(req).await?;
        info!(title = %announcement.title, target = ?announcement.target_type, "announcement sent");
        Ok(())
    }

    pub async fn delete_announcement(&self, id: AnnouncementId) -> Result<()> {
        let url = self.config.endpoint(&format!("/api/announcements/{id}"));
        self.send(self.http.delete(url)).await?;
        info!(announcement = %id, "announcement deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    /// `path` on the backend with `segment` appended as one percent-encoded
    /// path segment.
    fn segment_url(&self, path: &str, segment: &str) -> Result<Url> {
        let mut url = Url::parse(&self.config.endpoint(path))
            .map_err(|e| ClientError::Config(format!("invalid API URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Config(format!("{} cannot be a base URL", self.config.api_url)))?
            .push(segment);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        decode(self.send(self.http.get(self.config.endpoint(path))).await?).await
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response> {
        let resp = req.send().await.map_err(|e| {
            error!(error = %e, "request failed");
            ClientError::Http(e)
        })?;

        let status = resp.status();
        debug!(url = %resp.url(), status = status.as_u16(), "response");
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let message = backend_message(status, &body);
        error!(status = status.as_u16(), %message, "backend rejected request");
        Err(ClientError::Backend {
            status: status.as_u16(),
            message,
        })
    }
}

fn binary_part(binary: &PendingBinary) -> Result<Part> {
    Ok(Part::bytes(binary.data.to_vec())
        .file_name(binary.file_name.clone())
        .mime_str(&binary.content_type)?)
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}

/// Like [`decode`], but an empty body reads as `null`.
async fn decode_or_null(resp: Response) -> Result<Value> {
    let bytes = resp.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}

/// What to show for a rejected request: the body's `message` field, else
/// the body text, else the status reason.
pub fn backend_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message")?.as_str().map(str::to_string))
        .filter(|m| !m.trim().is_empty());
    if let Some(message) = from_json {
        return message;
    }

    let text = body.trim();
    if !text.is_empty() {
        return text.to_string();
    }

    status
        .canonical_reason()
        .unwrap_or("Request failed")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_one_encoded_segment() {
        let api = ApiClient::new(ClientConfig::default()).unwrap();
        let url = api.segment_url("/user-course", "ann+lms#2/x@example.org").unwrap();
        assert_eq!(url.path(), "/user-course/ann+lms%232%2Fx@example.org");
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn message_field_wins() {
        let msg = backend_message(
            StatusCode::BAD_REQUEST,
            r#"{"message":"Title already used","status":400}"#,
        );
        assert_eq!(msg, "Title already used");
    }

    #[test]
    fn falls_back_to_body_then_reason() {
        assert_eq!(
            backend_message(StatusCode::INTERNAL_SERVER_ERROR, "  boom \n"),
            "boom"
        );
        assert_eq!(
            backend_message(StatusCode::NOT_FOUND, r#"{"message":""}"#),
            r#"{"message":""}"#
        );
        assert_eq!(backend_message(StatusCode::NOT_FOUND, ""), "Not Found");
    }
}
