//! End-to-end tests of the REST client and controllers against an in-process
//! axum backend.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use coursedesk_client::controllers::announcements::{AnnouncementDesk, AnnouncementDraft, Audience};
use coursedesk_client::controllers::composer::CourseComposer;
use coursedesk_client::controllers::profile::ProfileEditor;
use coursedesk_client::controllers::roster::{Roster, StatusFilter, StudentStatus};
use coursedesk_client::models::ProfileUpdate;
use coursedesk_client::{ApiClient, ClientConfig, ClientError, CourseSelection, EventBus, UiEvent};
use coursedesk_draft::{AttachmentKey, PendingBinary, SubmissionState};
use coursedesk_shared::types::{AnnouncementId, CourseId, InstructorId, UserUid};
use coursedesk_shared::{DeskError, ErrorKind, Session};

// ------------------------------------------------------------------
// Fake backend
// ------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Captured {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

#[derive(Clone, Default)]
struct Backend {
    uploads: Arc<Mutex<Vec<Vec<Captured>>>>,
    announcements: Arc<Mutex<Vec<Value>>>,
}

async fn read_parts(mut multipart: Multipart) -> Vec<Captured> {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.unwrap().to_vec();
        parts.push(Captured {
            name,
            file_name,
            content_type,
            data,
        });
    }
    parts
}

async fn add_course(State(backend): State<Backend>, multipart: Multipart) -> impl IntoResponse {
    let parts = read_parts(multipart).await;
    let details: Value = serde_json::from_slice(&parts[0].data).unwrap();
    if details["title"] == "Duplicate" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": 400, "message": "A course with this title already exists"})),
        )
            .into_response();
    }
    if details["title"] == "Crash" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "database unavailable").into_response();
    }
    backend.uploads.lock().unwrap().push(parts);
    Json(json!({"id": 99, "title": details["title"]})).into_response()
}

async fn courses_of(Path(id): Path<i64>) -> Json<Value> {
    assert_eq!(id, 5);
    Json(json!([
        {"id": 1, "title": "Rust", "category": "Programming", "level": "Beginner", "duration": "6 weeks"},
        {"id": 2, "title": "Go"}
    ]))
}

async fn students_of(Path(id): Path<i64>) -> Json<Value> {
    assert_eq!(id, 5);
    Json(json!(["ana@example.org", "ben@example.org"]))
}

async fn enrollments_of(Path(email): Path<String>) -> Json<Value> {
    let rows = match email.as_str() {
        "ana+lms#1@example.org" => json!([
            {"user": {"id": 12, "name": "Ann", "email": email}, "course": {"id": 2, "title": "Go"},
             "progress": 95}
        ]),
        "ana@example.org" => json!([
            {"user": {"id": 10, "name": "Ana", "email": email}, "course": {"id": 1, "title": "Rust"},
             "progress": 85, "attendanceAverage": 90, "quizAverage": 77.5},
            {"user": {"id": 10, "name": "Ana", "email": email}, "course": {"id": 3, "title": "Elsewhere"},
             "progress": 10}
        ]),
        _ => json!([
            {"user": {"id": 11, "name": "Ben", "email": email}, "course": {"id": 2, "title": "Go"},
             "progress": 40}
        ]),
    };
    Json(rows)
}

async fn by_email(Query(q): Query<HashMap<String, String>>) -> impl IntoResponse {
    match q.get("email").map(String::as_str) {
        Some("k@example.org") => {
            Json(json!({"id": 5, "name": "Dr. K", "email": "k@example.org"})).into_response()
        }
        _ => (StatusCode::NOT_FOUND, Json(json!({"message": "Instructor not found"}))).into_response(),
    }
}

async fn instructor(Path(id): Path<i64>) -> Json<Value> {
    Json(json!({"id": id, "name": "Dr. K", "email": "k@example.org", "bio": "Systems", "image": "k.png"}))
}

async fn update_instructor(
    State(backend): State<Backend>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Json<Value> {
    let parts = read_parts(multipart).await;
    let profile: Value = serde_json::from_slice(&parts[0].data).unwrap();
    let image = parts.iter().find(|p| p.name == "image").and_then(|p| p.file_name.clone());
    backend.uploads.lock().unwrap().push(parts);
    Json(json!({
        "id": id,
        "name": profile["name"],
        "email": profile["email"],
        "bio": profile["bio"],
        "profileLink": profile["profileLink"],
        "image": image,
    }))
}

async fn announcements_of(State(backend): State<Backend>, Path(id): Path<i64>) -> Json<Value> {
    assert_eq!(id, 5);
    Json(Value::Array(backend.announcements.lock().unwrap().clone()))
}

async fn send_announcement(State(backend): State<Backend>, Json(body): Json<Value>) -> StatusCode {
    let mut list = backend.announcements.lock().unwrap();
    let mut stored = body;
    stored["id"] = json!(list.len() as i64 + 1);
    stored["timestamp"] = json!(format!("2024-05-0{} | 10:00", list.len() + 1));
    list.push(stored);
    StatusCode::CREATED
}

async fn delete_announcement(State(backend): State<Backend>, Path(id): Path<i64>) -> StatusCode {
    backend.announcements.lock().unwrap().retain(|a| a["id"] != id);
    StatusCode::NO_CONTENT
}

async fn spawn_backend() -> (SocketAddr, Backend) {
    let backend = Backend::default();
    let app = Router::new()
        .route("/courses/add", post(add_course))
        .route("/courses/instructor/:id", get(courses_of))
        .route("/instructors/by-email", get(by_email))
        .route("/instructors/:id", get(instructor))
        .route("/instructors/:id/students", get(students_of))
        .route("/instructors/update/:id", put(update_instructor))
        .route("/user-course/:email", get(enrollments_of))
        .route("/api/announcements/sender/:id", get(announcements_of))
        .route("/api/announcements/send", post(send_announcement))
        .route("/api/announcements/:id", delete(delete_announcement))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, backend)
}

fn client(addr: SocketAddr) -> ApiClient {
    ApiClient::new(ClientConfig {
        api_url: format!("http://{addr}"),
        ..ClientConfig::default()
    })
    .unwrap()
}

fn session() -> Session {
    Session::new(InstructorId(5), UserUid::new("ins-5"), "Dr. K", "k@example.org")
}

// ------------------------------------------------------------------
// Tests
// ------------------------------------------------------------------

#[tokio::test]
async fn course_submission_is_multipart_in_order() {
    let (addr, backend) = spawn_backend().await;
    let events = EventBus::default();
    let mut rx = events.subscribe();
    let mut composer = CourseComposer::new(client(addr), session(), events);

    {
        let ed = composer.editor_mut();
        ed.set_field("title", "Ownership in Practice").unwrap();
        ed.set_field("pricing.originalPrice", " 120 ").unwrap();
        ed.add_module().unwrap();
        ed.add_resource().unwrap();
        let quiz = "modules[0].topics[0].mcqQuizzes[0]";
        ed.set_field(&format!("{quiz}.question"), "Who owns a moved value?").unwrap();
        ed.set_field(&format!("{quiz}.options"), json!(["caller", "callee", "nobody"])).unwrap();
        ed.set_field(&format!("{quiz}.correctAnswer"), "callee").unwrap();
        ed.set_field(&format!("{quiz}.marks"), "85").unwrap();
        ed.attach(
            AttachmentKey::Topic { module: 0, topic: 0 },
            PendingBinary::new("lesson1.mp4", "video/mp4", vec![7u8; 16]),
        )
        .unwrap();
        ed.attach(
            AttachmentKey::Resource(0),
            PendingBinary::new("notes.pdf", "application/pdf", &b"%PDF"[..]),
        )
        .unwrap();
        ed.attach(
            AttachmentKey::CourseImage,
            PendingBinary::new("cover.png", "image/png", vec![1u8, 2, 3]),
        )
        .unwrap();
    }

    let created = composer.submit().await.unwrap();
    assert_eq!(created["id"], 99);
    assert_eq!(composer.editor().state(), &SubmissionState::Succeeded);
    assert!(composer.editor().attachments().is_empty());

    let uploads = backend.uploads.lock().unwrap().clone();
    let parts = &uploads[0];
    let names: Vec<&str> = parts.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["courseDetails", "image", "resourceFiles", "videoFiles"]);
    assert_eq!(parts[1].file_name.as_deref(), Some("cover.png"));
    assert_eq!(parts[2].content_type.as_deref(), Some("application/pdf"));
    assert_eq!(parts[3].data, vec![7u8; 16]);

    let details: Value = serde_json::from_slice(&parts[0].data).unwrap();
    assert_eq!(details["title"], "Ownership in Practice");
    assert_eq!(details["image"], "cover.png");
    assert_eq!(details["pricing"]["originalPrice"], json!(120));
    assert_eq!(details["instructorEntity"]["id"], 5);
    assert_eq!(details["courseResources"][0]["file"], "notes.pdf");
    assert_eq!(details["courseResources"][0]["type"], "pdf");
    let quiz = &details["modules"][0]["topics"][0]["mcqQuizzes"][0];
    assert_eq!(quiz["marks"], json!(85));
    assert_eq!(quiz["correctAnswer"], "callee");
    assert_eq!(details["modules"][0]["topics"][0]["file"], "lesson1.mp4");

    let states: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok())
        .filter_map(|e| match e {
            UiEvent::SubmissionState(p) => Some(p.state.name().to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(states, vec!["submitting", "succeeded"]);
}

#[tokio::test]
async fn backend_message_is_surfaced_and_draft_kept() {
    let (addr, _backend) = spawn_backend().await;
    let mut composer = CourseComposer::new(client(addr), session(), EventBus::default());
    composer.editor_mut().set_field("title", "Duplicate").unwrap();
    composer
        .editor_mut()
        .attach(
            AttachmentKey::CourseImage,
            PendingBinary::new("cover.png", "image/png", vec![1u8]),
        )
        .unwrap();

    let err = composer.submit().await.unwrap_err();
    match &err {
        ClientError::Backend { status, message } => {
            assert_eq!(*status, 400);
            assert_eq!(message, "A course with this title already exists");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(
        composer.editor().state(),
        &SubmissionState::Failed {
            message: "A course with this title already exists".into(),
            retryable: true,
        }
    );
    assert_eq!(composer.editor().attachments().len(), 1);

    let desk: DeskError = err.into();
    assert_eq!(desk.kind(), ErrorKind::Transport);

    // Retry after fixing the title.
    composer.editor_mut().set_field("title", "Unique").unwrap();
    composer.submit().await.unwrap();
    assert_eq!(composer.editor().state(), &SubmissionState::Succeeded);
}

#[tokio::test]
async fn plain_text_error_body_is_used() {
    let (addr, _backend) = spawn_backend().await;
    let mut composer = CourseComposer::new(client(addr), session(), EventBus::default());
    composer.editor_mut().set_field("title", "Crash").unwrap();

    match composer.submit().await.unwrap_err() {
        ClientError::Backend { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "database unavailable");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn session_opens_from_email_lookup() {
    let (addr, _backend) = spawn_backend().await;
    let api = client(addr);

    let session = api
        .open_session("k@example.org", UserUid::new("auth-uid"))
        .await
        .unwrap();
    assert_eq!(session.instructor_id, InstructorId(5));
    assert_eq!(session.instructor_uid, UserUid::new("auth-uid"));
    assert_eq!(session.display_name, "Dr. K");

    match api.open_session("nobody@example.org", UserUid::new("x")).await {
        Err(ClientError::Backend { status: 404, message }) => {
            assert_eq!(message, "Instructor not found")
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn roster_joins_courses_and_enrollments() {
    let (addr, _backend) = spawn_backend().await;
    let roster = Roster::load(&client(addr), &session()).await.unwrap();

    assert_eq!(roster.courses().len(), 2);
    // Ana's enrollment in a foreign course is dropped.
    assert_eq!(roster.rows().len(), 2);

    let ana = roster.filter(CourseSelection::All, StatusFilter::All, "ana");
    assert_eq!(ana.len(), 1);
    assert_eq!(ana[0].status, StudentStatus::Active);
    assert_eq!(ana[0].quiz, 77.5);

    let at_risk = roster.filter(
        CourseSelection::Course(CourseId(2)),
        StatusFilter::Only(StudentStatus::AtRisk),
        "",
    );
    assert_eq!(at_risk.len(), 1);
    assert_eq!(at_risk[0].name, "Ben");
}

#[tokio::test]
async fn enrollment_lookup_keeps_special_characters_in_email() {
    let (addr, _backend) = spawn_backend().await;
    let rows = client(addr).enrollments("ana+lms#1@example.org").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].user.name, "Ann");
    assert_eq!(rows[0].user.email, "ana+lms#1@example.org");
}

#[tokio::test]
async fn announcements_send_list_and_delete() {
    let (addr, _backend) = spawn_backend().await;
    let mut desk = AnnouncementDesk::new(client(addr), session());

    let blank = AnnouncementDraft::default();
    assert!(matches!(desk.send(&blank).await, Err(ClientError::Invalid(_))));

    for (title, audience) in [
        ("Exam moved", Audience::All),
        ("Lab open", Audience::InstructorStudents),
        ("Grades out", Audience::All),
        ("Holiday", Audience::All),
    ] {
        let draft = AnnouncementDraft {
            title: title.into(),
            message: format!("{title}!"),
            audience,
            ..AnnouncementDraft::default()
        };
        desk.send(&draft).await.unwrap();
    }
    assert_eq!(desk.items().len(), 4);
    assert_eq!(desk.items()[1].target_id, Some(5));

    let recent: Vec<&str> = desk.recent().iter().map(|a| a.title.as_str()).collect();
    assert_eq!(recent, vec!["Holiday", "Grades out", "Lab open"]);
    assert_eq!(desk.search("LAB").len(), 1);

    desk.delete(AnnouncementId(1)).await.unwrap();
    assert_eq!(desk.items().len(), 3);
    desk.refresh().await.unwrap();
    assert_eq!(desk.items().len(), 3);
}

#[tokio::test]
async fn profile_update_sends_profile_data_and_image() {
    let (addr, backend) = spawn_backend().await;
    let mut profile = ProfileEditor::new(client(addr), session());

    profile.load().await.unwrap();
    assert_eq!(
        profile.image_url(),
        Some(format!("http://{addr}/instructor_images/k.png"))
    );

    let mut form = profile.form();
    assert_eq!(form.bio, "Systems");
    form.profile_link = "https://example.org/k".into();
    profile
        .set_image(PendingBinary::new("me.jpg", "image/jpeg", vec![9u8; 8]))
        .unwrap();

    let saved = profile.save(form).await.unwrap();
    assert_eq!(saved.image.as_deref(), Some("me.jpg"));
    assert_eq!(saved.profile_link.as_deref(), Some("https://example.org/k"));
    assert!(profile.pending_image().is_none());

    let uploads = backend.uploads.lock().unwrap().clone();
    let names: Vec<&str> = uploads[0].iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["profileData", "image"]);

    let sent: ProfileUpdate = serde_json::from_slice(&uploads[0][0].data).unwrap();
    assert_eq!(sent.name, "Dr. K");
}
