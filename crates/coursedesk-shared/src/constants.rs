/// Application name
pub const APP_NAME: &str = "CourseDesk";

/// Default REST backend base URL
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Default HTTP request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum size of a single pending attachment in bytes (200 MiB)
pub const MAX_UPLOAD_SIZE: usize = 200 * 1024 * 1024;

/// Students below this progress percentage are flagged "At Risk"
pub const AT_RISK_PROGRESS_THRESHOLD: f64 = 70.0;

/// Number of entries in the "recent announcements" strip
pub const RECENT_ANNOUNCEMENTS: usize = 3;

/// Number of options a freshly added quiz starts with
pub const DEFAULT_QUIZ_OPTIONS: usize = 3;

/// Quizzes never have fewer options than this
pub const MIN_QUIZ_OPTIONS: usize = 2;

/// Document store collection names
pub const COLLECTION_COURSES: &str = "courses";
pub const COLLECTION_DISCUSSIONS: &str = "discussions";
pub const COLLECTION_REPLIES: &str = "replies";
pub const COLLECTION_ANNOUNCEMENTS: &str = "announcements";
pub const COLLECTION_PRIVATE_MESSAGES: &str = "privateMessages";

/// Field the store stamps with its clock on every append
pub const FIELD_TIMESTAMP: &str = "timestamp";

/// Multipart part names expected by the backend
pub const PART_COURSE_DETAILS: &str = "courseDetails";
pub const PART_PROFILE_DATA: &str = "profileData";
pub const PART_IMAGE: &str = "image";
pub const PART_RESOURCE_FILES: &str = "resourceFiles";
pub const PART_VIDEO_FILES: &str = "videoFiles";
