//! # coursedesk-shared
//!
//! Identifiers, constants, the error taxonomy and the session context shared
//! by every CourseDesk crate.

pub mod constants;
pub mod error;
pub mod session;
pub mod types;

pub use error::{DeskError, ErrorKind};
pub use session::Session;
