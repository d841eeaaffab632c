//! # coursedesk-client
//!
//! Instructor dashboard client: REST access to the LMS backend, the live
//! discussion and messaging screens over the document store, the course
//! composer, and the events the UI layer listens to.

pub mod api;
pub mod config;
pub mod controllers;
pub mod events;
pub mod models;
pub mod state;

mod error;

use tracing_subscriber::{fmt, EnvFilter};

use coursedesk_shared::constants::APP_NAME;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use controllers::CourseSelection;
pub use error::{ClientError, Result};
pub use events::{EventBus, UiEvent};
pub use state::AppState;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter. Later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("coursedesk_client=debug,coursedesk_store=info,coursedesk_draft=info,warn")
    });

    let installed = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(app = APP_NAME, "client tracing initialised");
    }
}
