use serde::Serialize;
use tracing::{info, warn};

use crate::error::{DraftError, Result};

/// Where a draft is in its submission lifecycle.
///
/// `Editing -> Submitting -> Succeeded | Failed`. `Failed` keeps the draft
/// and behaves like `Editing` for edits and retries; `Succeeded` is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SubmissionState {
    Editing,
    Submitting,
    Succeeded,
    #[serde(rename_all = "camelCase")]
    Failed { message: String, retryable: bool },
}

impl SubmissionState {
    pub fn name(&self) -> &'static str {
        match self {
            SubmissionState::Editing => "editing",
            SubmissionState::Submitting => "submitting",
            SubmissionState::Succeeded => "succeeded",
            SubmissionState::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubmissionTracker {
    state: SubmissionState,
}

impl Default for SubmissionTracker {
    fn default() -> Self {
        Self {
            state: SubmissionState::Editing,
        }
    }
}

impl SubmissionTracker {
    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    /// Edits are allowed while editing or after a failure.
    pub fn ensure_editable(&mut self) -> Result<()> {
        match self.state {
            SubmissionState::Editing => Ok(()),
            SubmissionState::Failed { .. } => {
                self.state = SubmissionState::Editing;
                Ok(())
            }
            _ => Err(DraftError::State {
                state: self.state.name(),
                action: "edit the draft",
            }),
        }
    }

    /// Enter `Submitting`. Refused while a submission is in flight or done.
    pub fn begin(&mut self) -> Result<()> {
        match self.state {
            SubmissionState::Editing | SubmissionState::Failed { .. } => {
                self.state = SubmissionState::Submitting;
                info!("submission started");
                Ok(())
            }
            _ => Err(DraftError::State {
                state: self.state.name(),
                action: "submit",
            }),
        }
    }

    pub fn succeed(&mut self) -> Result<()> {
        self.expect_submitting("complete a submission")?;
        self.state = SubmissionState::Succeeded;
        info!("submission succeeded");
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<()> {
        self.expect_submitting("fail a submission")?;
        let message = message.into();
        warn!(%message, "submission failed, draft kept for retry");
        self.state = SubmissionState::Failed {
            message,
            retryable: true,
        };
        Ok(())
    }

    fn expect_submitting(&self, action: &'static str) -> Result<()> {
        if self.state != SubmissionState::Submitting {
            return Err(DraftError::State {
                state: self.state.name(),
                action,
            });
        }
        Ok(())
    }
}
