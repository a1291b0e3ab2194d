// Traits for dependency injection - the workflow never touches lead storage directly

use async_trait::async_trait;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

use super::types::{MoveRequest, Stage};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MoveError {
    #[error("Lead '{0}' not found")]
    LeadNotFound(String),
    #[error("Lead '{lead}' is in {actual}, not {expected}")]
    StageMismatch {
        lead: String,
        expected: Stage,
        actual: Stage,
    },
    #[error("Move rejected: {0}")]
    Rejected(String),
}

/// Applies a validated transition to whatever owns the leads.
///
/// Called exactly once per accepted submission. Returning an error leaves the
/// form open so the operator can resubmit.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LeadMover: Send + Sync {
    async fn move_lead(&self, request: &MoveRequest) -> Result<(), MoveError>;
}
