//! Error taxonomy for the task and chat subsystems.
//!
//! An empty task list is not an error anywhere in this crate. It is returned
//! as `Ok` with an empty vec so callers can render a distinct "all done"
//! state.

use thiserror::Error;

/// Failures surfaced by the task store and reconciliation layer.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A remote fetch, update, or delete did not complete. Distinct from an
    /// empty task list.
    #[error("remote todo API unavailable: {0}")]
    Network(String),

    #[error("local store error: {0}")]
    Storage(String),
}

/// Failures surfaced by the chat relay.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The backend credential is absent. No outbound call was issued.
    #[error("chat backend API key is not configured")]
    Configuration,

    #[error("invalid message sequence: {0}")]
    Validation(String),

    /// The backend was reachable but returned an error, timed out, or
    /// produced no usable reply text.
    #[error("chat backend error: {0}")]
    Upstream(String),

    #[error("internal chat error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for TaskError {
    fn from(err: serde_json::Error) -> Self {
        TaskError::Storage(err.to_string())
    }
}
