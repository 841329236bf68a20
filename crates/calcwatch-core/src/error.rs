use thiserror::Error;

/// Why the validator turned an expression away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("division by zero")]
    DivisionByZero,
    #[error("invalid format")]
    InvalidFormat,
}

impl Rejection {
    /// Text shown next to the rejected expression.
    pub fn display_message(self) -> &'static str {
        match self {
            Rejection::DivisionByZero => "Division by zero is not allowed.",
            Rejection::InvalidFormat => "Invalid expression format.",
        }
    }
}

/// The request never produced a usable answer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("validation error: {0}")]
    Validation(#[from] Rejection),

    /// The cluster answered and refused the job.
    #[error("submission rejected: {0}")]
    Submission(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("failed to record job locally: {0:#}")]
    Storage(anyhow::Error),
}

impl SubmitError {
    /// Text shown next to the rejected expression.
    pub fn display_message(&self) -> String {
        match self {
            SubmitError::Validation(rejection) => rejection.display_message().to_string(),
            SubmitError::Submission(message) => message.clone(),
            SubmitError::Transport(e) => format!("Error: {e}"),
            SubmitError::Storage(e) => format!("Error: {e:#}"),
        }
    }
}

/// Failure of a bulk operation against the cluster (listing, clearing).
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("local state error: {0:#}")]
    Storage(anyhow::Error),
}
