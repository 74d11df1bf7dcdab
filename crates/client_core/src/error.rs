use thiserror::Error;

/// Failures reported by the auth service.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The service answered with a non-success status. `message` is the
    /// service's own wording and is what the user sees.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("session expired; sign in again")]
    SessionExpired,
    #[error("auth request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid auth response: {0}")]
    Decode(String),
}

/// Failures of any remote table operation.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("{operation} rejected ({status}): {message}")]
    Rejected {
        operation: &'static str,
        status: u16,
        message: String,
    },
    #[error("table request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid table response: {0}")]
    Decode(String),
}

/// Local input checks; never sent to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title must not be blank")]
    BlankTitle,
    #[error("no todo is being edited")]
    NotEditing,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("no active session")]
    NoSession,
}
