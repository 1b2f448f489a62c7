//! Errors surfaced by the data-access layer.
//!
//! - [`NetworkError`] is the classified outcome of a failed remote call. The
//!   repositories pass it through untouched and the data stores keep it as the
//!   `Error` state of an [`AsyncResult`](crate::AsyncResult).
//! - [`SessionError`] adds the local validation failures of the
//!   authentication session on top of network errors.
use reqwest::StatusCode;
use thiserror::Error;

/// Classified network failure.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NetworkError {
    /// Placeholder while a request is pending, never returned by a finished call.
    #[error("request in progress")]
    Loading,
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    #[error("server error: {0}")]
    ServerError(String),
    #[error("failed to parse response: {0}")]
    ParsingFailed(String),
    #[error("server unreachable: {0}")]
    Unreachable(String),
    /// The entity being viewed was just removed.
    #[error("entity deleted")]
    Deleted,
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl NetworkError {
    /// Maps a non-success HTTP status and the server message to an error.
    pub fn from_status(status: StatusCode, message: String) -> Self {
        match status.as_u16() {
            401 | 403 => Self::Unauthorized,
            404 => Self::NotFound,
            500..=599 => Self::ServerError(message),
            _ => Self::Unknown(format!("{status}: {message}")),
        }
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::ParsingFailed(err.to_string());
        }
        if err.is_connect() || err.is_timeout() {
            return Self::Unreachable(err.to_string());
        }
        match err.status() {
            Some(status) => Self::from_status(status, err.to_string()),
            None => Self::Unknown(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for NetworkError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParsingFailed(err.to_string())
    }
}

/// Authentication session failures.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("not authenticated")]
    Unauthenticated,
    #[error("invalid server: {0}")]
    InvalidServer(String),
    #[error("credential store error: {0}")]
    Credentials(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_are_classified() {
        let classify = |code: u16| {
            NetworkError::from_status(StatusCode::from_u16(code).unwrap(), "msg".to_string())
        };
        assert_eq!(classify(401), NetworkError::Unauthorized);
        assert_eq!(classify(403), NetworkError::Unauthorized);
        assert_eq!(classify(404), NetworkError::NotFound);
        assert_eq!(classify(502), NetworkError::ServerError("msg".to_string()));
        assert!(matches!(classify(409), NetworkError::Unknown(_)));
    }
}
