use thiserror::Error;
use twigs_core::{NetworkError, SessionError};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("{0}")]
    Session(#[from] SessionError),
    #[error("{0}")]
    Network(#[from] NetworkError),
    #[error("{0}")]
    Usage(String),
}
