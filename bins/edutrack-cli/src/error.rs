// Error types shared by the backend client and the command layer

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never got an HTTP answer
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend rejected the request
    #[error("server responded {status}: {message}")]
    Status { status: u16, message: String },

    /// 401 from any authenticated call; the cached session is stale
    #[error("not authorized, please sign in again")]
    Unauthorized,
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

/// Raised before any network call when a form is incomplete.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("please fill out the {0} field")]
    MissingField(&'static str),

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("{0}")]
    Invalid(String),
}
