//! Error types for talking to the library backend

use thiserror::Error;

/// Failure of a single backend call.
///
/// The backend reports failures as a human-readable body; that body is the
/// whole message. Nothing here tries to interpret it.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-success response. Displays the body verbatim.
    #[error("{body}")]
    Backend { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn backend(status: u16, body: impl Into<String>) -> Self {
        Self::Backend {
            status,
            body: body.into(),
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_displays_body_verbatim() {
        let err = ApiError::backend(409, "directory not empty");
        assert_eq!(err.to_string(), "directory not empty");
    }

    #[test]
    fn test_decode_error_is_prefixed() {
        let err = ApiError::Decode("missing field `root`".to_string());
        assert_eq!(err.to_string(), "unexpected response: missing field `root`");
    }
}
