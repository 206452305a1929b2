use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Failure talking to the CuraCore backend
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("could not reach the CuraCore backend: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned {status}: {detail}")]
    Status { status: StatusCode, detail: String },

    #[error("unexpected response from backend: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("could not read {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

impl ApiError {
    /// Build a status error from a non-success response body.
    ///
    /// The backend reports errors as `{"detail": ...}` where detail is a
    /// string, or a list of validation errors.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let detail = match serde_json::from_str::<ErrorBody>(body) {
            Ok(ErrorBody { detail: serde_json::Value::String(s) }) => s,
            Ok(ErrorBody { detail }) => detail.to_string(),
            Err(_) if body.trim().is_empty() => status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string(),
            Err(_) => body.trim().to_string(),
        };
        ApiError::Status { status, detail }
    }

    /// Short text for a notice, e.g. after "Login failed: "
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status { detail, .. } => detail.clone(),
            ApiError::Transport(_) => "Backend unreachable".to_string(),
            ApiError::Decode(_) => "Unexpected response from backend".to_string(),
            ApiError::File { path, .. } => format!("Could not read {}", path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_string_is_extracted() {
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"detail": "Incorrect password"}"#);
        assert_eq!(err.user_message(), "Incorrect password");
    }

    #[test]
    fn test_validation_detail_is_kept_as_json() {
        let err = ApiError::from_status(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail": [{"loc": ["body", "email"], "msg": "field required"}]}"#,
        );
        assert!(err.user_message().contains("field required"));
    }

    #[test]
    fn test_empty_body_uses_reason_phrase() {
        let err = ApiError::from_status(StatusCode::NOT_FOUND, "");
        assert_eq!(err.user_message(), "Not Found");
    }
}
