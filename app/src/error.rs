use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures raised by the TMDB request helper. Nothing above the request helper
/// raises these to the UI; the catalog turns them into empty results.
#[derive(Error, Debug)]
pub enum TmdbError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("TMDB API error (HTTP {status}): {message}")]
    Request { status: u16, message: String },

    #[error("Unexpected TMDB response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid TMDB URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Request cancelled")]
    Cancelled,
}

impl TmdbError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TmdbError::Request { status, .. } => Some(*status),
            TmdbError::Network(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TmdbError::Cancelled)
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum PreferenceError {
    #[error("Rating must be between 1 and 10, got {0}")]
    InvalidRating(f64),

    #[error("Review content must not be empty")]
    EmptyReview,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Preference store error: {0}")]
    Store(#[from] StoreError),

    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<PreferenceError> for AppError {
    fn from(err: PreferenceError) -> Self {
        match err {
            PreferenceError::Store(err) => AppError::Store(err),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message): (StatusCode, String) = match &self {
            AppError::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Preference store error".to_string(),
            ),
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_error_exposes_status() {
        let err = TmdbError::Request {
            status: 404,
            message: "The resource you requested could not be found.".to_string(),
        };
        assert_eq!(err.status(), Some(404));
        assert!(err.is_not_found());
        assert!(!err.is_cancelled());
    }

    #[test]
    fn invalid_preference_input_is_a_bad_request() {
        let response = AppError::from(PreferenceError::InvalidRating(11.0)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::from(PreferenceError::EmptyReview).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_404() {
        assert_eq!(AppError::NotFound.into_response().status(), StatusCode::NOT_FOUND);
    }
}
