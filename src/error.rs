use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use exif::Error as ExifError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use tokio::task::JoinError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("EXIF error: {0}")]
    Exif(#[from] ExifError),

    #[error("JSON error: {0}")]
    Json(#[from] SerdeJsonError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Tokio join error: {0}")]
    Join(#[from] JoinError),

    #[error("Upstream API returned {status}: {body}")]
    UpstreamApi { status: u16, body: String },

    #[error("API key is missing")]
    MissingApiKey,

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Generic error: {0}")]
    Generic(String),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string(),
        }))
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Image(_) => StatusCode::BAD_REQUEST,
            AppError::Exif(_) => StatusCode::BAD_REQUEST,
            AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::Http(_) => StatusCode::BAD_GATEWAY,
            AppError::Url(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::UpstreamApi { .. } => StatusCode::BAD_GATEWAY,
            AppError::MissingApiKey => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::Generic(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failure of an image analysis request.
///
/// Only the size-limit case carries a specific condition; every other failure
/// is reported as `Unavailable` with a non-specific message to the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Image is too large for analysis ({size_mb:.2} MB, limit is 20 MB)")]
    TooLarge { size_mb: f64 },

    #[error("Image analysis is currently unavailable")]
    Unavailable(String),
}

impl AnalysisError {
    /// Machine-readable kind used in JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::TooLarge { .. } => "too_large",
            AnalysisError::Unavailable(_) => "unavailable",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AnalysisError::TooLarge { size_mb } => serde_json::json!({
                "error": self.to_string(),
                "kind": self.kind(),
                "sizeMb": size_mb,
            }),
            AnalysisError::Unavailable(_) => serde_json::json!({
                "error": self.to_string(),
                "kind": self.kind(),
            }),
        }
    }
}

impl ResponseError for AnalysisError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.to_json())
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            AnalysisError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AnalysisError::Unavailable(_) => StatusCode::BAD_GATEWAY,
        }
    }
}
