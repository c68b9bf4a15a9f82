use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Startup cannot continue: missing source files, credentials or index
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// The persisted index is missing, truncated or inconsistent
    #[error("Index error: {0}")]
    Index(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Embedding provider error: {0}")]
    Embedding(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether a provider call that failed with this error is worth repeating
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::HttpClient(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_decode()
                    || e.status().map(|s| s.is_server_error()).unwrap_or(false)
            }
            AppError::Embedding(_) => true,
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Index(_) | AppError::Initialization(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            AppError::Embedding(_) | AppError::Retrieval(_) | AppError::HttpClient(_) => {
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            AppError::Io(_)
            | AppError::Csv(_)
            | AppError::Serialization(_)
            | AppError::Cache(_)
            | AppError::Archive(_)
            | AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
