use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error, Clone)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("target user not connected")]
    TargetNotConnected,

    #[error("dispatch failure: {0}")]
    Dispatch(String),

    #[error("internal server error")]
    Internal,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::TargetNotConnected => StatusCode::NOT_FOUND,
            AppError::Config(_) | AppError::Dispatch(_) | AppError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": self.to_string(),
        }))
    }
}

// NOTE: No From<AppError> for actix_web::Error needed — actix-web provides
// a blanket impl for all ResponseError types.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_connected_maps_to_404() {
        assert_eq!(
            AppError::TargetNotConnected.status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_dispatch_failure_maps_to_500() {
        assert_eq!(
            AppError::Dispatch("emit failed".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
