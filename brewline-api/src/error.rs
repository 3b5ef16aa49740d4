use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use brewline_order::{OrderError, PlacementError};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    UnprocessableError(String),
    UnavailableError(String),
    InternalServerError(String),
}

impl AppError {
    fn parts(self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, "Unauthorized Access", msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, "Forbidden Access", msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, "Invalid Body", msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, "Data Not Found", msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, "Conflict", msg),
            AppError::UnprocessableError(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "Unprocessable Entity", msg),
            AppError::UnavailableError(msg) => {
                tracing::warn!("Service Unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service Unavailable",
                    "Please try again".to_string(),
                )
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                    "internal server error".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, error) = self.parts();

        let body = Json(json!({
            "status": "error",
            "message": message,
            "error": error,
        }));

        (status, body).into_response()
    }
}

impl From<PlacementError> for AppError {
    fn from(err: PlacementError) -> Self {
        match err {
            PlacementError::Validation(v) => AppError::ValidationError(v.first_message().to_string()),
            PlacementError::MenuNotFound(_) | PlacementError::ModifierNotFound { .. } => {
                AppError::NotFoundError(err.to_string())
            }
            PlacementError::InsufficientStock { .. } => AppError::ConflictError("Stock Insufficient".to_string()),
            PlacementError::TimedOut(_) | PlacementError::Commit(_) | PlacementError::Store(_) => {
                AppError::UnavailableError(err.to_string())
            }
            PlacementError::NoRowsUpdated { .. } | PlacementError::Pricing(_) => {
                AppError::InternalServerError(err.to_string())
            }
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound(_) => AppError::NotFoundError("Data Not Found".to_string()),
            OrderError::InvalidStatus(_) => AppError::UnprocessableError("Status Is Not Appropriate".to_string()),
            OrderError::InvalidRating(_) => AppError::ValidationError(err.to_string()),
            OrderError::SessionExpired | OrderError::InvalidSession => {
                AppError::AuthenticationError(err.to_string())
            }
            OrderError::Store(e) => AppError::InternalServerError(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_stock_insufficient_is_conflict() {
        let err: AppError = PlacementError::InsufficientStock {
            menu_id: 1,
            requested: 3,
            available: 1,
        }
        .into();
        assert_eq!(err.parts().0, StatusCode::CONFLICT);
    }

    #[test]
    fn test_internal_text_is_not_leaked() {
        let err: AppError = PlacementError::NoRowsUpdated {
            operation: brewline_order::WriteOp::StockUpdate,
            key: "menu 4".to_string(),
        }
        .into();
        let (status, _, body) = err.parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains("menu 4"));
    }

    #[test]
    fn test_timeout_is_unavailable() {
        let err: AppError = PlacementError::TimedOut(Duration::from_secs(5)).into();
        assert_eq!(err.parts().0, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_invalid_status_is_unprocessable() {
        let err: AppError = OrderError::InvalidStatus("shipped".to_string()).into();
        assert_eq!(err.parts().0, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
