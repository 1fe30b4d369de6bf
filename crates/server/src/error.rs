use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use db::DbErr;
use services::services::{
    config::ConfigError,
    forms::FieldErrors,
    tickets::TicketServiceError,
    views::ViewServiceError,
};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(FieldErrors),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<TicketServiceError> for ApiError {
    fn from(err: TicketServiceError) -> Self {
        match err {
            TicketServiceError::Validation(errors) => ApiError::Validation(errors),
            TicketServiceError::NotFound => ApiError::NotFound("Ticket not found".to_string()),
            TicketServiceError::Database(db_err) => ApiError::Database(db_err),
        }
    }
}

impl From<ViewServiceError> for ApiError {
    fn from(err: ViewServiceError) -> Self {
        match err {
            ViewServiceError::NotFound => ApiError::NotFound("Saved view not found".to_string()),
            ViewServiceError::Database(db_err) => ApiError::Database(db_err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = match &self {
            ApiError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "ValidationError"),
            ApiError::Database(db_err) => match db_err {
                DbErr::RecordNotFound(_) => (StatusCode::NOT_FOUND, "DatabaseError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
            },
            ApiError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ConfigError"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "ForbiddenError"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        };

        if status_code.is_server_error() {
            tracing::error!(
                status = %status_code,
                error_type,
                error = %self,
                "API request failed"
            );
        }

        let response = match &self {
            ApiError::Validation(errors) => {
                let detail = serde_json::to_value(errors).unwrap_or_default();
                ApiResponse::<()>::error_with_data("Validation failed", detail)
            }
            ApiError::Unauthorized => ApiResponse::<()>::error("Unauthorized"),
            ApiError::Forbidden(msg) => ApiResponse::<()>::error(msg),
            ApiError::NotFound(msg) => ApiResponse::<()>::error(msg),
            ApiError::BadRequest(msg) => ApiResponse::<()>::error(msg),
            ApiError::Internal(msg) => ApiResponse::<()>::error(msg),
            _ => ApiResponse::<()>::error(&format!("{}: {}", error_type, self)),
        };
        (status_code, Json(response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn envelope(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_maps_to_422_with_field_detail() {
        let mut errors = FieldErrors::default();
        errors.push("urgency", "Urgency must be between 1 and 5");
        let (status, body) = envelope(ApiError::Validation(errors)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
        assert_eq!(
            body["error_data"]["urgency"][0],
            "Urgency must be between 1 and 5"
        );
    }

    #[tokio::test]
    async fn not_found_and_auth_statuses() {
        let (status, _) = envelope(ApiError::NotFound("Ticket not found".to_string())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = envelope(ApiError::Unauthorized).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = envelope(ApiError::Forbidden("missing ticket.add".to_string())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn database_record_not_found_is_404() {
        let (status, _) =
            envelope(ApiError::Database(DbErr::RecordNotFound("x".to_string()))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) =
            envelope(ApiError::Database(DbErr::Custom("boom".to_string()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
