use advisory_core::errors::{AnalyticsError, Error as CoreError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

fn core_status(err: &CoreError) -> StatusCode {
    match err {
        CoreError::Analytics(AnalyticsError::UnknownReport(_))
        | CoreError::Analytics(AnalyticsError::InvalidScope { .. })
        | CoreError::Validation(_) => StatusCode::BAD_REQUEST,
        CoreError::Analytics(AnalyticsError::UnknownEntity { .. }) => StatusCode::NOT_FOUND,
        CoreError::Analytics(AnalyticsError::NoDataAvailable { .. })
        | CoreError::Analytics(AnalyticsError::RefreshFailed(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        CoreError::Classification(_)
        | CoreError::NonConvergence(_)
        | CoreError::StaleInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CoreError::Database(_) | CoreError::Repository(_) | CoreError::Unexpected(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Core(e) => core_status(e),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        let body = Json(ErrorBody {
            code: status.as_u16(),
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_errors_are_client_errors() {
        let unknown = CoreError::Analytics(AnalyticsError::UnknownReport("x".into()));
        assert_eq!(core_status(&unknown), StatusCode::BAD_REQUEST);

        let missing = CoreError::Analytics(AnalyticsError::UnknownEntity {
            level: "client".into(),
            id: "c9".into(),
        });
        assert_eq!(core_status(&missing), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_nothing_to_serve_is_unavailable() {
        let err = CoreError::Analytics(AnalyticsError::NoDataAvailable {
            key: "company_summary:all@2025-03-31".into(),
            reason: "source unavailable".into(),
        });
        assert_eq!(core_status(&err), StatusCode::SERVICE_UNAVAILABLE);
    }
}
