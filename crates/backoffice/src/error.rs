//! Unified error handling for the back office.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::{AnalysisError, DataSourceError};

/// Application-level error type for the back office.
#[derive(Debug, Error)]
pub enum AppError {
    /// The ERP data source failed.
    #[error("Data source error: {0}")]
    DataSource(#[from] DataSourceError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Validation(e) => Self::BadRequest(e.to_string()),
            AnalysisError::DataSource(e) => Self::DataSource(e),
            // Handlers answer an empty tree before converting
            AnalysisError::EmptyResult => Self::Internal(err.to_string()),
            AnalysisError::Internal(message) => Self::Internal(message),
        }
    }
}

/// JSON error body, also used for `analyzeError` stream events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::DataSource(_) => StatusCode::BAD_GATEWAY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to clients.
    ///
    /// Don't expose internal error details to clients.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "Internal server error".to_string(),
            Self::DataSource(_) => "ERP data source error".to_string(),
            Self::BadRequest(_) => self.to_string(),
        }
    }

    /// Log server errors and capture them with Sentry.
    pub fn report(&self) {
        if matches!(self, Self::DataSource(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Back-office request error"
            );
        }
    }

    /// The error as a JSON body.
    #[must_use]
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            status: self.status_code().as_u16(),
            message: self.public_message(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.report();
        (self.status_code(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use jewel_ops_core::FilterError;

    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            let response = err.into_response();
            response.status()
        }

        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::DataSource(DataSourceError::Unavailable(
                "test".to_string()
            ))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_analysis_errors_map_to_status() {
        let err = AppError::from(AnalysisError::Validation(FilterError::BlankDepartment));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.public_message().contains("department"));

        let err = AppError::from(AnalysisError::DataSource(DataSourceError::Query(
            "relation erp.sale_lines does not exist".to_string(),
        )));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(!err.public_message().contains("erp.sale_lines"));
    }

    #[test]
    fn test_empty_result_is_never_a_404() {
        let err = AppError::from(AnalysisError::EmptyResult);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body().message, "Internal server error");
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let body = AppError::Internal("join error: task panicked".to_string()).body();
        assert_eq!(body.status, 500);
        assert_eq!(body.message, "Internal server error");
    }
}
