use crate::config::ConfigError;
use crate::providers::ProviderError;
use crate::telemetry::TelemetryError;
use crate::workflows::market::{InsightsError, QueryError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Provider(ProviderError),
    Query(QueryError),
    Insights(InsightsError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Query(_) => StatusCode::BAD_REQUEST,
            AppError::Insights(InsightsError::MissingCredentials) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Insights(InsightsError::SearchTimeout) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Insights(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to an end user.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Query(err) => err.user_message().to_string(),
            AppError::Insights(err) => err.user_message(),
            _ => "An internal server error occurred while fetching insights.".to_string(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Provider(err) => write!(f, "provider client error: {}", err),
            AppError::Query(err) => write!(f, "invalid query: {}", err),
            AppError::Insights(err) => write!(f, "insights error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Provider(err) => Some(err),
            AppError::Query(err) => Some(err),
            AppError::Insights(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.user_message() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<ProviderError> for AppError {
    fn from(value: ProviderError) -> Self {
        Self::Provider(value)
    }
}

impl From<QueryError> for AppError {
    fn from(value: QueryError) -> Self {
        Self::Query(value)
    }
}

impl From<InsightsError> for AppError {
    fn from(value: InsightsError) -> Self {
        Self::Insights(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_fatal_categories_to_status_codes() {
        assert_eq!(
            AppError::from(QueryError::MissingField("what")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(InsightsError::MissingCredentials).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::from(InsightsError::SearchTimeout).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            AppError::from(InsightsError::SearchStatus { status: 500 }).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn internal_errors_hide_details_from_users() {
        let error = AppError::from(ProviderError::Client("tls backend missing".into()));
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!error.user_message().contains("tls"));
    }
}
