use crate::config::ConfigError;
use crate::scan::{PipelineError, SeedImportError, SourceError};
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

/// Process-level failure surfaced by the binaries.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Seed(SeedImportError),
    Source(SourceError),
    Pipeline(PipelineError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {err}"),
            AppError::Telemetry(err) => write!(f, "telemetry error: {err}"),
            AppError::Io(err) => write!(f, "io error: {err}"),
            AppError::Seed(err) => write!(f, "seed import error: {err}"),
            AppError::Source(err) => write!(f, "provider setup error: {err}"),
            AppError::Pipeline(err) => write!(f, "scan error: {err}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Seed(err) => Some(err),
            AppError::Source(err) => Some(err),
            AppError::Pipeline(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Pipeline(PipelineError::DataUnresolved { .. }) => StatusCode::NOT_FOUND,
            AppError::Pipeline(PipelineError::CategoryNotFound(_))
            | AppError::Pipeline(PipelineError::RuleNotFound(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Seed(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Source(_)
            | AppError::Pipeline(PipelineError::Repository(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({ "error": self.to_string() }));
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

impl From<SeedImportError> for AppError {
    fn from(value: SeedImportError) -> Self {
        Self::Seed(value)
    }
}

impl From<SourceError> for AppError {
    fn from(value: SourceError) -> Self {
        Self::Source(value)
    }
}

impl From<PipelineError> for AppError {
    fn from(value: PipelineError) -> Self {
        Self::Pipeline(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{CategoryCode, ProductCode, RepositoryError};

    #[test]
    fn pipeline_errors_map_to_client_statuses() {
        let unresolved = AppError::from(PipelineError::DataUnresolved {
            code: ProductCode("000".into()),
        });
        assert_eq!(unresolved.into_response().status(), StatusCode::NOT_FOUND);

        let missing = AppError::from(PipelineError::RuleNotFound(CategoryCode("SNK".into())));
        assert_eq!(
            missing.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );

        let storage = AppError::from(PipelineError::Repository(RepositoryError::Unavailable(
            "disk".into(),
        )));
        assert_eq!(
            storage.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
