//! Caller-visible error kinds
//!
//! Each kind has a stable machine code and an HTTP status; the body is
//! `{"error": {"code": ..., "message": ...}}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use shared_types::ApiErrorBody;

use crate::audit_store::AuditError;
use crate::model_client::ModelError;
use crate::project_config::ConfigError;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    ConfigNotFound(String),
    #[error("{0}")]
    ConfigIncomplete(String),
    #[error("{0}")]
    ModelUnreachable(String),
    #[error("{0}")]
    ModelBadResponse(String),
    /// Reserved for audit writes made on the request path. Shadow notes are
    /// written by the head auditor, which logs its failures instead.
    #[error("{0}")]
    AuditWriteFailed(String),
    #[error("{0}")]
    Storage(String),
}

impl DispatchError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigIncomplete(_) => "CONFIG_INCOMPLETE",
            Self::ModelUnreachable(_) => "MODEL_UNREACHABLE",
            Self::ModelBadResponse(_) => "MODEL_BAD_RESPONSE",
            Self::AuditWriteFailed(_) => "AUDIT_WRITE_FAILED",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::ConfigNotFound(_) => StatusCode::NOT_FOUND,
            Self::ConfigIncomplete(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ModelUnreachable(_) | Self::ModelBadResponse(_) => StatusCode::BAD_GATEWAY,
            Self::AuditWriteFailed(_) | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_body(&self) -> ApiErrorBody {
        ApiErrorBody::new(self.code(), self.to_string())
    }
}

impl From<ConfigError> for DispatchError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::NotFound(_) => Self::ConfigNotFound(e.to_string()),
            ConfigError::Incomplete { .. } => Self::ConfigIncomplete(e.to_string()),
            ConfigError::Storage(_) => Self::Storage(e.to_string()),
        }
    }
}

impl From<ModelError> for DispatchError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Unreachable { .. } => Self::ModelUnreachable(e.to_string()),
            ModelError::BadResponse { .. } => Self::ModelBadResponse(e.to_string()),
        }
    }
}

impl From<AuditError> for DispatchError {
    fn from(e: AuditError) -> Self {
        match e {
            AuditError::WriteFailed(_) => Self::AuditWriteFailed(e.to_string()),
            AuditError::ReadFailed(_) => Self::Storage(e.to_string()),
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_body())).into_response()
    }
}
