//! Typed errors and HTTP mapping.

use crate::validations::ValidationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Setup-time errors raised while parsing model schemas or initializing metas.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("model {model} has no primary key")]
    NoPrimaryKey { model: String },
    #[error("unknown model: {0}")]
    UnknownModel(String),
    #[error("model {model} field {field}: unknown type '{ty}'")]
    UnknownType { model: String, field: String, ty: String },
    #[error("model {model} field {field}: {reason}")]
    InvalidRelationship { model: String, field: String, reason: String },
    #[error("meta {model} no field: {segment}")]
    FieldNotFound { model: String, path: String, segment: String },
    #[error("meta {meta}: {reason}")]
    InvalidMeta { meta: String, reason: String },
    #[error("meta {meta}: no setter for field kind {kind}")]
    NoSetter { meta: String, kind: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("duplicate model: {0}")]
    DuplicateModel(String),
    #[error("duplicate field: model {model} field {field}")]
    DuplicateField { model: String, field: String },
    #[error("invalid primary key: model {model} field {field}")]
    InvalidPrimaryKey { model: String, field: String },
    #[error("environment: {key}: {reason}")]
    Env { key: &'static str, reason: String },
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// Coercion failure for a single submitted value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("'{0}' is not a number")]
    NotNumber(String),
    #[error("'{0}' is not a valid time")]
    InvalidTime(String),
    #[error("'{0}' is not a valid uuid")]
    InvalidUuid(String),
    #[error("scan: {0}")]
    Scan(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("permission denied")]
    PermissionDenied,
    #[error("record not found")]
    RecordNotFound,
    #[error("validation: {}", join_messages(.0))]
    Validation(Vec<ValidationError>),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("bad request: {0}")]
    BadRequest(String),
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Schema(_) => (StatusCode::INTERNAL_SERVER_ERROR, "schema_error"),
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::PermissionDenied => (StatusCode::FORBIDDEN, "permission_denied"),
            AppError::RecordNotFound => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::Codec(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Db(e) => {
                if let sqlx::Error::RowNotFound = e {
                    (StatusCode::NOT_FOUND, "not_found")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            }
            AppError::Serialization(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        };
        let details = match &self {
            AppError::Validation(errors) => serde_json::to_value(errors).ok(),
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}
