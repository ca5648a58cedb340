use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::media::ImageError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub code: &'static str,
    pub message: String,
}

/// Field-keyed set of validation failures, collected rather than short-circuited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<FieldError>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, code: &'static str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(FieldError {
            code,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn codes(&self, field: &str) -> Vec<&'static str> {
        self.0
            .get(field)
            .map(|errors| errors.iter().map(|e| e.code).collect())
            .unwrap_or_default()
    }

    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    Validation(ValidationErrors),
    MalformedPayload(String),
    InvalidCredentials,
    SelfFollow,
    Unauthorized,
    Forbidden,
    NotFound,
    AlreadyExists,
    RelationNotFound,
    Timeout,
    Database(sqlx::Error),
    Template(askama::Error),
    Session(tower_sessions::session::Error),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<ValidationErrors>,
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::MalformedPayload(_) => "malformed_payload",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::SelfFollow => "self_follow",
            AppError::Unauthorized => "unauthorized",
            AppError::Forbidden => "forbidden",
            AppError::NotFound => "not_found",
            AppError::AlreadyExists => "already_exists",
            AppError::RelationNotFound => "relation_not_found",
            AppError::Timeout => "timeout",
            AppError::Database(_)
            | AppError::Template(_)
            | AppError::Session(_)
            | AppError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::MalformedPayload(_)
            | AppError::InvalidCredentials
            | AppError::SelfFollow => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::AlreadyExists | AppError::RelationNotFound => StatusCode::CONFLICT,
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::Database(_)
            | AppError::Template(_)
            | AppError::Session(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Validation(_) => "Request failed validation".to_string(),
            AppError::MalformedPayload(detail) => format!("Malformed payload: {detail}"),
            AppError::InvalidCredentials => "Invalid email or password".to_string(),
            AppError::SelfFollow => "You cannot subscribe to yourself".to_string(),
            AppError::Unauthorized => "Authentication credentials were not provided".to_string(),
            AppError::Forbidden => "You do not have permission to perform this action".to_string(),
            AppError::NotFound => "Not found".to_string(),
            AppError::AlreadyExists => "Relation already exists".to_string(),
            AppError::RelationNotFound => "Relation does not exist".to_string(),
            AppError::Timeout => "Request took too long to complete".to_string(),
            AppError::Database(_)
            | AppError::Template(_)
            | AppError::Session(_)
            | AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Database(e) => tracing::error!("Database error: {e}"),
            AppError::Template(e) => tracing::error!("Template error: {e}"),
            AppError::Session(e) => tracing::error!("Session error: {e}"),
            AppError::Internal(e) => tracing::error!("Internal error: {e}"),
            _ => {}
        }

        let status = self.status();
        let body = ErrorBody {
            kind: self.kind(),
            message: self.message(),
            errors: match self {
                AppError::Validation(errors) => Some(errors),
                _ => None,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::AlreadyExists,
            sqlx::Error::RowNotFound => AppError::NotFound,
            _ => AppError::Database(e),
        }
    }
}

impl From<askama::Error> for AppError {
    fn from(e: askama::Error) -> Self {
        AppError::Template(e)
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(e: tower_sessions::session::Error) -> Self {
        AppError::Session(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::MalformedPayload(rejection.body_text())
    }
}

impl From<argon2::password_hash::Error> for AppError {
    fn from(e: argon2::password_hash::Error) -> Self {
        AppError::Internal(format!("password hashing failed: {e}"))
    }
}

impl From<ImageError> for AppError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::Io(e) => AppError::Internal(format!("image store: {e}")),
            invalid => {
                let mut errors = ValidationErrors::new();
                errors.add("image", "invalid_image", invalid.to_string());
                AppError::Validation(errors)
            }
        }
    }
}
