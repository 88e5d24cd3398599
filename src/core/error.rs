use poem_openapi::Object;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::ValidationErrors;

#[derive(Object, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// Every failure a route can report. Store and I/O failures travel as
/// `anyhow::Error` and end up in `Unexpected`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed")]
    ValidationFailed(Vec<FieldError>),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("You do not have permission to perform this action")]
    Forbidden { required_permissions: Vec<String> },

    #[error("{0}")]
    InvalidRelationship(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: &str, message: &str) -> Self {
        AppError::ValidationFailed(vec![FieldError::new(field, message)])
    }

    pub fn forbidden(permission_name: &str) -> Self {
        AppError::Forbidden {
            required_permissions: vec![permission_name.to_string()],
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = vec![];
        for (field, errs) in errors.field_errors() {
            for err in errs {
                let message = match &err.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid", field),
                };
                fields.push(FieldError {
                    field: field.to_string(),
                    message,
                });
            }
        }
        // field_errors() is backed by a HashMap
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::ValidationFailed(fields)
    }
}

/// True when the error chain carries a Postgres unique-constraint violation.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .map(|e| e.is_unique_violation())
            .unwrap_or(false)
    })
}

/// Translate a store error into `Conflict` when it is a uniqueness
/// violation, keeping everything else unexpected.
pub fn conflict_or_unexpected(err: anyhow::Error, message: &str) -> AppError {
    if is_unique_violation(&err) {
        AppError::Conflict(message.to_string())
    } else {
        AppError::Unexpected(err)
    }
}
