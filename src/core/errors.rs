use http::StatusCode;
use spin_sdk::http::Response;
use thiserror::Error;

use crate::core::db::{Constraint, StoreError};

pub const DUPLICATE_USER: &str = "User with this email or username already exists";
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const CANNOT_FOLLOW_SELF: &str = "You cannot follow yourself";
pub const ALREADY_FOLLOWING: &str = "You are already following this user";
pub const NOT_FOLLOWING: &str = "You are not following this user";
pub const EMPTY_POST: &str = "A post must have either text or a media URL.";
pub const INVALID_BODY: &str = "Invalid request body";

pub const FOLLOW_FAILED: &str = "An error occurred while trying to follow.";
pub const POST_FAILED: &str = "An error occurred while creating the post.";
pub const REGISTER_FAILED: &str = "An error occurred while registering the user.";
pub const UNEXPECTED: &str = "An unexpected error occurred.";

/// Which unique constraint surfaces as which caller-facing message.
const CONFLICTS: &[(Constraint, &str)] = &[
    (Constraint::UserUsername, DUPLICATE_USER),
    (Constraint::UserEmail, DUPLICATE_USER),
    (Constraint::RelationPair, ALREADY_FOLLOWING),
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    InternalError(String),
}

impl ApiError {
    pub fn bad_request(msg: &str) -> Self {
        ApiError::BadRequest(msg.to_string())
    }

    pub fn unauthenticated(msg: &str) -> Self {
        ApiError::Unauthenticated(msg.to_string())
    }

    pub fn internal(msg: &str) -> Self {
        ApiError::InternalError(msg.to_string())
    }

    /// Translates a failed write. Unique violations listed in the conflict
    /// table become `BadRequest`; everything else becomes `InternalError`
    /// carrying `fallback`.
    pub fn from_store(err: StoreError, fallback: &str) -> Self {
        if let StoreError::UniqueViolation(constraint) = &err {
            if let Some((_, msg)) = CONFLICTS.iter().find(|(c, _)| c == constraint) {
                return ApiError::bad_request(msg);
            }
        }
        tracing::error!(error = %err, "store failure");
        ApiError::internal(fallback)
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthenticated(_) => "UNAUTHENTICATED",
            ApiError::InternalError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthenticated(msg)
            | ApiError::InternalError(msg) => msg,
        }
    }
}

/// Reads that fail outside any operation-specific write.
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::from_store(err, UNEXPECTED)
    }
}

pub fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    let body = serde_json::json!({
        "error": { "code": code, "message": message }
    });
    Response::builder()
        .status(status.as_u16())
        .header("Content-Type", "application/json")
        .body(body.to_string())
        .build()
}

impl From<ApiError> for Response {
    fn from(err: ApiError) -> Self {
        error_response(err.status(), err.code(), err.message())
    }
}
