use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Auth errors
/// - E2xxx: Staff profile errors
/// - E3xxx: Blog errors
/// - E4xxx: Media errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    RateLimited,
    BadRequest,
    PayloadTooLarge,

    // Auth (E1xxx)
    TokenExpired,
    TokenInvalid,
    OtpInvalid,
    OtpExpired,
    OtpAttemptsExceeded,
    OtpCooldown,
    OtpDeliveryFailed,
    AccessDenied,

    // Profiles (E2xxx)
    ProfileNotFound,
    EmailAlreadyExists,
    InvalidRole,
    CannotDeleteSelf,

    // Blogs (E3xxx)
    BlogNotFound,
    InvalidStatus,
    InvalidContentBlocks,

    // Media (E4xxx)
    UnsupportedMediaType,
    MediaTooLarge,
    TooManyFiles,
    MediaProcessingFailed,
    MediaUploadFailed,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::RateLimited => "E0006",
            Self::BadRequest => "E0007",
            Self::PayloadTooLarge => "E0008",

            // Auth
            Self::TokenExpired => "E1001",
            Self::TokenInvalid => "E1002",
            Self::OtpInvalid => "E1003",
            Self::OtpExpired => "E1004",
            Self::OtpAttemptsExceeded => "E1005",
            Self::OtpCooldown => "E1006",
            Self::OtpDeliveryFailed => "E1007",
            Self::AccessDenied => "E1008",

            // Profiles
            Self::ProfileNotFound => "E2001",
            Self::EmailAlreadyExists => "E2002",
            Self::InvalidRole => "E2003",
            Self::CannotDeleteSelf => "E2004",

            // Blogs
            Self::BlogNotFound => "E3001",
            Self::InvalidStatus => "E3002",
            Self::InvalidContentBlocks => "E3003",

            // Media
            Self::UnsupportedMediaType => "E4001",
            Self::MediaTooLarge => "E4002",
            Self::TooManyFiles => "E4003",
            Self::MediaProcessingFailed => "E4004",
            Self::MediaUploadFailed => "E4005",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError | Self::OtpDeliveryFailed | Self::MediaUploadFailed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::ValidationError | Self::BadRequest | Self::InvalidRole
            | Self::CannotDeleteSelf | Self::InvalidStatus | Self::InvalidContentBlocks
            | Self::UnsupportedMediaType | Self::MediaTooLarge | Self::TooManyFiles
            | Self::MediaProcessingFailed => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound | Self::ProfileNotFound | Self::BlogNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::TokenExpired | Self::TokenInvalid | Self::OtpInvalid
            | Self::OtpExpired | Self::OtpAttemptsExceeded => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::RateLimited | Self::OtpCooldown => StatusCode::TOO_MANY_REQUESTS,
            Self::EmailAlreadyExists => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn rate_limited() -> Self {
        Self::new(ErrorCode::RateLimited, "Too many requests. Please try again later.")
    }

    /// Status code the error renders with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Known { code, .. } => code.status_code(),
            AppError::Database(diesel::result::Error::NotFound) => StatusCode::NOT_FOUND,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                if status.is_server_error() {
                    tracing::error!(code = code.code(), error = %message, "request failed");
                }
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", "database error"),
                    ),
                }
            }
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
