//! Authentication and account error types
//!
//! Covers credential checks, session handling and the password/email policy
//! enforced when accounts are created or updated.
//!
//! # Examples
//!
//! ```rust
//! use invenira::errors::AuthError;
//!
//! let err = AuthError::WeakPassword("Password must be at least 8 characters".to_string());
//! assert_eq!(err.http_status_code(), 400);
//! ```

use thiserror::Error;

use super::{CoreError, CoreErrorKind};

/// Authentication and account errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// Wrong password for an existing account
    #[error("Invalid password")]
    InvalidPassword,

    /// No account with the given email or id
    #[error("User not found")]
    UserNotFound,

    /// Session token unknown or deactivated
    #[error("Invalid or expired session")]
    SessionNotFound,

    /// Session token past its expiry
    #[error("Session expired")]
    SessionExpired,

    /// No session token on a request that needs one
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Email failed format validation
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Name failed validation
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Email already registered
    #[error("Email already exists")]
    EmailExists,

    /// Password does not meet requirements
    #[error("{0}")]
    WeakPassword(String),

    /// Acting on another user's account
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Password hashing backend failed
    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

impl AuthError {
    /// Get HTTP status code for this error
    pub fn http_status_code(&self) -> u16 {
        match self {
            AuthError::SessionNotFound
            | AuthError::SessionExpired
            | AuthError::AuthenticationRequired => 401,
            AuthError::PermissionDenied(_) => 403,
            AuthError::UserNotFound => 404,
            AuthError::InvalidPassword
            | AuthError::InvalidEmail(_)
            | AuthError::InvalidName(_)
            | AuthError::EmailExists
            | AuthError::WeakPassword(_) => 400,
            AuthError::Hashing(_) => 500,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidPassword => "INVALID_PASSWORD",
            AuthError::UserNotFound => "USER_NOT_FOUND",
            AuthError::SessionNotFound => "SESSION_NOT_FOUND",
            AuthError::SessionExpired => "SESSION_EXPIRED",
            AuthError::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            AuthError::InvalidEmail(_) => "INVALID_EMAIL",
            AuthError::InvalidName(_) => "INVALID_NAME",
            AuthError::EmailExists => "EMAIL_EXISTS",
            AuthError::WeakPassword(_) => "WEAK_PASSWORD",
            AuthError::PermissionDenied(_) => "PERMISSION_DENIED",
            AuthError::Hashing(_) => "HASHING_FAILED",
        }
    }

    fn kind(&self) -> CoreErrorKind {
        match self.http_status_code() {
            400 => CoreErrorKind::Validation,
            401 => CoreErrorKind::Unauthorized,
            403 => CoreErrorKind::Forbidden,
            404 => CoreErrorKind::NotFound,
            _ => CoreErrorKind::Internal,
        }
    }
}

impl From<AuthError> for CoreError {
    fn from(err: AuthError) -> Self {
        CoreError::new(err.kind(), err.to_string()).with_code(err.error_code())
    }
}
