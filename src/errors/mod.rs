//! Error types for the Invenira server
//!
//! - **CoreError**: the error every service returns; carries a kind that maps
//!   onto an HTTP status and renders as `{"error": ...}`
//! - **AuthError**: accounts, passwords and sessions
//! - **IapError**: graph validation, ownership and deployment rules
//!
//! Domain errors convert into `CoreError` with `?`.

pub mod auth;
pub mod core_error;
pub mod iap;

pub use auth::AuthError;
pub use core_error::{CoreError, CoreErrorKind};
pub use iap::IapError;

/// Result type alias used across services
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type alias for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
