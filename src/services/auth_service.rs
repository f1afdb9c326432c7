use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tracing::debug;
use uuid::Uuid;

use crate::config::{AuthSettings, MAX_SESSION_TTL_HOURS};
use crate::database::entities::user_sessions;
use crate::errors::{AuthError, AuthResult, CoreResult};

pub const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_EMAIL_LENGTH: usize = 254;
const MAX_NAME_LENGTH: usize = 100;

/// Password hashing, credential policy and session bookkeeping
#[derive(Clone)]
pub struct AuthService {
    db: DatabaseConnection,
    settings: AuthSettings,
}

impl AuthService {
    pub fn new(db: DatabaseConnection, settings: AuthSettings) -> Self {
        Self { db, settings }
    }

    /// Check the password policy, then hash with the configured bcrypt cost
    pub fn hash_password(&self, password: &str) -> AuthResult<String> {
        Self::validate_password(password)?;
        hash(password, self.settings.bcrypt_cost).map_err(|e| AuthError::Hashing(e.to_string()))
    }

    /// Verify a password against a hash
    pub fn verify_password(password: &str, hash: &str) -> AuthResult<bool> {
        verify(password, hash).map_err(|e| AuthError::Hashing(e.to_string()))
    }

    pub fn validate_password(password: &str) -> AuthResult<()> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }
        Ok(())
    }

    /// Generate a secure session ID
    pub fn generate_session_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Expiry `ttl_hours` from now, clamped to between one hour and one year
    pub fn calculate_session_expiry(ttl_hours: i64) -> chrono::DateTime<Utc> {
        Utc::now() + Duration::hours(ttl_hours.clamp(1, MAX_SESSION_TTL_HOURS))
    }

    /// Validate email format
    pub fn validate_email(email: &str) -> AuthResult<String> {
        let email = email.trim();

        if email.is_empty() {
            return Err(AuthError::InvalidEmail("email cannot be empty".to_string()));
        }

        if email.len() > MAX_EMAIL_LENGTH {
            return Err(AuthError::InvalidEmail("email is too long".to_string()));
        }

        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() != 2 {
            return Err(AuthError::InvalidEmail(
                "must contain exactly one @".to_string(),
            ));
        }

        let (local_part, domain_part) = (parts[0], parts[1]);

        if local_part.is_empty() {
            return Err(AuthError::InvalidEmail(
                "local part cannot be empty".to_string(),
            ));
        }

        if !domain_part.contains('.') {
            return Err(AuthError::InvalidEmail(
                "domain must contain a dot".to_string(),
            ));
        }

        if domain_part.starts_with('.') || domain_part.ends_with('.') {
            return Err(AuthError::InvalidEmail(
                "domain cannot start or end with a dot".to_string(),
            ));
        }

        if email.chars().any(char::is_whitespace) {
            return Err(AuthError::InvalidEmail(
                "email cannot contain whitespace".to_string(),
            ));
        }

        Ok(email.to_lowercase())
    }

    pub fn validate_name(name: &str) -> AuthResult<String> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(AuthError::InvalidName("name cannot be empty".to_string()));
        }

        if trimmed.chars().count() > MAX_NAME_LENGTH {
            return Err(AuthError::InvalidName(format!(
                "name is too long (max {} characters)",
                MAX_NAME_LENGTH
            )));
        }

        Ok(trimmed.to_string())
    }

    /// Open a new session for the user
    pub async fn create_session(&self, user_id: i32) -> CoreResult<user_sessions::Model> {
        let expires_at = Self::calculate_session_expiry(self.settings.session_ttl_hours);
        let session =
            user_sessions::ActiveModel::new(Self::generate_session_id(), user_id, expires_at)
                .insert(&self.db)
                .await?;

        debug!("Opened session {} for user {}", session.id, user_id);
        Ok(session)
    }

    /// Deactivate a session; unknown tokens are an error.
    pub async fn end_session(&self, session_id: &str) -> CoreResult<()> {
        let session = user_sessions::Entity::find()
            .filter(user_sessions::Column::SessionId.eq(session_id))
            .filter(user_sessions::Column::IsActive.eq(true))
            .one(&self.db)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        let active: user_sessions::ActiveModel = session.into();
        active.deactivate().update(&self.db).await?;

        Ok(())
    }
}
