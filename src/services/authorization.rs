use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tracing::warn;

use crate::database::entities::{iap_ownership, user_sessions, users, users_activities};
use crate::errors::{AuthError, CoreResult, IapError};

/// Resolves sessions to users and answers ownership questions
#[derive(Clone, Debug)]
pub struct AuthorizationService {
    db: DatabaseConnection,
}

impl AuthorizationService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Get user from session ID
    pub async fn get_user_from_session(&self, session_id: &str) -> CoreResult<users::Model> {
        let session = user_sessions::Entity::find()
            .filter(user_sessions::Column::SessionId.eq(session_id))
            .filter(user_sessions::Column::IsActive.eq(true))
            .one(&self.db)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        if session.is_expired() {
            return Err(AuthError::SessionExpired.into());
        }

        let user = users::Entity::find_by_id(session.user_id)
            .one(&self.db)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        Ok(user)
    }

    pub async fn iap_link(
        &self,
        user_id: i32,
        iap_id: i32,
    ) -> CoreResult<Option<iap_ownership::Model>> {
        Ok(iap_ownership::Entity::find_by_id((user_id, iap_id))
            .one(&self.db)
            .await?)
    }

    pub async fn activity_link(
        &self,
        user_id: i32,
        activity_id: i32,
    ) -> CoreResult<Option<users_activities::Model>> {
        Ok(users_activities::Entity::find_by_id((user_id, activity_id))
            .one(&self.db)
            .await?)
    }

    pub async fn require_iap_owner(&self, user_id: i32, iap_id: i32) -> CoreResult<()> {
        match self.iap_link(user_id, iap_id).await? {
            Some(link) if link.is_owner => Ok(()),
            _ => {
                warn!("User {} rejected as owner of IAP {}", user_id, iap_id);
                Err(IapError::NotIapOwner.into())
            }
        }
    }

    /// Owners and users who added the plan both have access
    pub async fn require_iap_access(&self, user_id: i32, iap_id: i32) -> CoreResult<()> {
        match self.iap_link(user_id, iap_id).await? {
            Some(_) => Ok(()),
            None => {
                warn!("User {} has no access to IAP {}", user_id, iap_id);
                Err(IapError::NoIapAccess.into())
            }
        }
    }

    pub async fn require_activity_owner(&self, user_id: i32, activity_id: i32) -> CoreResult<()> {
        match self.activity_link(user_id, activity_id).await? {
            Some(link) if link.is_owner => Ok(()),
            _ => {
                warn!("User {} rejected as owner of activity {}", user_id, activity_id);
                Err(IapError::NotActivityOwner.into())
            }
        }
    }

    pub async fn require_activity_access(&self, user_id: i32, activity_id: i32) -> CoreResult<()> {
        match self.activity_link(user_id, activity_id).await? {
            Some(_) => Ok(()),
            None => {
                warn!("User {} has no access to activity {}", user_id, activity_id);
                Err(IapError::NoActivityAccess.into())
            }
        }
    }

    /// Accounts can only be changed by their own session
    pub fn require_self(user_id: i32, target_id: i32) -> CoreResult<()> {
        if user_id == target_id {
            Ok(())
        } else {
            warn!("User {} tried to modify account {}", user_id, target_id);
            Err(AuthError::PermissionDenied("cannot modify another user".to_string()).into())
        }
    }
}
