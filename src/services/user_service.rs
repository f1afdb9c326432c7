use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use serde::Deserialize;
use tracing::info;

use crate::config::AuthSettings;
use crate::database::entities::{iap_ownership, scores, user_sessions, users, users_activities};
use crate::errors::{AuthError, CoreError, CoreResult};
use crate::services::activity_service::delete_activity_cascade;
use crate::services::iap_service::delete_iap_cascade;
use crate::services::{AuthService, AuthorizationService};

/// Partial account update; absent fields are left alone
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    db: DatabaseConnection,
    auth: AuthService,
}

impl UserService {
    pub fn new(db: DatabaseConnection, settings: AuthSettings) -> Self {
        let auth = AuthService::new(db.clone(), settings);
        Self { db, auth }
    }

    /// Register a new account
    pub async fn create(&self, name: &str, email: &str, password: &str) -> CoreResult<users::Model> {
        let name = AuthService::validate_name(name)?;
        let email = AuthService::validate_email(email)?;
        let password_hash = self.auth.hash_password(password)?;

        self.ensure_email_free(&email, None).await?;

        let user = users::ActiveModel::new(name, email, password_hash)
            .insert(&self.db)
            .await
            .map_err(email_conflict)?;

        info!("Created user {}", user.id);
        Ok(user)
    }

    /// Check credentials and open a session
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> CoreResult<(users::Model, user_sessions::Model)> {
        let email = email.trim().to_lowercase();
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.db)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !AuthService::verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidPassword.into());
        }

        let session = self.auth.create_session(user.id).await?;
        info!("User {} logged in", user.id);
        Ok((user, session))
    }

    pub async fn logout(&self, session_id: &str) -> CoreResult<()> {
        self.auth.end_session(session_id).await
    }

    pub async fn get(&self, id: i32) -> CoreResult<users::Model> {
        users::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("User", id))
    }

    pub async fn list(&self) -> CoreResult<Vec<users::Model>> {
        Ok(users::Entity::find()
            .order_by_asc(users::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Update the caller's own account
    pub async fn update(&self, actor_id: i32, id: i32, changes: UserUpdate) -> CoreResult<users::Model> {
        let user = self.get(id).await?;
        AuthorizationService::require_self(actor_id, id)?;

        let mut active: users::ActiveModel = user.into();

        if let Some(name) = changes.name.as_deref() {
            active.name = Set(AuthService::validate_name(name)?);
        }
        if let Some(email) = changes.email.as_deref() {
            let email = AuthService::validate_email(email)?;
            self.ensure_email_free(&email, Some(id)).await?;
            active.email = Set(email);
        }
        if let Some(password) = changes.password.as_deref() {
            active.password_hash = Set(self.auth.hash_password(password)?);
        }

        active
            .set_updated_at()
            .update(&self.db)
            .await
            .map_err(email_conflict)
    }

    /// Delete an account with everything it owns, in one transaction
    pub async fn remove(&self, actor_id: i32, id: i32) -> CoreResult<()> {
        self.get(id).await?;
        AuthorizationService::require_self(actor_id, id)?;

        let txn = self.db.begin().await?;

        let owned_iaps: Vec<i32> = iap_ownership::Entity::find()
            .select_only()
            .column(iap_ownership::Column::IapId)
            .filter(iap_ownership::Column::UsersId.eq(id))
            .filter(iap_ownership::Column::IsOwner.eq(true))
            .into_tuple()
            .all(&txn)
            .await?;
        for iap_id in &owned_iaps {
            delete_iap_cascade(&txn, *iap_id).await?;
        }
        iap_ownership::Entity::delete_many()
            .filter(iap_ownership::Column::UsersId.eq(id))
            .exec(&txn)
            .await?;

        let owned_activities: Vec<i32> = users_activities::Entity::find()
            .select_only()
            .column(users_activities::Column::ActivityId)
            .filter(users_activities::Column::UsersId.eq(id))
            .filter(users_activities::Column::IsOwner.eq(true))
            .into_tuple()
            .all(&txn)
            .await?;
        for activity_id in &owned_activities {
            delete_activity_cascade(&txn, *activity_id).await?;
        }
        users_activities::Entity::delete_many()
            .filter(users_activities::Column::UsersId.eq(id))
            .exec(&txn)
            .await?;

        scores::Entity::delete_many()
            .filter(scores::Column::UserId.eq(id))
            .exec(&txn)
            .await?;
        user_sessions::Entity::delete_many()
            .filter(user_sessions::Column::UserId.eq(id))
            .exec(&txn)
            .await?;
        users::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        info!(
            "Deleted user {} with {} IAPs and {} activities",
            id,
            owned_iaps.len(),
            owned_activities.len()
        );
        Ok(())
    }

    async fn ensure_email_free(&self, email: &str, except: Option<i32>) -> CoreResult<()> {
        let mut query = users::Entity::find().filter(users::Column::Email.eq(email));
        if let Some(id) = except {
            query = query.filter(users::Column::Id.ne(id));
        }
        if query.one(&self.db).await?.is_some() {
            return Err(AuthError::EmailExists.into());
        }
        Ok(())
    }
}

/// A write that lost the race on the unique email index reports the same
/// error as the up-front check.
fn email_conflict(err: DbErr) -> CoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AuthError::EmailExists.into(),
        _ => err.into(),
    }
}
