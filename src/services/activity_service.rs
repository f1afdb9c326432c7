use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::database::entities::{activities, analytics, objective_analytics, users_activities};
use crate::errors::{CoreError, CoreResult, IapError};
use crate::services::{AuthorizationService, ValidationService};

/// Fields accepted when creating or updating an activity
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityInput {
    pub name: Option<String>,
    pub properties: Option<Value>,
    pub config_url: Option<String>,
    pub json_params: Option<String>,
    pub user_url: Option<String>,
    pub analytics_url: Option<String>,
}

/// Query filters for listing activities; all given filters must match
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityFilter {
    #[serde(default)]
    pub all: bool,
    pub name: Option<String>,
    pub user_id: Option<i32>,
    #[serde(default)]
    pub owner: bool,
    #[serde(default)]
    pub deployed: bool,
}

#[derive(Clone)]
pub struct ActivityService {
    db: DatabaseConnection,
    authz: AuthorizationService,
}

impl ActivityService {
    pub fn new(db: DatabaseConnection) -> Self {
        let authz = AuthorizationService::new(db.clone());
        Self { db, authz }
    }

    /// Create an activity owned by `user_id`
    pub async fn create(&self, user_id: i32, input: ActivityInput) -> CoreResult<activities::Model> {
        let name = ValidationService::validate_name("Activity", input.name.as_deref().unwrap_or(""))?;
        let properties = ValidationService::validate_properties(input.properties)?;
        let now = Utc::now();

        let txn = self.db.begin().await?;

        let activity = activities::ActiveModel {
            id: ActiveValue::NotSet,
            name: Set(name),
            properties: Set(properties),
            config_url: Set(ValidationService::normalize_optional(input.config_url)),
            json_params: Set(ValidationService::normalize_optional(input.json_params)),
            user_url: Set(ValidationService::normalize_optional(input.user_url)),
            analytics_url: Set(ValidationService::normalize_optional(input.analytics_url)),
            is_deployed: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        users_activities::Entity::insert(users_activities::ActiveModel::link(
            user_id,
            activity.id,
            true,
        ))
        .exec_without_returning(&txn)
        .await?;

        txn.commit().await?;

        info!("Created activity {} for user {}", activity.id, user_id);
        Ok(activity)
    }

    pub async fn get(&self, id: i32) -> CoreResult<activities::Model> {
        activities::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("Activity", id))
    }

    pub async fn list(&self, filter: &ActivityFilter) -> CoreResult<Vec<activities::Model>> {
        let mut query = activities::Entity::find().order_by_asc(activities::Column::Id);

        if filter.all {
            return Ok(query.all(&self.db).await?);
        }

        if let Some(user_id) = filter.user_id {
            let mut links = users_activities::Entity::find()
                .select_only()
                .column(users_activities::Column::ActivityId)
                .filter(users_activities::Column::UsersId.eq(user_id));
            if filter.owner {
                links = links.filter(users_activities::Column::IsOwner.eq(true));
            }
            let ids: Vec<i32> = links.into_tuple().all(&self.db).await?;
            query = query.filter(activities::Column::Id.is_in(ids));
        }

        if filter.deployed {
            query = query.filter(activities::Column::IsDeployed.eq(true));
        }

        if let Some(name) = filter.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            let pattern = format!("%{}%", name.to_lowercase());
            query = query.filter(
                Expr::expr(Func::lower(Expr::col((
                    activities::Entity,
                    activities::Column::Name,
                ))))
                .like(pattern),
            );
        }

        Ok(query.all(&self.db).await?)
    }

    /// Update the given fields; owner only
    pub async fn update(
        &self,
        user_id: i32,
        id: i32,
        input: ActivityInput,
    ) -> CoreResult<activities::Model> {
        let activity = self.get(id).await?;
        self.authz.require_activity_owner(user_id, id).await?;

        let mut active: activities::ActiveModel = activity.into();

        if let Some(name) = input.name.as_deref() {
            active.name = Set(ValidationService::validate_name("Activity", name)?);
        }
        if input.properties.is_some() {
            active.properties = Set(ValidationService::validate_properties(input.properties)?);
        }
        if input.config_url.is_some() {
            active.config_url = Set(ValidationService::normalize_optional(input.config_url));
        }
        if input.json_params.is_some() {
            active.json_params = Set(ValidationService::normalize_optional(input.json_params));
        }
        if input.user_url.is_some() {
            active.user_url = Set(ValidationService::normalize_optional(input.user_url));
        }
        if input.analytics_url.is_some() {
            active.analytics_url = Set(ValidationService::normalize_optional(input.analytics_url));
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&self.db).await?)
    }

    /// Delete an activity together with its analytics and links; owner only
    pub async fn remove(&self, user_id: i32, id: i32) -> CoreResult<()> {
        self.get(id).await?;
        self.authz.require_activity_owner(user_id, id).await?;

        let txn = self.db.begin().await?;
        delete_activity_cascade(&txn, id).await?;
        txn.commit().await?;

        info!("Deleted activity {} (user {})", id, user_id);
        Ok(())
    }

    pub async fn deploy(&self, user_id: i32, id: i32) -> CoreResult<activities::Model> {
        let activity = self.get(id).await?;
        self.authz.require_activity_owner(user_id, id).await?;

        if activity.is_deployed {
            return Err(IapError::ActivityAlreadyDeployed.into());
        }

        let mut active: activities::ActiveModel = activity.into();
        active.is_deployed = Set(true);
        active.updated_at = Set(Utc::now());
        let activity = active.update(&self.db).await?;

        info!("Deployed activity {}", id);
        Ok(activity)
    }

    /// Link an existing activity to the user as a non-owner
    pub async fn add_to_user(
        &self,
        user_id: i32,
        id: i32,
    ) -> CoreResult<users_activities::Model> {
        self.get(id).await?;

        match self.authz.activity_link(user_id, id).await? {
            Some(link) if link.is_owner => Err(IapError::AlreadyOwner("activity").into()),
            Some(_) => Err(IapError::AlreadyAdded("Activity").into()),
            None => {
                users_activities::Entity::insert(users_activities::ActiveModel::link(
                    user_id, id, false,
                ))
                .exec_without_returning(&self.db)
                .await?;

                Ok(users_activities::Model {
                    users_id: user_id,
                    activity_id: id,
                    is_owner: false,
                })
            }
        }
    }
}

/// Delete an activity and every row that references it.
pub async fn delete_activity_cascade<C: ConnectionTrait>(
    conn: &C,
    activity_id: i32,
) -> Result<(), DbErr> {
    let analytics_ids: Vec<i32> = analytics::Entity::find()
        .select_only()
        .column(analytics::Column::Id)
        .filter(analytics::Column::ActivityId.eq(activity_id))
        .into_tuple()
        .all(conn)
        .await?;

    if !analytics_ids.is_empty() {
        objective_analytics::Entity::delete_many()
            .filter(objective_analytics::Column::AnalyticsId.is_in(analytics_ids))
            .exec(conn)
            .await?;
    }

    analytics::Entity::delete_many()
        .filter(analytics::Column::ActivityId.eq(activity_id))
        .exec(conn)
        .await?;

    users_activities::Entity::delete_many()
        .filter(users_activities::Column::ActivityId.eq(activity_id))
        .exec(conn)
        .await?;

    activities::Entity::delete_by_id(activity_id).exec(conn).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_utils::{insert_user, setup_test_db};
    use crate::errors::CoreErrorKind;
    use serde_json::json;

    fn input(name: &str) -> ActivityInput {
        ActivityInput {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let db = setup_test_db().await;
        let user = insert_user(&db, "Ana", "ana@example.com").await;
        let service = ActivityService::new(db.clone());

        let created = service
            .create(
                user.id,
                ActivityInput {
                    name: Some(" Quiz ".to_string()),
                    properties: Some(json!({"difficulty": "easy"})),
                    config_url: Some("https://act.example/config".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let fetched = service.get(created.id).await.unwrap();
        assert_eq!(fetched.name, "Quiz");
        assert_eq!(fetched.properties, json!({"difficulty": "easy"}));
        assert_eq!(fetched.config_url.as_deref(), Some("https://act.example/config"));
        assert!(!fetched.is_deployed);

        let link = users_activities::Entity::find_by_id((user.id, created.id))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert!(link.is_owner);
    }

    #[tokio::test]
    async fn test_name_required() {
        let db = setup_test_db().await;
        let user = insert_user(&db, "Ana", "ana@example.com").await;
        let service = ActivityService::new(db);

        let err = service.create(user.id, ActivityInput::default()).await.unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = setup_test_db().await;
        let ana = insert_user(&db, "Ana", "ana@example.com").await;
        let rui = insert_user(&db, "Rui", "rui@example.com").await;
        let service = ActivityService::new(db);

        let quiz = service.create(ana.id, input("Math Quiz")).await.unwrap();
        let video = service.create(rui.id, input("Intro Video")).await.unwrap();
        service.add_to_user(ana.id, video.id).await.unwrap();
        service.deploy(rui.id, video.id).await.unwrap();

        let linked = service
            .list(&ActivityFilter {
                user_id: Some(ana.id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(linked.len(), 2);

        let owned = service
            .list(&ActivityFilter {
                user_id: Some(ana.id),
                owner: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(owned.iter().map(|a| a.id).collect::<Vec<_>>(), vec![quiz.id]);

        let deployed = service
            .list(&ActivityFilter {
                deployed: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(deployed.iter().map(|a| a.id).collect::<Vec<_>>(), vec![video.id]);

        let by_name = service
            .list(&ActivityFilter {
                name: Some("quiz".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].id, quiz.id);

        let everything = service
            .list(&ActivityFilter {
                all: true,
                name: Some("nothing matches".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(everything.len(), 2);
    }

    #[tokio::test]
    async fn test_non_owner_cannot_update_or_delete() {
        let db = setup_test_db().await;
        let ana = insert_user(&db, "Ana", "ana@example.com").await;
        let rui = insert_user(&db, "Rui", "rui@example.com").await;
        let service = ActivityService::new(db);

        let quiz = service.create(ana.id, input("Quiz")).await.unwrap();
        service.add_to_user(rui.id, quiz.id).await.unwrap();

        let err = service.update(rui.id, quiz.id, input("Hijacked")).await.unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Forbidden);

        let err = service.remove(rui.id, quiz.id).await.unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Forbidden);

        let err = service.remove(ana.id, 9999).await.unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::NotFound);

        let updated = service
            .update(
                ana.id,
                quiz.id,
                ActivityInput {
                    user_url: Some("https://act.example/play".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Quiz");
        assert_eq!(updated.user_url.as_deref(), Some("https://act.example/play"));
    }

    #[tokio::test]
    async fn test_deploy_twice_rejected() {
        let db = setup_test_db().await;
        let ana = insert_user(&db, "Ana", "ana@example.com").await;
        let service = ActivityService::new(db);

        let quiz = service.create(ana.id, input("Quiz")).await.unwrap();
        assert!(service.deploy(ana.id, quiz.id).await.unwrap().is_deployed);

        let err = service.deploy(ana.id, quiz.id).await.unwrap_err();
        assert_eq!(err.message(), "Activity is already deployed");
    }

    #[tokio::test]
    async fn test_add_to_user_rules() {
        let db = setup_test_db().await;
        let ana = insert_user(&db, "Ana", "ana@example.com").await;
        let rui = insert_user(&db, "Rui", "rui@example.com").await;
        let service = ActivityService::new(db);

        let quiz = service.create(ana.id, input("Quiz")).await.unwrap();

        let err = service.add_to_user(ana.id, quiz.id).await.unwrap_err();
        assert_eq!(err.message(), "User is already the owner of this activity");

        let link = service.add_to_user(rui.id, quiz.id).await.unwrap();
        assert!(!link.is_owner);

        let err = service.add_to_user(rui.id, quiz.id).await.unwrap_err();
        assert_eq!(err.message(), "Activity already added to user");

        let err = service.add_to_user(rui.id, 4242).await.unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_remove_cascades_analytics_and_links() {
        let db = setup_test_db().await;
        let ana = insert_user(&db, "Ana", "ana@example.com").await;
        let rui = insert_user(&db, "Rui", "rui@example.com").await;
        let service = ActivityService::new(db.clone());

        let quiz = service.create(ana.id, input("Quiz")).await.unwrap();
        service.add_to_user(rui.id, quiz.id).await.unwrap();
        analytics::ActiveModel {
            id: ActiveValue::NotSet,
            activity_id: Set(quiz.id),
            name: Set("Correct answers".to_string()),
            score: Set(10),
        }
        .insert(&db)
        .await
        .unwrap();

        service.remove(ana.id, quiz.id).await.unwrap();

        assert!(activities::Entity::find_by_id(quiz.id).one(&db).await.unwrap().is_none());
        assert!(analytics::Entity::find().all(&db).await.unwrap().is_empty());
        assert!(users_activities::Entity::find().all(&db).await.unwrap().is_empty());
    }
}
