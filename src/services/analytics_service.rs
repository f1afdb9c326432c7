use std::collections::HashSet;

use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};
use serde::Serialize;
use tracing::info;

use crate::database::entities::{activities, analytics, iaps, users_activities};
use crate::errors::{CoreError, CoreResult, IapError};
use crate::services::{AuthorizationService, ValidationService};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityAnalytics {
    pub activity_id: i32,
    pub name: String,
    pub analytics: Vec<analytics::Model>,
}

/// Analytics of the plan's activities that the viewer is linked to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IapAnalytics {
    pub iap_id: i32,
    pub iap_name: String,
    pub activities: Vec<ActivityAnalytics>,
}

#[derive(Clone)]
pub struct AnalyticsService {
    db: DatabaseConnection,
    authz: AuthorizationService,
}

impl AnalyticsService {
    pub fn new(db: DatabaseConnection) -> Self {
        let authz = AuthorizationService::new(db.clone());
        Self { db, authz }
    }

    /// Add a metric to an activity; score starts at 0
    pub async fn create(&self, user_id: i32, activity_id: i32, name: &str) -> CoreResult<analytics::Model> {
        activities::Entity::find_by_id(activity_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("Activity", activity_id))?;
        self.authz.require_activity_owner(user_id, activity_id).await?;

        let name = ValidationService::validate_name("Analytics", name)?;
        let taken = analytics::Entity::find()
            .filter(analytics::Column::ActivityId.eq(activity_id))
            .filter(analytics::Column::Name.eq(name.as_str()))
            .one(&self.db)
            .await?
            .is_some();
        if taken {
            return Err(IapError::DuplicateAnalytics(name).into());
        }

        let row = analytics::ActiveModel {
            id: ActiveValue::NotSet,
            activity_id: Set(activity_id),
            name: Set(name.clone()),
            score: Set(0),
        }
        .insert(&self.db)
        .await
        .map_err(|err| match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => IapError::DuplicateAnalytics(name).into(),
            _ => CoreError::from(err),
        })?;

        info!("Created analytics {} on activity {}", row.id, activity_id);
        Ok(row)
    }

    pub async fn for_activity(&self, activity_id: i32) -> CoreResult<Vec<analytics::Model>> {
        Ok(analytics::Entity::find()
            .filter(analytics::Column::ActivityId.eq(activity_id))
            .order_by_asc(analytics::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn for_iap(&self, user_id: i32, iap_id: i32) -> CoreResult<IapAnalytics> {
        let iap = iaps::Entity::find_by_id(iap_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("IAP", iap_id))?;
        self.authz.require_iap_access(user_id, iap_id).await?;

        let node_ids = iap
            .activity_ids()
            .map_err(|e| IapError::InvalidGraph(format!("nodes: {}", e)))?;

        let linked: HashSet<i32> = users_activities::Entity::find()
            .filter(users_activities::Column::UsersId.eq(user_id))
            .filter(users_activities::Column::ActivityId.is_in(node_ids.clone()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|link| link.activity_id)
            .collect();

        let visible: Vec<i32> = node_ids.into_iter().filter(|id| linked.contains(id)).collect();

        let activity_rows = activities::Entity::find()
            .filter(activities::Column::Id.is_in(visible.clone()))
            .all(&self.db)
            .await?;
        let metrics = analytics::Entity::find()
            .filter(analytics::Column::ActivityId.is_in(visible.clone()))
            .order_by_asc(analytics::Column::Id)
            .all(&self.db)
            .await?;

        let mut activities = Vec::with_capacity(visible.len());
        for activity_id in visible {
            if let Some(activity) = activity_rows.iter().find(|a| a.id == activity_id) {
                activities.push(ActivityAnalytics {
                    activity_id,
                    name: activity.name.clone(),
                    analytics: metrics
                        .iter()
                        .filter(|m| m.activity_id == activity_id)
                        .cloned()
                        .collect(),
                });
            }
        }

        Ok(IapAnalytics {
            iap_id: iap.id,
            iap_name: iap.name,
            activities,
        })
    }

    /// Set a metric's score; the user must be linked to its activity
    pub async fn set_score(&self, user_id: i32, analytics_id: i32, score: i32) -> CoreResult<analytics::Model> {
        let row = analytics::Entity::find_by_id(analytics_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("Analytics", analytics_id))?;
        self.authz.require_activity_access(user_id, row.activity_id).await?;
        let score = ValidationService::validate_score(score)?;

        let mut active: analytics::ActiveModel = row.into();
        active.score = Set(score);
        Ok(active.update(&self.db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_utils::{insert_user, setup_test_db};
    use crate::errors::CoreErrorKind;
    use crate::services::{ActivityInput, ActivityService, IapInput, IapService};
    use serde_json::json;

    async fn activity(db: &DatabaseConnection, user_id: i32, name: &str) -> activities::Model {
        ActivityService::new(db.clone())
            .create(
                user_id,
                ActivityInput {
                    name: Some(name.to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_requires_owner() {
        let db = setup_test_db().await;
        let owner = insert_user(&db, "Author", "author@example.com").await;
        let other = insert_user(&db, "Other", "other@example.com").await;
        let quiz = activity(&db, owner.id, "Quiz").await;
        let service = AnalyticsService::new(db);

        let row = service.create(owner.id, quiz.id, "Correct answers").await.unwrap();
        assert_eq!(row.score, 0);
        assert_eq!(service.for_activity(quiz.id).await.unwrap(), vec![row]);

        let err = service.create(other.id, quiz.id, "Mine").await.unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Forbidden);

        let err = service.create(owner.id, 404, "Ghost").await.unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_name_on_activity() {
        let db = setup_test_db().await;
        let owner = insert_user(&db, "Author", "author@example.com").await;
        let quiz = activity(&db, owner.id, "Quiz").await;
        let survey = activity(&db, owner.id, "Survey").await;
        let service = AnalyticsService::new(db.clone());

        service.create(owner.id, quiz.id, "Correct").await.unwrap();
        let err = service.create(owner.id, quiz.id, "Correct").await.unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Validation);
        assert_eq!(err.code(), Some("DUPLICATE_ANALYTICS"));

        // The same name on another activity is fine
        service.create(owner.id, survey.id, "Correct").await.unwrap();

        // The unique index backs the check for writes that skip it
        let raw = analytics::ActiveModel {
            id: ActiveValue::NotSet,
            activity_id: Set(quiz.id),
            name: Set("Correct".to_string()),
            score: Set(0),
        }
        .insert(&db)
        .await;
        assert!(raw.is_err());
        assert_eq!(service.for_activity(quiz.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_set_score_bounds_and_access() {
        let db = setup_test_db().await;
        let owner = insert_user(&db, "Author", "author@example.com").await;
        let other = insert_user(&db, "Other", "other@example.com").await;
        let quiz = activity(&db, owner.id, "Quiz").await;
        let service = AnalyticsService::new(db);
        let row = service.create(owner.id, quiz.id, "Correct").await.unwrap();

        assert_eq!(service.set_score(owner.id, row.id, 55).await.unwrap().score, 55);

        let err = service.set_score(owner.id, row.id, 150).await.unwrap_err();
        assert_eq!(err.message(), "Score must be between 0 and 100");

        let err = service.set_score(other.id, row.id, 10).await.unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_for_iap_lists_linked_activities() {
        let db = setup_test_db().await;
        let owner = insert_user(&db, "Author", "author@example.com").await;
        let other = insert_user(&db, "Other", "other@example.com").await;
        let quiz = activity(&db, owner.id, "Quiz").await;
        let foreign = activity(&db, other.id, "Foreign").await;
        let service = AnalyticsService::new(db.clone());
        service.create(owner.id, quiz.id, "Correct").await.unwrap();
        service.create(other.id, foreign.id, "Clicks").await.unwrap();

        let iap = IapService::new(db.clone())
            .create(
                owner.id,
                IapInput {
                    name: Some("Course".to_string()),
                    nodes: Some(json!([{"id": quiz.id}, {"id": foreign.id}])),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let report = service.for_iap(owner.id, iap.id).await.unwrap();
        assert_eq!(report.iap_name, "Course");
        assert_eq!(report.activities.len(), 1);
        assert_eq!(report.activities[0].activity_id, quiz.id);
        assert_eq!(report.activities[0].analytics[0].name, "Correct");

        let err = service.for_iap(other.id, iap.id).await.unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Forbidden);

        let err = service.for_iap(owner.id, 404).await.unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::NotFound);
    }
}
