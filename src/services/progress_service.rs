use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::database::entities::{
    activities, analytics, deployed_iap_activities, deployed_iaps, objective_analytics, objectives,
    scores,
};
use crate::errors::{CoreError, CoreResult, IapError};
use crate::services::{AuthorizationService, ValidationService};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressAck {
    pub success: bool,
    pub message: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityScore {
    pub activity_id: i32,
    pub score: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectiveProgress {
    pub id: i32,
    pub name: String,
    pub target: i32,
    pub progress: i32,
}

/// Learner scores on deployments, plus activity-level progress
#[derive(Clone)]
pub struct ProgressService {
    db: DatabaseConnection,
    authz: AuthorizationService,
}

impl ProgressService {
    pub fn new(db: DatabaseConnection) -> Self {
        let authz = AuthorizationService::new(db.clone());
        Self { db, authz }
    }

    /// Insert or overwrite the user's score for an activity of a deployment
    pub async fn record(
        &self,
        user_id: i32,
        deployed_iap_id: i32,
        activity_id: i32,
        score: i32,
    ) -> CoreResult<ProgressAck> {
        let score = ValidationService::validate_score(score)?;

        deployed_iaps::Entity::find_by_id(deployed_iap_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("Deployed IAP", deployed_iap_id))?;

        let in_deployment = deployed_iap_activities::Entity::find()
            .filter(deployed_iap_activities::Column::DeployedIapId.eq(deployed_iap_id))
            .filter(deployed_iap_activities::Column::ActivityId.eq(activity_id))
            .one(&self.db)
            .await?
            .is_some();
        if !in_deployment {
            return Err(IapError::ActivityNotInDeployment {
                deployed_iap_id,
                activity_id,
            }
            .into());
        }

        let existing = scores::Entity::find()
            .filter(scores::Column::UserId.eq(user_id))
            .filter(scores::Column::DeployedIapId.eq(deployed_iap_id))
            .filter(scores::Column::ActivityId.eq(activity_id))
            .one(&self.db)
            .await?;
        let message = if existing.is_some() {
            "Progress updated"
        } else {
            "Progress recorded"
        };

        // Concurrent first writes meet on the unique score index and collapse into one row
        scores::Entity::insert(scores::ActiveModel {
            id: ActiveValue::NotSet,
            user_id: Set(user_id),
            deployed_iap_id: Set(deployed_iap_id),
            activity_id: Set(activity_id),
            score: Set(score),
            updated_at: Set(Utc::now()),
        })
        .on_conflict(
            OnConflict::columns([
                scores::Column::UserId,
                scores::Column::DeployedIapId,
                scores::Column::ActivityId,
            ])
            .update_columns([scores::Column::Score, scores::Column::UpdatedAt])
            .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await?;

        debug!(
            "User {} scored {} on activity {} of deployment {}",
            user_id, score, activity_id, deployed_iap_id
        );
        Ok(ProgressAck {
            success: true,
            message,
        })
    }

    /// Score for one activity, 0 when nothing was recorded
    pub async fn activity_score(
        &self,
        user_id: i32,
        deployed_iap_id: i32,
        activity_id: i32,
    ) -> CoreResult<i32> {
        Ok(scores::Entity::find()
            .filter(scores::Column::UserId.eq(user_id))
            .filter(scores::Column::DeployedIapId.eq(deployed_iap_id))
            .filter(scores::Column::ActivityId.eq(activity_id))
            .one(&self.db)
            .await?
            .map(|row| row.score)
            .unwrap_or(0))
    }

    pub async fn deployment_scores(
        &self,
        user_id: i32,
        deployed_iap_id: i32,
    ) -> CoreResult<Vec<ActivityScore>> {
        Ok(scores::Entity::find()
            .filter(scores::Column::UserId.eq(user_id))
            .filter(scores::Column::DeployedIapId.eq(deployed_iap_id))
            .order_by_asc(scores::Column::ActivityId)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|row| ActivityScore {
                activity_id: row.activity_id,
                score: row.score,
            })
            .collect())
    }

    /// Clear every score of a deployment; owner of the source plan only
    pub async fn delete_by_deployed_iap(&self, user_id: i32, deployed_iap_id: i32) -> CoreResult<u64> {
        let deployment = deployed_iaps::Entity::find_by_id(deployed_iap_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("Deployed IAP", deployed_iap_id))?;
        self.authz.require_iap_owner(user_id, deployment.iap_id).await?;

        let result = scores::Entity::delete_many()
            .filter(scores::Column::DeployedIapId.eq(deployed_iap_id))
            .exec(&self.db)
            .await?;

        info!(
            "Cleared {} scores of deployment {}",
            result.rows_affected, deployed_iap_id
        );
        Ok(result.rows_affected)
    }

    /// Store progress in the activity's "Activity Progress" analytics row
    pub async fn record_activity_progress(
        &self,
        user_id: i32,
        activity_id: i32,
        progress: i32,
    ) -> CoreResult<analytics::Model> {
        let progress = ValidationService::validate_score(progress)?;

        activities::Entity::find_by_id(activity_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("Activity", activity_id))?;
        self.authz.require_activity_access(user_id, activity_id).await?;

        analytics::Entity::insert(analytics::ActiveModel {
            id: ActiveValue::NotSet,
            activity_id: Set(activity_id),
            name: Set(analytics::ACTIVITY_PROGRESS.to_string()),
            score: Set(progress),
        })
        .on_conflict(
            OnConflict::columns([analytics::Column::ActivityId, analytics::Column::Name])
                .update_column(analytics::Column::Score)
                .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await?;

        analytics::Entity::find()
            .filter(analytics::Column::ActivityId.eq(activity_id))
            .filter(analytics::Column::Name.eq(analytics::ACTIVITY_PROGRESS))
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::internal("Activity progress row missing after write"))
    }

    pub async fn activity_progress(&self, activity_id: i32) -> CoreResult<i32> {
        Ok(analytics::Entity::find()
            .filter(analytics::Column::ActivityId.eq(activity_id))
            .filter(analytics::Column::Name.eq(analytics::ACTIVITY_PROGRESS))
            .one(&self.db)
            .await?
            .map(|row| row.score)
            .unwrap_or(0))
    }

    /// Progress of an objective is the best score among its analytics
    pub async fn objective_progress(&self, deployed_iap_id: i32) -> CoreResult<Vec<ObjectiveProgress>> {
        deployed_iaps::Entity::find_by_id(deployed_iap_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("Deployed IAP", deployed_iap_id))?;

        let objective_rows = objectives::Entity::find()
            .filter(objectives::Column::DeployedIapId.eq(deployed_iap_id))
            .order_by_asc(objectives::Column::Id)
            .all(&self.db)
            .await?;
        if objective_rows.is_empty() {
            return Ok(Vec::new());
        }

        let links = objective_analytics::Entity::find()
            .filter(
                objective_analytics::Column::ObjectiveId
                    .is_in(objective_rows.iter().map(|o| o.id).collect::<Vec<_>>()),
            )
            .all(&self.db)
            .await?;

        let scores_by_analytics: HashMap<i32, i32> = if links.is_empty() {
            HashMap::new()
        } else {
            analytics::Entity::find()
                .filter(
                    analytics::Column::Id
                        .is_in(links.iter().map(|l| l.analytics_id).collect::<Vec<_>>()),
                )
                .all(&self.db)
                .await?
                .into_iter()
                .map(|a| (a.id, a.score))
                .collect()
        };

        let mut best: HashMap<i32, i32> = HashMap::new();
        for link in &links {
            if let Some(score) = scores_by_analytics.get(&link.analytics_id) {
                let entry = best.entry(link.objective_id).or_insert(0);
                *entry = (*entry).max(*score);
            }
        }

        Ok(objective_rows
            .into_iter()
            .map(|o| ObjectiveProgress {
                progress: best.get(&o.id).copied().unwrap_or(0),
                id: o.id,
                name: o.name,
                target: o.target,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_utils::{insert_user, setup_test_db};
    use crate::errors::CoreErrorKind;
    use crate::services::{
        ActivityInput, ActivityService, AnalyticsService, DeployRequest, IapInput, IapService,
        ObjectiveInput,
    };
    use serde_json::json;

    #[tokio::test]
    async fn test_record_upserts_and_reads_back() {
        let db = setup_test_db().await;
        let owner = insert_user(&db, "Author", "author@example.com").await;
        let learner = insert_user(&db, "Learner", "learner@example.com").await;

        let quiz = ActivityService::new(db.clone())
            .create(
                owner.id,
                ActivityInput {
                    name: Some("Quiz".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let iaps = IapService::new(db.clone());
        let iap = iaps
            .create(
                owner.id,
                IapInput {
                    name: Some("Course".to_string()),
                    nodes: Some(json!([{"id": quiz.id}])),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let deployment = iaps
            .deploy(
                owner.id,
                iap.id,
                DeployRequest {
                    deploy_url: Some("https://lms.example/c".to_string()),
                    objectives: vec![],
                },
            )
            .await
            .unwrap();

        let service = ProgressService::new(db.clone());
        assert_eq!(service.activity_score(learner.id, deployment.id, quiz.id).await.unwrap(), 0);

        let ack = service.record(learner.id, deployment.id, quiz.id, 40).await.unwrap();
        assert_eq!(ack.message, "Progress recorded");
        let ack = service.record(learner.id, deployment.id, quiz.id, 90).await.unwrap();
        assert_eq!(ack.message, "Progress updated");

        assert_eq!(service.activity_score(learner.id, deployment.id, quiz.id).await.unwrap(), 90);
        assert_eq!(
            service.deployment_scores(learner.id, deployment.id).await.unwrap(),
            vec![ActivityScore {
                activity_id: quiz.id,
                score: 90
            }]
        );
        assert_eq!(scores::Entity::find().all(&db).await.unwrap().len(), 1);

        let err = service.record(learner.id, deployment.id, quiz.id, 101).await.unwrap_err();
        assert_eq!(err.message(), "Score must be between 0 and 100");

        let err = service.record(learner.id, deployment.id, quiz.id + 100, 10).await.unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Validation);

        let err = service.record(learner.id, 999, quiz.id, 10).await.unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::NotFound);

        let err = service.delete_by_deployed_iap(learner.id, deployment.id).await.unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Forbidden);
        assert_eq!(service.delete_by_deployed_iap(owner.id, deployment.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_activity_progress_row() {
        let db = setup_test_db().await;
        let owner = insert_user(&db, "Author", "author@example.com").await;
        let stranger = insert_user(&db, "Stranger", "stranger@example.com").await;
        let quiz = ActivityService::new(db.clone())
            .create(
                owner.id,
                ActivityInput {
                    name: Some("Quiz".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let service = ProgressService::new(db.clone());
        assert_eq!(service.activity_progress(quiz.id).await.unwrap(), 0);

        service.record_activity_progress(owner.id, quiz.id, 30).await.unwrap();
        let row = service.record_activity_progress(owner.id, quiz.id, 75).await.unwrap();
        assert_eq!(row.name, "Activity Progress");
        assert_eq!(service.activity_progress(quiz.id).await.unwrap(), 75);
        assert_eq!(analytics::Entity::find().all(&db).await.unwrap().len(), 1);

        let err = service.record_activity_progress(stranger.id, quiz.id, 10).await.unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_objective_progress_takes_best_score() {
        let db = setup_test_db().await;
        let owner = insert_user(&db, "Author", "author@example.com").await;
        let quiz = ActivityService::new(db.clone())
            .create(
                owner.id,
                ActivityInput {
                    name: Some("Quiz".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let analytics = AnalyticsService::new(db.clone());
        let correct = analytics.create(owner.id, quiz.id, "Correct").await.unwrap();
        let speed = analytics.create(owner.id, quiz.id, "Speed").await.unwrap();

        let iaps = IapService::new(db.clone());
        let iap = iaps
            .create(
                owner.id,
                IapInput {
                    name: Some("Course".to_string()),
                    nodes: Some(json!([{"id": quiz.id}])),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let deployment = iaps
            .deploy(
                owner.id,
                iap.id,
                DeployRequest {
                    deploy_url: Some("https://lms.example/c".to_string()),
                    objectives: vec![
                        ObjectiveInput {
                            name: Some("Accuracy".to_string()),
                            analytics_id: Some(correct.id),
                            target: Some(80),
                        },
                        ObjectiveInput {
                            name: Some("Speed".to_string()),
                            analytics_id: Some(speed.id),
                            target: Some(50),
                        },
                    ],
                },
            )
            .await
            .unwrap();

        analytics.set_score(owner.id, correct.id, 65).await.unwrap();

        let progress = ProgressService::new(db)
            .objective_progress(deployment.id)
            .await
            .unwrap();
        assert_eq!(progress.len(), 2);
        assert_eq!(progress[0].name, "Accuracy");
        assert_eq!(progress[0].progress, 65);
        assert_eq!(progress[0].target, 80);
        assert_eq!(progress[1].progress, 0);
    }
}
