use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::info;

use crate::database::entities::{
    deployed_iap_activities, deployed_iaps, iap_ownership, iaps, objective_analytics, objectives,
    scores, users,
};
use crate::errors::{CoreError, CoreResult, IapError};
use crate::services::AuthorizationService;

/// A deployment as seen by one user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeployedIapView {
    #[serde(flatten)]
    pub deployment: deployed_iaps::Model,
    pub is_added: bool,
    pub is_owner: bool,
}

/// Scores of one learner on a deployment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStatistics {
    pub user_id: i32,
    pub user_name: String,
    pub scores: BTreeMap<i32, i32>,
    pub average: f64,
}

#[derive(Clone)]
pub struct DeployedIapService {
    db: DatabaseConnection,
    authz: AuthorizationService,
}

impl DeployedIapService {
    pub fn new(db: DatabaseConnection) -> Self {
        let authz = AuthorizationService::new(db.clone());
        Self { db, authz }
    }

    /// Every deployment, flagged against the viewer's links when one is given
    pub async fn list_all(&self, viewer: Option<i32>) -> CoreResult<Vec<DeployedIapView>> {
        let deployments = deployed_iaps::Entity::find()
            .order_by_asc(deployed_iaps::Column::Id)
            .all(&self.db)
            .await?;

        let links: HashMap<i32, bool> = match viewer {
            Some(user_id) => self.links_of(user_id).await?,
            None => HashMap::new(),
        };

        Ok(deployments
            .into_iter()
            .map(|deployment| {
                let link = links.get(&deployment.iap_id).copied();
                DeployedIapView {
                    is_added: link.is_some(),
                    is_owner: link.unwrap_or(false),
                    deployment,
                }
            })
            .collect())
    }

    pub async fn get(&self, id: i32) -> CoreResult<deployed_iaps::Model> {
        deployed_iaps::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("Deployed IAP", id))
    }

    /// Deployments whose source plan is linked to the user
    pub async fn by_user(&self, user_id: i32) -> CoreResult<Vec<DeployedIapView>> {
        let links = self.links_of(user_id).await?;
        if links.is_empty() {
            return Ok(Vec::new());
        }

        let deployments = deployed_iaps::Entity::find()
            .filter(deployed_iaps::Column::IapId.is_in(links.keys().copied().collect::<Vec<_>>()))
            .order_by_asc(deployed_iaps::Column::Id)
            .all(&self.db)
            .await?;

        Ok(deployments
            .into_iter()
            .map(|deployment| DeployedIapView {
                is_added: true,
                is_owner: links.get(&deployment.iap_id).copied().unwrap_or(false),
                deployment,
            })
            .collect())
    }

    pub async fn by_iap(&self, iap_id: i32) -> CoreResult<Vec<deployed_iaps::Model>> {
        Ok(deployed_iaps::Entity::find()
            .filter(deployed_iaps::Column::IapId.eq(iap_id))
            .order_by_asc(deployed_iaps::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Delete one deployment; only the owner of the source plan may
    pub async fn remove(&self, user_id: i32, id: i32) -> CoreResult<()> {
        let deployment = self.get(id).await?;
        self.authz.require_iap_owner(user_id, deployment.iap_id).await?;

        let txn = self.db.begin().await?;
        delete_deployment_rows(&txn, id).await?;
        refresh_iap_deployed_flag(&txn, deployment.iap_id).await?;
        txn.commit().await?;

        info!("Deleted deployment {} of IAP {}", id, deployment.iap_id);
        Ok(())
    }

    /// Delete every deployment of a plan; returns how many were removed
    pub async fn remove_by_iap(&self, user_id: i32, iap_id: i32) -> CoreResult<usize> {
        iaps::Entity::find_by_id(iap_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("IAP", iap_id))?;
        self.authz.require_iap_owner(user_id, iap_id).await?;

        let txn = self.db.begin().await?;
        let ids: Vec<i32> = deployed_iaps::Entity::find()
            .select_only()
            .column(deployed_iaps::Column::Id)
            .filter(deployed_iaps::Column::IapId.eq(iap_id))
            .into_tuple()
            .all(&txn)
            .await?;
        for id in &ids {
            delete_deployment_rows(&txn, *id).await?;
        }
        refresh_iap_deployed_flag(&txn, iap_id).await?;
        txn.commit().await?;

        info!("Deleted {} deployments of IAP {}", ids.len(), iap_id);
        Ok(ids.len())
    }

    /// Link the deployment's source plan to the user as a non-owner
    pub async fn add_to_user(&self, user_id: i32, id: i32) -> CoreResult<iap_ownership::Model> {
        let deployment = self.get(id).await?;

        match self.authz.iap_link(user_id, deployment.iap_id).await? {
            Some(link) if link.is_owner => Err(IapError::AlreadyOwner("IAP").into()),
            Some(_) => Err(IapError::AlreadyAdded("IAP").into()),
            None => {
                iap_ownership::Entity::insert(iap_ownership::ActiveModel::link(
                    user_id,
                    deployment.iap_id,
                    false,
                ))
                .exec_without_returning(&self.db)
                .await?;

                info!("User {} added deployment {}", user_id, id);
                Ok(iap_ownership::Model {
                    users_id: user_id,
                    iap_id: deployment.iap_id,
                    is_owner: false,
                })
            }
        }
    }

    pub async fn objectives(&self, id: i32) -> CoreResult<Vec<objectives::Model>> {
        self.get(id).await?;
        Ok(objectives::Entity::find()
            .filter(objectives::Column::DeployedIapId.eq(id))
            .order_by_asc(objectives::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Activities of the snapshot in plan order
    pub async fn activities(&self, id: i32) -> CoreResult<Vec<deployed_iap_activities::Model>> {
        self.get(id).await?;
        Ok(deployed_iap_activities::Entity::find()
            .filter(deployed_iap_activities::Column::DeployedIapId.eq(id))
            .order_by_asc(deployed_iap_activities::Column::Position)
            .all(&self.db)
            .await?)
    }

    /// One row per learner that has scores on the deployment
    pub async fn statistics(&self, id: i32) -> CoreResult<Vec<UserStatistics>> {
        self.get(id).await?;

        let rows = scores::Entity::find()
            .filter(scores::Column::DeployedIapId.eq(id))
            .order_by_asc(scores::Column::UserId)
            .order_by_asc(scores::Column::ActivityId)
            .all(&self.db)
            .await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let user_ids: HashSet<i32> = rows.iter().map(|r| r.user_id).collect();
        let names: HashMap<i32, String> = users::Entity::find()
            .filter(users::Column::Id.is_in(user_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect();

        let mut per_user: BTreeMap<i32, BTreeMap<i32, i32>> = BTreeMap::new();
        for row in rows {
            per_user
                .entry(row.user_id)
                .or_default()
                .insert(row.activity_id, row.score);
        }

        Ok(per_user
            .into_iter()
            .map(|(user_id, scores)| UserStatistics {
                user_id,
                user_name: names.get(&user_id).cloned().unwrap_or_default(),
                average: average(scores.values().copied()),
                scores,
            })
            .collect())
    }

    async fn links_of(&self, user_id: i32) -> CoreResult<HashMap<i32, bool>> {
        Ok(iap_ownership::Entity::find()
            .filter(iap_ownership::Column::UsersId.eq(user_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|link| (link.iap_id, link.is_owner))
            .collect())
    }
}

/// Mean rounded to two decimals, 0 for no values
fn average(values: impl Iterator<Item = i32>) -> f64 {
    let (sum, count) = values.fold((0i64, 0i64), |(sum, count), v| (sum + v as i64, count + 1));
    if count == 0 {
        return 0.0;
    }
    ((sum as f64 / count as f64) * 100.0).round() / 100.0
}

/// Delete a deployment and the rows that reference it, children first.
pub async fn delete_deployment_rows<C: ConnectionTrait>(
    conn: &C,
    deployment_id: i32,
) -> Result<(), DbErr> {
    scores::Entity::delete_many()
        .filter(scores::Column::DeployedIapId.eq(deployment_id))
        .exec(conn)
        .await?;

    let objective_ids: Vec<i32> = objectives::Entity::find()
        .select_only()
        .column(objectives::Column::Id)
        .filter(objectives::Column::DeployedIapId.eq(deployment_id))
        .into_tuple()
        .all(conn)
        .await?;

    if !objective_ids.is_empty() {
        objective_analytics::Entity::delete_many()
            .filter(objective_analytics::Column::ObjectiveId.is_in(objective_ids))
            .exec(conn)
            .await?;
    }

    objectives::Entity::delete_many()
        .filter(objectives::Column::DeployedIapId.eq(deployment_id))
        .exec(conn)
        .await?;

    deployed_iap_activities::Entity::delete_many()
        .filter(deployed_iap_activities::Column::DeployedIapId.eq(deployment_id))
        .exec(conn)
        .await?;

    deployed_iaps::Entity::delete_by_id(deployment_id)
        .exec(conn)
        .await?;

    Ok(())
}

/// Clear the plan's deployed flag once its last deployment is gone.
pub async fn refresh_iap_deployed_flag<C: ConnectionTrait>(
    conn: &C,
    iap_id: i32,
) -> Result<(), DbErr> {
    let remaining = deployed_iaps::Entity::find()
        .filter(deployed_iaps::Column::IapId.eq(iap_id))
        .count(conn)
        .await?;
    if remaining > 0 {
        return Ok(());
    }

    if let Some(iap) = iaps::Entity::find_by_id(iap_id).one(conn).await? {
        if iap.is_deployed {
            let mut active: iaps::ActiveModel = iap.into();
            active.is_deployed = Set(false);
            active.updated_at = Set(Utc::now());
            active.update(conn).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_utils::{insert_user, setup_test_db};
    use crate::errors::CoreErrorKind;
    use crate::services::{
        ActivityInput, ActivityService, DeployRequest, IapInput, IapService, ProgressService,
    };
    use serde_json::json;

    struct Fixture {
        db: DatabaseConnection,
        owner: users::Model,
        learner: users::Model,
        activity_ids: Vec<i32>,
        iap_id: i32,
        deployment: deployed_iaps::Model,
    }

    async fn deployed_fixture() -> Fixture {
        let db = setup_test_db().await;
        let owner = insert_user(&db, "Author", "author@example.com").await;
        let learner = insert_user(&db, "Learner", "learner@example.com").await;

        let activities = ActivityService::new(db.clone());
        let mut activity_ids = Vec::new();
        for name in ["Read", "Quiz"] {
            let activity = activities
                .create(
                    owner.id,
                    ActivityInput {
                        name: Some(name.to_string()),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            activity_ids.push(activity.id);
        }

        let iaps = IapService::new(db.clone());
        let iap = iaps
            .create(
                owner.id,
                IapInput {
                    name: Some("Course".to_string()),
                    nodes: Some(json!([{"id": activity_ids[0]}, {"id": activity_ids[1]}])),
                    edges: Some(json!([{"source": activity_ids[0], "target": activity_ids[1]}])),
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
                    deploy_url: Some("https://lms.example/course".to_string()),
                    objectives: vec![],
                },
            )
            .await
            .unwrap();

        Fixture {
            db,
            owner,
            learner,
            activity_ids,
            iap_id: iap.id,
            deployment,
        }
    }

    #[tokio::test]
    async fn test_add_to_user_rules() {
        let fx = deployed_fixture().await;
        let service = DeployedIapService::new(fx.db.clone());

        let err = service.add_to_user(fx.owner.id, fx.deployment.id).await.unwrap_err();
        assert_eq!(err.message(), "User is already the owner of this IAP");

        let link = service.add_to_user(fx.learner.id, fx.deployment.id).await.unwrap();
        assert!(!link.is_owner);
        assert_eq!(link.iap_id, fx.iap_id);

        let err = service.add_to_user(fx.learner.id, fx.deployment.id).await.unwrap_err();
        assert_eq!(err.message(), "IAP already added to user");

        let err = service.add_to_user(fx.learner.id, 999).await.unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_views_flag_links() {
        let fx = deployed_fixture().await;
        let service = DeployedIapService::new(fx.db.clone());

        let anonymous = service.list_all(None).await.unwrap();
        assert_eq!(anonymous.len(), 1);
        assert!(!anonymous[0].is_added);

        let for_owner = service.list_all(Some(fx.owner.id)).await.unwrap();
        assert!(for_owner[0].is_added && for_owner[0].is_owner);

        assert!(service.by_user(fx.learner.id).await.unwrap().is_empty());
        service.add_to_user(fx.learner.id, fx.deployment.id).await.unwrap();

        let mine = service.by_user(fx.learner.id).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert!(!mine[0].is_owner);

        let view = serde_json::to_value(&mine[0]).unwrap();
        assert_eq!(view["deploy_url"], "https://lms.example/course");
        assert_eq!(view["is_added"], true);
    }

    #[tokio::test]
    async fn test_snapshot_activities_in_order() {
        let fx = deployed_fixture().await;
        let service = DeployedIapService::new(fx.db.clone());

        let activities = service.activities(fx.deployment.id).await.unwrap();
        assert_eq!(
            activities.iter().map(|a| a.activity_id).collect::<Vec<_>>(),
            fx.activity_ids
        );
        assert!(service.objectives(fx.deployment.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_statistics_per_user() {
        let fx = deployed_fixture().await;
        let service = DeployedIapService::new(fx.db.clone());
        let progress = ProgressService::new(fx.db.clone());

        progress
            .record(fx.learner.id, fx.deployment.id, fx.activity_ids[0], 80)
            .await
            .unwrap();
        progress
            .record(fx.learner.id, fx.deployment.id, fx.activity_ids[1], 45)
            .await
            .unwrap();
        progress
            .record(fx.owner.id, fx.deployment.id, fx.activity_ids[0], 100)
            .await
            .unwrap();

        let stats = service.statistics(fx.deployment.id).await.unwrap();
        assert_eq!(stats.len(), 2);

        let learner = stats.iter().find(|s| s.user_id == fx.learner.id).unwrap();
        assert_eq!(learner.user_name, "Learner");
        assert_eq!(learner.scores.get(&fx.activity_ids[1]), Some(&45));
        assert_eq!(learner.average, 62.5);

        let owner = stats.iter().find(|s| s.user_id == fx.owner.id).unwrap();
        assert_eq!(owner.average, 100.0);
    }

    #[tokio::test]
    async fn test_remove_resets_source_flag() {
        let fx = deployed_fixture().await;
        let service = DeployedIapService::new(fx.db.clone());
        ProgressService::new(fx.db.clone())
            .record(fx.learner.id, fx.deployment.id, fx.activity_ids[0], 10)
            .await
            .unwrap();

        let err = service.remove(fx.learner.id, fx.deployment.id).await.unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Forbidden);

        service.remove(fx.owner.id, fx.deployment.id).await.unwrap();

        assert!(scores::Entity::find().all(&fx.db).await.unwrap().is_empty());
        assert!(deployed_iap_activities::Entity::find().all(&fx.db).await.unwrap().is_empty());
        let iap = iaps::Entity::find_by_id(fx.iap_id).one(&fx.db).await.unwrap().unwrap();
        assert!(!iap.is_deployed);

        assert_eq!(service.remove_by_iap(fx.owner.id, fx.iap_id).await.unwrap(), 0);
    }

    #[test]
    fn test_average() {
        assert_eq!(average([].into_iter()), 0.0);
        assert_eq!(average([1, 2].into_iter()), 1.5);
        assert_eq!(average([10, 10, 11].into_iter()), 10.33);
    }
}
