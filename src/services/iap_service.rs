use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::database::entities::iaps::{self, IapEdge, IapNode};
use crate::database::entities::{
    activities, analytics, deployed_iap_activities, deployed_iaps, iap_ownership,
    objective_analytics, objectives,
};
use crate::errors::{CoreError, CoreResult, IapError};
use crate::services::activity_connection_service;
use crate::services::deployed_iap_service::delete_deployment_rows;
use crate::services::{AuthorizationService, ValidationService};

/// Fields accepted when creating or updating a plan
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IapInput {
    pub name: Option<String>,
    pub properties: Option<Value>,
    pub nodes: Option<Value>,
    pub edges: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IapFilter {
    #[serde(default)]
    pub all: bool,
    pub name: Option<String>,
    pub user_id: Option<i32>,
}

/// Body of a deploy request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeployRequest {
    #[serde(alias = "deployURL")]
    pub deploy_url: Option<String>,
    #[serde(default)]
    pub objectives: Vec<ObjectiveInput>,
}

/// One objective of a deploy request; numeric fields may arrive as strings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectiveInput {
    pub name: Option<String>,
    #[serde(alias = "analytic_id", default, deserialize_with = "optional_number")]
    pub analytics_id: Option<i32>,
    #[serde(default, deserialize_with = "optional_number")]
    pub target: Option<i32>,
}

/// Objective as stored in the deployment snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
struct ObjectiveSnapshot {
    name: String,
    analytics_id: i32,
    target: i32,
}

fn optional_number<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => i32::try_from(n)
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("number {} out of range", n))),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s
            .trim()
            .parse::<i32>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid number '{}'", s))),
    }
}

/// Parse the node and edge lists and check every edge joins two known nodes.
pub fn validate_graph(nodes: &Value, edges: &Value) -> Result<(Vec<IapNode>, Vec<IapEdge>), IapError> {
    let parsed_nodes =
        iaps::parse_nodes(nodes).map_err(|e| IapError::InvalidGraph(format!("nodes: {}", e)))?;
    let parsed_edges =
        iaps::parse_edges(edges).map_err(|e| IapError::InvalidGraph(format!("edges: {}", e)))?;

    let dangling = iaps::dangling_edges(&parsed_nodes, &parsed_edges);
    if !dangling.is_empty() {
        return Err(IapError::InvalidEdges(dangling));
    }

    Ok((parsed_nodes, parsed_edges))
}

fn graph_or_empty(value: Option<Value>) -> Value {
    match value {
        None | Some(Value::Null) => json!([]),
        Some(value) => value,
    }
}

#[derive(Clone)]
pub struct IapService {
    db: DatabaseConnection,
    authz: AuthorizationService,
}

impl IapService {
    pub fn new(db: DatabaseConnection) -> Self {
        let authz = AuthorizationService::new(db.clone());
        Self { db, authz }
    }

    /// Create a plan owned by `user_id`, with one connection row per edge
    pub async fn create(&self, user_id: i32, input: IapInput) -> CoreResult<iaps::Model> {
        let name = ValidationService::validate_name("IAP", input.name.as_deref().unwrap_or(""))?;
        let properties = ValidationService::validate_properties(input.properties)?;
        let nodes = graph_or_empty(input.nodes);
        let edges = graph_or_empty(input.edges);
        let (_, parsed_edges) = validate_graph(&nodes, &edges)?;
        let now = Utc::now();

        let txn = self.db.begin().await?;

        let iap = iaps::ActiveModel {
            id: ActiveValue::NotSet,
            name: Set(name),
            properties: Set(properties),
            nodes: Set(nodes),
            edges: Set(edges),
            is_deployed: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        activity_connection_service::replace_for_iap(&txn, iap.id, &parsed_edges).await?;

        iap_ownership::Entity::insert(iap_ownership::ActiveModel::link(user_id, iap.id, true))
            .exec_without_returning(&txn)
            .await?;

        txn.commit().await?;

        info!("Created IAP {} for user {}", iap.id, user_id);
        Ok(iap)
    }

    pub async fn get(&self, id: i32) -> CoreResult<iaps::Model> {
        iaps::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("IAP", id))
    }

    /// `user_id` selects the plans the user owns
    pub async fn list(&self, filter: &IapFilter) -> CoreResult<Vec<iaps::Model>> {
        let mut query = iaps::Entity::find().order_by_asc(iaps::Column::Id);

        if filter.all {
            return Ok(query.all(&self.db).await?);
        }

        if let Some(user_id) = filter.user_id {
            let ids: Vec<i32> = iap_ownership::Entity::find()
                .select_only()
                .column(iap_ownership::Column::IapId)
                .filter(iap_ownership::Column::UsersId.eq(user_id))
                .filter(iap_ownership::Column::IsOwner.eq(true))
                .into_tuple()
                .all(&self.db)
                .await?;
            query = query.filter(iaps::Column::Id.is_in(ids));
        }

        if let Some(name) = filter.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            let pattern = format!("%{}%", name.to_lowercase());
            query = query.filter(
                Expr::expr(Func::lower(Expr::col((iaps::Entity, iaps::Column::Name))))
                    .like(pattern),
            );
        }

        Ok(query.all(&self.db).await?)
    }

    /// Partial update; a changed graph is revalidated as a whole and its
    /// connection rows rewritten in the same transaction
    pub async fn update(&self, user_id: i32, id: i32, input: IapInput) -> CoreResult<iaps::Model> {
        let iap = self.get(id).await?;
        self.authz.require_iap_owner(user_id, id).await?;

        let graph_changed = input.nodes.is_some() || input.edges.is_some();
        let nodes = match input.nodes {
            Some(nodes) => graph_or_empty(Some(nodes)),
            None => iap.nodes.clone(),
        };
        let edges = match input.edges {
            Some(edges) => graph_or_empty(Some(edges)),
            None => iap.edges.clone(),
        };

        let parsed_edges = if graph_changed {
            Some(validate_graph(&nodes, &edges)?.1)
        } else {
            None
        };

        let mut active: iaps::ActiveModel = iap.into();
        if let Some(name) = input.name.as_deref() {
            active.name = Set(ValidationService::validate_name("IAP", name)?);
        }
        if input.properties.is_some() {
            active.properties = Set(ValidationService::validate_properties(input.properties)?);
        }
        if graph_changed {
            active.nodes = Set(nodes);
            active.edges = Set(edges);
        }
        active.updated_at = Set(Utc::now());

        let txn = self.db.begin().await?;
        let iap = active.update(&txn).await?;
        if let Some(parsed_edges) = parsed_edges {
            activity_connection_service::replace_for_iap(&txn, id, &parsed_edges).await?;
            debug!("Rewrote {} connections of IAP {}", parsed_edges.len(), id);
        }
        txn.commit().await?;

        Ok(iap)
    }

    /// Delete a plan with its deployments, connections and ownership rows
    pub async fn remove(&self, user_id: i32, id: i32) -> CoreResult<()> {
        self.get(id).await?;
        self.authz.require_iap_owner(user_id, id).await?;

        let txn = self.db.begin().await?;
        delete_iap_cascade(&txn, id).await?;
        txn.commit().await?;

        info!("Deleted IAP {} (user {})", id, user_id);
        Ok(())
    }

    /// Snapshot the plan into a new deployment
    pub async fn deploy(
        &self,
        user_id: i32,
        id: i32,
        request: DeployRequest,
    ) -> CoreResult<deployed_iaps::Model> {
        let iap = self.get(id).await?;
        self.authz.require_iap_owner(user_id, id).await?;

        if iap.is_deployed {
            return Err(IapError::IapAlreadyDeployed.into());
        }

        let deploy_url =
            ValidationService::validate_url("deploy_url", request.deploy_url.as_deref().unwrap_or(""))?;

        let nodes = iap
            .parsed_nodes()
            .map_err(|e| IapError::InvalidGraph(format!("nodes: {}", e)))?;
        let node_ids: Vec<i32> = nodes.iter().map(|n| n.id).collect();

        let activity_names: HashMap<i32, String> = activities::Entity::find()
            .filter(activities::Column::Id.is_in(node_ids.clone()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|a| (a.id, a.name))
            .collect();

        if let Some(missing) = node_ids.iter().find(|id| !activity_names.contains_key(id)) {
            return Err(IapError::InvalidDeployment(format!(
                "node {} does not reference an existing activity",
                missing
            ))
            .into());
        }

        let snapshots = self.validate_objectives(&request.objectives, &node_ids).await?;

        let txn = self.db.begin().await?;

        let deployment = deployed_iaps::ActiveModel {
            id: ActiveValue::NotSet,
            iap_id: Set(iap.id),
            name: Set(iap.name.clone()),
            properties: Set(iap.properties.clone()),
            nodes: Set(iap.nodes.clone()),
            edges: Set(iap.edges.clone()),
            objectives: Set(serde_json::to_value(&snapshots)
                .map_err(|e| CoreError::internal(format!("Failed to encode objectives: {}", e)))?),
            deploy_url: Set(deploy_url),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        let activity_rows: Vec<deployed_iap_activities::ActiveModel> = node_ids
            .iter()
            .enumerate()
            .map(|(position, activity_id)| deployed_iap_activities::ActiveModel {
                id: ActiveValue::NotSet,
                deployed_iap_id: Set(deployment.id),
                activity_id: Set(*activity_id),
                name: Set(activity_names.get(activity_id).cloned().unwrap_or_default()),
                position: Set(position as i32),
            })
            .collect();
        if !activity_rows.is_empty() {
            deployed_iap_activities::Entity::insert_many(activity_rows)
                .exec_without_returning(&txn)
                .await?;
        }

        for snapshot in &snapshots {
            let objective = objectives::ActiveModel {
                id: ActiveValue::NotSet,
                deployed_iap_id: Set(deployment.id),
                iap_id: Set(iap.id),
                name: Set(snapshot.name.clone()),
                target: Set(snapshot.target),
            }
            .insert(&txn)
            .await?;

            objective_analytics::Entity::insert(objective_analytics::ActiveModel {
                objective_id: Set(objective.id),
                analytics_id: Set(snapshot.analytics_id),
            })
            .exec_without_returning(&txn)
            .await?;
        }

        let mut active: iaps::ActiveModel = iap.into();
        active.is_deployed = Set(true);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;

        txn.commit().await?;

        info!(
            "Deployed IAP {} as deployment {} with {} objectives",
            id,
            deployment.id,
            snapshots.len()
        );
        Ok(deployment)
    }

    /// Each objective needs a name, a target and an analytics row that
    /// belongs to one of the plan's activities
    async fn validate_objectives(
        &self,
        inputs: &[ObjectiveInput],
        node_ids: &[i32],
    ) -> CoreResult<Vec<ObjectiveSnapshot>> {
        let requested: Vec<i32> = inputs.iter().filter_map(|o| o.analytics_id).collect();
        let owners: HashMap<i32, i32> = if requested.is_empty() {
            HashMap::new()
        } else {
            analytics::Entity::find()
                .filter(analytics::Column::Id.is_in(requested))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|a| (a.id, a.activity_id))
                .collect()
        };
        let nodes: HashSet<i32> = node_ids.iter().copied().collect();

        let mut snapshots = Vec::with_capacity(inputs.len());
        for (index, input) in inputs.iter().enumerate() {
            let name = ValidationService::validate_name("Objective", input.name.as_deref().unwrap_or(""))?;

            let target = input.target.ok_or_else(|| {
                IapError::InvalidDeployment(format!("objective {} has no target", index + 1))
            })?;
            if ValidationService::validate_score(target).is_err() {
                return Err(IapError::InvalidDeployment(format!(
                    "objective target {} must be between 0 and 100",
                    target
                ))
                .into());
            }

            let analytics_id = input.analytics_id.ok_or_else(|| {
                IapError::InvalidDeployment(format!("objective {} has no analytics", index + 1))
            })?;
            match owners.get(&analytics_id) {
                Some(activity_id) if nodes.contains(activity_id) => {}
                Some(_) => {
                    return Err(IapError::InvalidDeployment(format!(
                        "analytics {} does not belong to an activity of this IAP",
                        analytics_id
                    ))
                    .into())
                }
                None => {
                    return Err(IapError::InvalidDeployment(format!(
                        "analytics {} not found",
                        analytics_id
                    ))
                    .into())
                }
            }

            snapshots.push(ObjectiveSnapshot {
                name,
                analytics_id,
                target,
            });
        }

        Ok(snapshots)
    }
}

/// Delete a plan and everything hanging off it, deployments included.
pub async fn delete_iap_cascade<C: ConnectionTrait>(conn: &C, iap_id: i32) -> Result<(), DbErr> {
    let deployment_ids: Vec<i32> = deployed_iaps::Entity::find()
        .select_only()
        .column(deployed_iaps::Column::Id)
        .filter(deployed_iaps::Column::IapId.eq(iap_id))
        .into_tuple()
        .all(conn)
        .await?;

    for deployment_id in deployment_ids {
        delete_deployment_rows(conn, deployment_id).await?;
    }

    activity_connection_service::delete_by_iap(conn, iap_id).await?;

    iap_ownership::Entity::delete_many()
        .filter(iap_ownership::Column::IapId.eq(iap_id))
        .exec(conn)
        .await?;

    iaps::Entity::delete_by_id(iap_id).exec(conn).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::entities::activity_connections;
    use crate::database::test_utils::{insert_user, setup_test_db};
    use crate::errors::CoreErrorKind;
    use crate::services::{ActivityInput, ActivityService};

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

    async fn metric(db: &DatabaseConnection, activity_id: i32, name: &str) -> analytics::Model {
        analytics::ActiveModel {
            id: ActiveValue::NotSet,
            activity_id: Set(activity_id),
            name: Set(name.to_string()),
            score: Set(0),
        }
        .insert(db)
        .await
        .unwrap()
    }

    fn plan(name: &str, nodes: Value, edges: Value) -> IapInput {
        IapInput {
            name: Some(name.to_string()),
            properties: None,
            nodes: Some(nodes),
            edges: Some(edges),
        }
    }

    #[test]
    fn test_validate_graph_reports_dangling_edges() {
        let err = validate_graph(
            &json!([{"id": 1}, {"id": 2}]),
            &json!([{"source": 1, "target": 4}, {"source": 4, "target": 2}]),
        )
        .unwrap_err();

        match err {
            IapError::InvalidEdges(edges) => assert_eq!(edges, vec![(1, 4), (4, 2)]),
            other => panic!("unexpected error: {:?}", other),
        }

        assert!(validate_graph(&json!({"id": 1}), &json!([])).is_err());
        assert!(validate_graph(&json!([]), &json!([])).is_ok());
    }

    #[test]
    fn test_objective_input_accepts_form_strings() {
        let input: ObjectiveInput =
            serde_json::from_value(json!({"name": "Pass", "analytic_id": "7", "target": "80"}))
                .unwrap();
        assert_eq!(input.analytics_id, Some(7));
        assert_eq!(input.target, Some(80));

        let request: DeployRequest =
            serde_json::from_value(json!({"deployURL": "https://lms.example/1"})).unwrap();
        assert_eq!(request.deploy_url.as_deref(), Some("https://lms.example/1"));
        assert!(request.objectives.is_empty());
    }

    #[tokio::test]
    async fn test_create_defaults_and_connections() {
        let db = setup_test_db().await;
        let ana = insert_user(&db, "Ana", "ana@example.com").await;
        let service = IapService::new(db.clone());

        let empty = service
            .create(
                ana.id,
                IapInput {
                    name: Some("Empty".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(empty.properties, json!({}));
        assert_eq!(empty.nodes, json!([]));
        assert_eq!(empty.edges, json!([]));

        let iap = service
            .create(
                ana.id,
                plan(
                    "Algebra",
                    json!([{"id": 1}, {"id": 2}]),
                    json!([{"source": 1, "target": 2}]),
                ),
            )
            .await
            .unwrap();

        let fetched = service.get(iap.id).await.unwrap();
        assert_eq!(fetched.name, "Algebra");
        assert!(!fetched.is_deployed);

        let rows = activity_connections::Entity::find()
            .filter(activity_connections::Column::IapId.eq(iap.id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].label, "not-completed");

        let owned = service
            .list(&IapFilter {
                user_id: Some(ana.id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(owned.len(), 2);

        let by_name = service
            .list(&IapFilter {
                name: Some("ALG".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_name.len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_dangling_edges() {
        let db = setup_test_db().await;
        let ana = insert_user(&db, "Ana", "ana@example.com").await;
        let service = IapService::new(db.clone());

        let err = service
            .create(
                ana.id,
                plan("Broken", json!([{"id": 1}]), json!([{"source": 1, "target": 2}])),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), CoreErrorKind::Validation);
        assert_eq!(err.message(), "Edges reference non-existent nodes");
        assert!(iaps::Entity::find().all(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_validates_resulting_graph() {
        let db = setup_test_db().await;
        let ana = insert_user(&db, "Ana", "ana@example.com").await;
        let rui = insert_user(&db, "Rui", "rui@example.com").await;
        let service = IapService::new(db.clone());

        let iap = service
            .create(
                ana.id,
                plan(
                    "Plan",
                    json!([{"id": 1}, {"id": 2}]),
                    json!([{"source": 1, "target": 2}]),
                ),
            )
            .await
            .unwrap();

        // Dropping node 2 while keeping the stored edge leaves it dangling
        let err = service
            .update(
                ana.id,
                iap.id,
                IapInput {
                    nodes: Some(json!([{"id": 1}])),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Validation);

        let err = service
            .update(rui.id, iap.id, IapInput { name: Some("Mine".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Forbidden);

        let err = service
            .update(ana.id, 777, IapInput::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::NotFound);

        let updated = service
            .update(
                ana.id,
                iap.id,
                IapInput {
                    name: Some("Renamed".into()),
                    nodes: Some(json!([{"id": 1}, {"id": 2}, {"id": 3}])),
                    edges: Some(json!([
                        {"source": 1, "target": 2},
                        {"source": 2, "target": 3, "label": "completed"}
                    ])),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");

        let rows = activity_connections::Entity::find()
            .filter(activity_connections::Column::IapId.eq(iap.id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_deploy_snapshots_plan() {
        let db = setup_test_db().await;
        let ana = insert_user(&db, "Ana", "ana@example.com").await;
        let quiz = activity(&db, ana.id, "Quiz").await;
        let video = activity(&db, ana.id, "Video").await;
        let correct = metric(&db, quiz.id, "Correct answers").await;
        let service = IapService::new(db.clone());

        let iap = service
            .create(
                ana.id,
                plan(
                    "Course",
                    json!([{"id": video.id}, {"id": quiz.id}]),
                    json!([{"source": video.id, "target": quiz.id}]),
                ),
            )
            .await
            .unwrap();

        let deployment = service
            .deploy(
                ana.id,
                iap.id,
                DeployRequest {
                    deploy_url: Some("https://lms.example/course".to_string()),
                    objectives: vec![ObjectiveInput {
                        name: Some("Pass the quiz".to_string()),
                        analytics_id: Some(correct.id),
                        target: Some(80),
                    }],
                },
            )
            .await
            .unwrap();

        assert_eq!(deployment.iap_id, iap.id);
        assert_eq!(deployment.name, "Course");
        assert_eq!(deployment.nodes, iap.nodes);
        assert_eq!(
            deployment.objectives,
            json!([{"name": "Pass the quiz", "analytics_id": correct.id, "target": 80}])
        );
        assert!(service.get(iap.id).await.unwrap().is_deployed);

        let snapshot = deployed_iap_activities::Entity::find()
            .filter(deployed_iap_activities::Column::DeployedIapId.eq(deployment.id))
            .order_by_asc(deployed_iap_activities::Column::Position)
            .all(&db)
            .await
            .unwrap();
        assert_eq!(
            snapshot.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(),
            vec!["Video", "Quiz"]
        );

        let objective = objectives::Entity::find().one(&db).await.unwrap().unwrap();
        assert_eq!(objective.deployed_iap_id, deployment.id);
        assert_eq!(objective.target, 80);

        let err = service
            .deploy(
                ana.id,
                iap.id,
                DeployRequest {
                    deploy_url: Some("https://lms.example/again".to_string()),
                    objectives: vec![],
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.message(), "IAP is already deployed");
    }

    #[tokio::test]
    async fn test_deploy_rejects_foreign_analytics() {
        let db = setup_test_db().await;
        let ana = insert_user(&db, "Ana", "ana@example.com").await;
        let quiz = activity(&db, ana.id, "Quiz").await;
        let other = activity(&db, ana.id, "Unrelated").await;
        let foreign = metric(&db, other.id, "Clicks").await;
        let service = IapService::new(db.clone());

        let iap = service
            .create(ana.id, plan("Course", json!([{"id": quiz.id}]), json!([])))
            .await
            .unwrap();

        let err = service
            .deploy(
                ana.id,
                iap.id,
                DeployRequest {
                    deploy_url: Some("https://lms.example/course".to_string()),
                    objectives: vec![ObjectiveInput {
                        name: Some("Click around".to_string()),
                        analytics_id: Some(foreign.id),
                        target: Some(10),
                    }],
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Validation);

        let err = service
            .deploy(ana.id, iap.id, DeployRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.message(), "deploy_url is required");

        assert!(deployed_iaps::Entity::find().all(&db).await.unwrap().is_empty());
        assert!(!service.get(iap.id).await.unwrap().is_deployed);
    }

    #[tokio::test]
    async fn test_remove_cascades_deployments() {
        let db = setup_test_db().await;
        let ana = insert_user(&db, "Ana", "ana@example.com").await;
        let rui = insert_user(&db, "Rui", "rui@example.com").await;
        let quiz = activity(&db, ana.id, "Quiz").await;
        let correct = metric(&db, quiz.id, "Correct").await;
        let service = IapService::new(db.clone());

        let iap = service
            .create(
                ana.id,
                plan(
                    "Course",
                    json!([{"id": quiz.id}]),
                    json!([{"source": quiz.id, "target": quiz.id}]),
                ),
            )
            .await
            .unwrap();
        service
            .deploy(
                ana.id,
                iap.id,
                DeployRequest {
                    deploy_url: Some("https://lms.example/course".to_string()),
                    objectives: vec![ObjectiveInput {
                        name: Some("Pass".to_string()),
                        analytics_id: Some(correct.id),
                        target: Some(50),
                    }],
                },
            )
            .await
            .unwrap();

        let err = service.remove(rui.id, iap.id).await.unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Forbidden);

        service.remove(ana.id, iap.id).await.unwrap();

        assert!(iaps::Entity::find().all(&db).await.unwrap().is_empty());
        assert!(deployed_iaps::Entity::find().all(&db).await.unwrap().is_empty());
        assert!(deployed_iap_activities::Entity::find().all(&db).await.unwrap().is_empty());
        assert!(objectives::Entity::find().all(&db).await.unwrap().is_empty());
        assert!(objective_analytics::Entity::find().all(&db).await.unwrap().is_empty());
        assert!(activity_connections::Entity::find().all(&db).await.unwrap().is_empty());
        assert!(iap_ownership::Entity::find().all(&db).await.unwrap().is_empty());
        // The activity and its analytics belong to the activity, not the plan
        assert_eq!(analytics::Entity::find().all(&db).await.unwrap().len(), 1);
    }
}
