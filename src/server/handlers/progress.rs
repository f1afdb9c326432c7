use axum::{extract::State, response::Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::CoreResult;
use crate::server::app::AppState;
use crate::server::extractors::{ApiJson, ApiPath, ApiQuery, CurrentUser};
use crate::services::{ActivityScore, ObjectiveProgress, ProgressAck, ProgressService};

#[derive(Debug, Deserialize)]
pub struct RecordProgressRequest {
    pub deployed_iap_id: i32,
    pub activity_id: i32,
    pub score: i32,
}

#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    pub user_id: i32,
    pub deployed_iap_id: i32,
    pub activity_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct DeploymentProgressQuery {
    pub user_id: i32,
    pub deployed_iap_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct ActivityProgressRequest {
    pub progress: i32,
}

pub async fn record_progress(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(payload): ApiJson<RecordProgressRequest>,
) -> CoreResult<Json<ProgressAck>> {
    Ok(Json(
        ProgressService::new(state.db)
            .record(
                current.id(),
                payload.deployed_iap_id,
                payload.activity_id,
                payload.score,
            )
            .await?,
    ))
}

pub async fn get_progress(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProgressQuery>,
) -> CoreResult<Json<Value>> {
    let score = ProgressService::new(state.db)
        .activity_score(query.user_id, query.deployed_iap_id, query.activity_id)
        .await?;
    Ok(Json(json!({ "score": score })))
}

pub async fn list_progress(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DeploymentProgressQuery>,
) -> CoreResult<Json<Vec<ActivityScore>>> {
    Ok(Json(
        ProgressService::new(state.db)
            .deployment_scores(query.user_id, query.deployed_iap_id)
            .await?,
    ))
}

pub async fn clear_scores(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(deployed_iap_id): ApiPath<i32>,
) -> CoreResult<Json<Value>> {
    let deleted = ProgressService::new(state.db)
        .delete_by_deployed_iap(current.id(), deployed_iap_id)
        .await?;
    Ok(Json(json!({ "deleted": deleted })))
}

pub async fn get_activity_progress(
    State(state): State<AppState>,
    ApiPath(activity_id): ApiPath<i32>,
) -> CoreResult<Json<Value>> {
    let progress = ProgressService::new(state.db)
        .activity_progress(activity_id)
        .await?;
    Ok(Json(json!({ "activity_id": activity_id, "progress": progress })))
}

pub async fn record_activity_progress(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(activity_id): ApiPath<i32>,
    ApiJson(payload): ApiJson<ActivityProgressRequest>,
) -> CoreResult<Json<Value>> {
    let row = ProgressService::new(state.db)
        .record_activity_progress(current.id(), activity_id, payload.progress)
        .await?;
    Ok(Json(json!({ "activity_id": activity_id, "progress": row.score })))
}

pub async fn objective_progress(
    State(state): State<AppState>,
    ApiPath(deployed_iap_id): ApiPath<i32>,
) -> CoreResult<Json<Vec<ObjectiveProgress>>> {
    Ok(Json(
        ProgressService::new(state.db)
            .objective_progress(deployed_iap_id)
            .await?,
    ))
}
