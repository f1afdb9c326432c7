use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};

use crate::database::entities::{activities, users_activities};
use crate::errors::CoreResult;
use crate::server::app::AppState;
use crate::server::extractors::{ApiJson, ApiPath, ApiQuery, CurrentUser};
use crate::services::{ActivityFilter, ActivityInput, ActivityService};

pub async fn list_activities(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ActivityFilter>,
) -> CoreResult<Json<Vec<activities::Model>>> {
    Ok(Json(ActivityService::new(state.db).list(&filter).await?))
}

pub async fn create_activity(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(payload): ApiJson<ActivityInput>,
) -> CoreResult<(StatusCode, Json<activities::Model>)> {
    let activity = ActivityService::new(state.db)
        .create(current.id(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(activity)))
}

pub async fn get_activity(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> CoreResult<Json<activities::Model>> {
    Ok(Json(ActivityService::new(state.db).get(id).await?))
}

pub async fn update_activity(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<ActivityInput>,
) -> CoreResult<Json<activities::Model>> {
    Ok(Json(
        ActivityService::new(state.db)
            .update(current.id(), id, payload)
            .await?,
    ))
}

pub async fn delete_activity(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i32>,
) -> CoreResult<Json<Value>> {
    ActivityService::new(state.db)
        .remove(current.id(), id)
        .await?;
    Ok(Json(json!({ "message": "Activity deleted successfully" })))
}

pub async fn deploy_activity(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i32>,
) -> CoreResult<Json<activities::Model>> {
    Ok(Json(
        ActivityService::new(state.db)
            .deploy(current.id(), id)
            .await?,
    ))
}

pub async fn add_activity_to_user(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i32>,
) -> CoreResult<(StatusCode, Json<users_activities::Model>)> {
    let link = ActivityService::new(state.db)
        .add_to_user(current.id(), id)
        .await?;
    Ok((StatusCode::CREATED, Json(link)))
}
