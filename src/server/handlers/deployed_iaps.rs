use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::entities::{deployed_iap_activities, deployed_iaps, iap_ownership, objectives};
use crate::errors::CoreResult;
use crate::server::app::AppState;
use crate::server::extractors::{ApiPath, ApiQuery, CurrentUser};
use crate::services::{DeployedIapService, DeployedIapView, UserStatistics};

#[derive(Debug, Default, Deserialize)]
pub struct ViewerQuery {
    pub user_id: Option<i32>,
}

pub async fn list_deployed_iaps(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ViewerQuery>,
) -> CoreResult<Json<Vec<DeployedIapView>>> {
    Ok(Json(
        DeployedIapService::new(state.db)
            .list_all(query.user_id)
            .await?,
    ))
}

pub async fn list_for_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i32>,
) -> CoreResult<Json<Vec<DeployedIapView>>> {
    Ok(Json(DeployedIapService::new(state.db).by_user(user_id).await?))
}

pub async fn list_for_iap(
    State(state): State<AppState>,
    ApiPath(iap_id): ApiPath<i32>,
) -> CoreResult<Json<Vec<deployed_iaps::Model>>> {
    Ok(Json(DeployedIapService::new(state.db).by_iap(iap_id).await?))
}

pub async fn delete_for_iap(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(iap_id): ApiPath<i32>,
) -> CoreResult<Json<Value>> {
    let deleted = DeployedIapService::new(state.db)
        .remove_by_iap(current.id(), iap_id)
        .await?;
    Ok(Json(json!({ "deleted": deleted })))
}

pub async fn get_deployed_iap(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> CoreResult<Json<deployed_iaps::Model>> {
    Ok(Json(DeployedIapService::new(state.db).get(id).await?))
}

pub async fn delete_deployed_iap(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i32>,
) -> CoreResult<Json<Value>> {
    DeployedIapService::new(state.db)
        .remove(current.id(), id)
        .await?;
    Ok(Json(json!({ "message": "Deployed IAP deleted successfully" })))
}

pub async fn add_to_user(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i32>,
) -> CoreResult<(StatusCode, Json<iap_ownership::Model>)> {
    let link = DeployedIapService::new(state.db)
        .add_to_user(current.id(), id)
        .await?;
    Ok((StatusCode::CREATED, Json(link)))
}

pub async fn list_activities(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> CoreResult<Json<Vec<deployed_iap_activities::Model>>> {
    Ok(Json(DeployedIapService::new(state.db).activities(id).await?))
}

pub async fn list_objectives(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> CoreResult<Json<Vec<objectives::Model>>> {
    Ok(Json(DeployedIapService::new(state.db).objectives(id).await?))
}

pub async fn statistics(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> CoreResult<Json<Vec<UserStatistics>>> {
    Ok(Json(DeployedIapService::new(state.db).statistics(id).await?))
}
