use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};

use crate::database::entities::{deployed_iaps, iaps};
use crate::errors::CoreResult;
use crate::server::app::AppState;
use crate::server::extractors::{ApiJson, ApiPath, ApiQuery, CurrentUser};
use crate::services::{DeployRequest, IapFilter, IapInput, IapService};

pub async fn list_iaps(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<IapFilter>,
) -> CoreResult<Json<Vec<iaps::Model>>> {
    Ok(Json(IapService::new(state.db).list(&filter).await?))
}

pub async fn create_iap(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(payload): ApiJson<IapInput>,
) -> CoreResult<(StatusCode, Json<iaps::Model>)> {
    let iap = IapService::new(state.db).create(current.id(), payload).await?;
    Ok((StatusCode::CREATED, Json(iap)))
}

pub async fn get_iap(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> CoreResult<Json<iaps::Model>> {
    Ok(Json(IapService::new(state.db).get(id).await?))
}

pub async fn update_iap(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<IapInput>,
) -> CoreResult<Json<iaps::Model>> {
    Ok(Json(
        IapService::new(state.db)
            .update(current.id(), id, payload)
            .await?,
    ))
}

pub async fn delete_iap(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i32>,
) -> CoreResult<Json<Value>> {
    IapService::new(state.db).remove(current.id(), id).await?;
    Ok(Json(json!({ "message": "IAP deleted successfully" })))
}

pub async fn deploy_iap(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<DeployRequest>,
) -> CoreResult<(StatusCode, Json<deployed_iaps::Model>)> {
    let deployment = IapService::new(state.db)
        .deploy(current.id(), id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(deployment)))
}
