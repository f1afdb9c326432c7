use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;

use crate::database::entities::analytics;
use crate::errors::CoreResult;
use crate::server::app::AppState;
use crate::server::extractors::{ApiJson, ApiPath, CurrentUser};
use crate::services::{AnalyticsService, IapAnalytics};

#[derive(Debug, Deserialize)]
pub struct CreateAnalyticsRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub score: i32,
}

pub async fn list_for_activity(
    State(state): State<AppState>,
    ApiPath(activity_id): ApiPath<i32>,
) -> CoreResult<Json<Vec<analytics::Model>>> {
    Ok(Json(
        AnalyticsService::new(state.db)
            .for_activity(activity_id)
            .await?,
    ))
}

pub async fn create_analytics(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(activity_id): ApiPath<i32>,
    ApiJson(payload): ApiJson<CreateAnalyticsRequest>,
) -> CoreResult<(StatusCode, Json<analytics::Model>)> {
    let row = AnalyticsService::new(state.db)
        .create(current.id(), activity_id, &payload.name)
        .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn list_for_iap(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(iap_id): ApiPath<i32>,
) -> CoreResult<Json<IapAnalytics>> {
    Ok(Json(
        AnalyticsService::new(state.db)
            .for_iap(current.id(), iap_id)
            .await?,
    ))
}

pub async fn set_score(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(analytics_id): ApiPath<i32>,
    ApiJson(payload): ApiJson<ScoreRequest>,
) -> CoreResult<Json<analytics::Model>> {
    Ok(Json(
        AnalyticsService::new(state.db)
            .set_score(current.id(), analytics_id, payload.score)
            .await?,
    ))
}
