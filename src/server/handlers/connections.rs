use axum::{extract::State, response::Json};

use crate::database::entities::activity_connections;
use crate::errors::CoreResult;
use crate::server::app::AppState;
use crate::server::extractors::ApiPath;
use crate::services::ActivityConnectionService;

pub async fn list_connections(
    State(state): State<AppState>,
) -> CoreResult<Json<Vec<activity_connections::Model>>> {
    Ok(Json(ActivityConnectionService::new(state.db).list().await?))
}

pub async fn for_iap(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> CoreResult<Json<Vec<activity_connections::Model>>> {
    Ok(Json(ActivityConnectionService::new(state.db).by_iap(id).await?))
}

pub async fn for_activity(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> CoreResult<Json<Vec<activity_connections::Model>>> {
    Ok(Json(
        ActivityConnectionService::new(state.db)
            .by_activity(id)
            .await?,
    ))
}
