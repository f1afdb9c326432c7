use axum::{extract::State, response::Json};
use sea_orm::ConnectionTrait;
use serde_json::{json, Value};

use crate::errors::{CoreError, CoreResult};
use crate::server::app::AppState;

pub async fn health_check(State(state): State<AppState>) -> CoreResult<Json<Value>> {
    if let Err(err) = state.db.execute_unprepared("SELECT 1").await {
        tracing::warn!("Health check could not reach the database: {}", err);
        return Err(CoreError::unavailable("Database unavailable")
            .with_code("DATABASE_UNAVAILABLE")
            .with_source(err));
    }

    Ok(Json(json!({
        "status": "healthy",
        "service": "invenira-server",
        "version": env!("CARGO_PKG_VERSION"),
        "database": "connected"
    })))
}
