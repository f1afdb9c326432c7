use anyhow::{Context, Result};
use axum::{
    http::HeaderValue,
    routing::{delete, get, post, put},
    Router,
};
use sea_orm::DatabaseConnection;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    activities, analytics, connections, deployed_iaps, health, iaps, progress, users,
};
use crate::config::AuthSettings;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub auth: AuthSettings,
}

pub async fn create_app(
    db: DatabaseConnection,
    cors_origin: Option<&str>,
    auth: AuthSettings,
) -> Result<Router> {
    let state = AppState { db, auth };

    let cors = match cors_origin {
        Some(origin) if origin != "*" => CorsLayer::new()
            .allow_origin(
                origin
                    .parse::<HeaderValue>()
                    .with_context(|| format!("Invalid CORS origin '{}'", origin))?,
            )
            .allow_methods(Any)
            .allow_headers(Any),
        _ => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(health::health_check))
        .merge(user_routes())
        .merge(activity_routes())
        .merge(iap_routes())
        .merge(deployed_iap_routes())
        .merge(progress_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state);

    Ok(app)
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/login", post(users::login))
        .route("/users/logout", post(users::logout))
        .route("/users/me", get(users::current_user))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/:id/deployed-iaps", get(deployed_iaps::list_for_user))
}

fn activity_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/activities",
            get(activities::list_activities).post(activities::create_activity),
        )
        .route(
            "/activities/:id",
            get(activities::get_activity)
                .put(activities::update_activity)
                .delete(activities::delete_activity),
        )
        .route("/activities/:id/deploy", post(activities::deploy_activity))
        .route("/activities/:id/add-to-user", post(activities::add_activity_to_user))
        .route("/activities/:id/connections", get(connections::for_activity))
        .route(
            "/activities/:id/analytics",
            get(analytics::list_for_activity).post(analytics::create_analytics),
        )
        .route(
            "/activities/:id/progress",
            get(progress::get_activity_progress).post(progress::record_activity_progress),
        )
        .route("/analytics/:id/score", put(analytics::set_score))
        .route("/activity-connections", get(connections::list_connections))
}

fn iap_routes() -> Router<AppState> {
    Router::new()
        .route("/iaps", get(iaps::list_iaps).post(iaps::create_iap))
        .route(
            "/iaps/:id",
            get(iaps::get_iap).put(iaps::update_iap).delete(iaps::delete_iap),
        )
        .route("/iaps/:id/deploy", post(iaps::deploy_iap))
        .route("/iaps/:id/analytics", get(analytics::list_for_iap))
        .route("/iaps/:id/connections", get(connections::for_iap))
        .route(
            "/iaps/:id/deployments",
            get(deployed_iaps::list_for_iap).delete(deployed_iaps::delete_for_iap),
        )
}

fn deployed_iap_routes() -> Router<AppState> {
    Router::new()
        .route("/deployed-iaps", get(deployed_iaps::list_deployed_iaps))
        .route(
            "/deployed-iaps/:id",
            get(deployed_iaps::get_deployed_iap).delete(deployed_iaps::delete_deployed_iap),
        )
        .route("/deployed-iaps/:id/add-to-user", post(deployed_iaps::add_to_user))
        .route("/deployed-iaps/:id/activities", get(deployed_iaps::list_activities))
        .route("/deployed-iaps/:id/objectives", get(deployed_iaps::list_objectives))
        .route(
            "/deployed-iaps/:id/objectives/progress",
            get(progress::objective_progress),
        )
        .route("/deployed-iaps/:id/statistics", get(deployed_iaps::statistics))
        .route("/deployed-iaps/:id/scores", delete(progress::clear_scores))
}

fn progress_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/progress",
            get(progress::get_progress).post(progress::record_progress),
        )
        .route("/progress/all", get(progress::list_progress))
}
