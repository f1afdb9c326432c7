use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::database::entities::users;
use crate::errors::CoreResult;
use crate::server::app::AppState;
use crate::server::extractors::{ApiJson, ApiPath, CurrentUser};
use crate::services::{UserService, UserUpdate};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: users::Model,
    pub session_id: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

fn service(state: &AppState) -> UserService {
    UserService::new(state.db.clone(), state.auth)
}

pub async fn list_users(State(state): State<AppState>) -> CoreResult<Json<Vec<users::Model>>> {
    Ok(Json(service(&state).list().await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateUserRequest>,
) -> CoreResult<(StatusCode, Json<users::Model>)> {
    let user = service(&state)
        .create(&payload.name, &payload.email, &payload.password)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> CoreResult<Json<LoginResponse>> {
    let (user, session) = service(&state)
        .login(&payload.email, &payload.password)
        .await?;

    Ok(Json(LoginResponse {
        user,
        session_id: session.session_id,
        expires_at: session.expires_at,
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    current: CurrentUser,
) -> CoreResult<Json<Value>> {
    service(&state).logout(&current.session_id).await?;
    Ok(Json(json!({ "message": "Logged out" })))
}

pub async fn current_user(current: CurrentUser) -> Json<users::Model> {
    Json(current.user)
}

pub async fn get_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> CoreResult<Json<users::Model>> {
    Ok(Json(service(&state).get(id).await?))
}

pub async fn update_user(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<UserUpdate>,
) -> CoreResult<Json<users::Model>> {
    Ok(Json(service(&state).update(current.id(), id, payload).await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i32>,
) -> CoreResult<Json<Value>> {
    service(&state).remove(current.id(), id).await?;
    Ok(Json(json!({ "message": "User deleted successfully" })))
}
