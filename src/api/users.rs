use crate::api::AppState;
use crate::api::schemas::users::CreateUser;
use crate::domain::user::{UserDocument, UserId};
use crate::error::Result;
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::{Map, Value};

pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let users = state.user_service.list().await?;
    Ok(Json(users.into_iter().map(UserDocument::into_json).collect::<Vec<_>>()))
}

pub async fn get_user(State(state): State<AppState>, Path(user_id): Path<String>) -> Result<impl IntoResponse> {
    let id: UserId = user_id.parse()?;
    let user = state.user_service.get(id).await?;
    Ok(Json(user.into_json()))
}

pub async fn create_user(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateUser>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(request) = payload?;
    let user = state.user_service.create(request.into()).await?;
    Ok((StatusCode::CREATED, Json(user.into_json())))
}

/// The identifier is validated before the body, so a malformed id is a 400 whatever the payload.
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: std::result::Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let id: UserId = user_id.parse()?;
    let Json(changes) = payload?;
    let user = state.user_service.update(id, changes).await?;
    Ok(Json(user.into_json()))
}

pub async fn delete_user(State(state): State<AppState>, Path(user_id): Path<String>) -> Result<impl IntoResponse> {
    let id: UserId = user_id.parse()?;
    state.user_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
