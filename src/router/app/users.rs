use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};

use std::sync::Arc;

use crate::{
    data::model::{Pagination, User, UserUpdate},
    error::{AppError, AppResult},
    AppState,
};

const DEFAULT_LIMIT: u32 = 100;

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Vec<User>>> {
    let users = state
        .user_repo
        .list(page.skip, page.limit_or(DEFAULT_LIMIT))
        .await?;
    Ok(Json(users))
}

pub async fn user_by_id(
    Path(user_id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<User>> {
    let user = state
        .user_repo
        .find_by_id(user_id)
        .await?
        .ok_or_else(user_not_found)?;
    Ok(Json(user))
}

#[axum::debug_handler]
pub async fn update_user(
    Path(user_id): Path<i64>,
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(update): Json<UserUpdate>,
) -> AppResult<Json<User>> {
    if current_user.id != user_id {
        return Err(AppError::Forbidden(
            "Not authorized to update this user".to_string(),
        ));
    }

    let changes = state.auth.prepare_changes(update).await?;
    let user = state
        .user_repo
        .update(user_id, changes)
        .await?
        .ok_or_else(user_not_found)?;

    tracing::info!(user_id, "updated user");
    Ok(Json(user))
}

pub async fn delete_user(
    Path(user_id): Path<i64>,
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> AppResult<Json<User>> {
    if current_user.id != user_id {
        return Err(AppError::Forbidden(
            "Not authorized to delete this user".to_string(),
        ));
    }

    let user = state
        .user_repo
        .delete(user_id)
        .await?
        .ok_or_else(user_not_found)?;

    tracing::info!(user_id, "deleted user");
    Ok(Json(user))
}
