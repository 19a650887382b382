use axum::{
    extract::{Extension, Path, State},
    Json,
};

use std::sync::Arc;

use crate::{
    data::model::{Profile, ProfileFields, User},
    error::{AppError, AppResult},
    AppState,
};

fn profile_not_found() -> AppError {
    AppError::NotFound("Profile not found".to_string())
}

#[axum::debug_handler]
pub async fn create_profile(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(fields): Json<ProfileFields>,
) -> AppResult<Json<Profile>> {
    let profile = state
        .profile_repo
        .create(current_user.id, fields)
        .await?
        .ok_or(AppError::ProfileExists)?;
    Ok(Json(profile))
}

pub async fn own_profile(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> AppResult<Json<Profile>> {
    let profile = state
        .profile_repo
        .find_by_user(current_user.id)
        .await?
        .ok_or_else(profile_not_found)?;
    Ok(Json(profile))
}

#[axum::debug_handler]
pub async fn update_own_profile(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(fields): Json<ProfileFields>,
) -> AppResult<Json<Profile>> {
    let profile = state.profile_repo.upsert(current_user.id, fields).await?;
    Ok(Json(profile))
}

/// Profiles are private: only the owner may read one by user id.
pub async fn profile_by_user(
    Path(user_id): Path<i64>,
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> AppResult<Json<Profile>> {
    if current_user.id != user_id {
        return Err(AppError::Forbidden(
            "Not authorized to view this profile".to_string(),
        ));
    }

    let profile = state
        .profile_repo
        .find_by_user(user_id)
        .await?
        .ok_or_else(profile_not_found)?;
    Ok(Json(profile))
}
