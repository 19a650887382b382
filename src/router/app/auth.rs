use axum::{
    extract::{Extension, State},
    Form, Json,
};

use serde::Deserialize;

use std::sync::Arc;

use crate::{
    auth::Token,
    data::model::{User, UserCreate},
    error::AppResult,
    AppState,
};

#[derive(Deserialize, Debug)]
pub struct LogIn {
    username: String,
    password: String,
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(log_in): Form<LogIn>,
) -> AppResult<Json<Token>> {
    let token = state
        .auth
        .authenticate(&log_in.username, &log_in.password)
        .await?;

    Ok(Json(token))
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(sign_up): Json<UserCreate>,
) -> AppResult<Json<User>> {
    let user = state
        .auth
        .register(&sign_up.username, &sign_up.email, &sign_up.password)
        .await?;

    Ok(Json(user))
}

pub async fn me(Extension(current_user): Extension<User>) -> Json<User> {
    Json(current_user)
}
