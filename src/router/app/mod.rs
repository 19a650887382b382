use axum::{
    routing::{get, post},
    Router,
};

use std::sync::Arc;

use crate::AppState;

mod home;
use home::{health_check, root};
mod auth;
use auth::{login, me, register};
mod users;
use users::{delete_user, list_users, update_user, user_by_id};
mod profiles;
use profiles::{create_profile, own_profile, profile_by_user, update_own_profile};
mod legal;
use legal::{create_query, delete_query, history, query_by_id, saved, update_query};

use crate::middleware::auth;

pub fn app_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/me", get(me))
        .route("/api/users", get(list_users))
        .route("/api/users/", get(list_users))
        .route(
            "/api/users/:id",
            get(user_by_id).put(update_user).delete(delete_user),
        )
        .route("/api/profiles", post(create_profile))
        .route("/api/profiles/", post(create_profile))
        .route("/api/profiles/me", get(own_profile).put(update_own_profile))
        .route("/api/profiles/:user_id", get(profile_by_user))
        .route("/api/legal/query", post(create_query))
        .route("/api/legal/history", get(history))
        .route("/api/legal/saved", get(saved))
        .route(
            "/api/legal/:id",
            get(query_by_id).put(update_query).delete(delete_query),
        )
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), auth));

    Router::new()
        .route("/", get(root))
        .route("/api/health-check", get(health_check))
        .route("/api/token", post(login))
        .route("/api/register", post(register))
        .merge(protected)
        .with_state(state)
}
