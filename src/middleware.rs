use axum::{
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};

use std::sync::Arc;

use crate::{error::AppError, AppState};

fn bearer_token<B>(req: &Request<B>) -> Option<&str> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolves the bearer token to an active user and hands it to the handler
/// as an `Extension<User>`.
pub async fn auth<B>(
    State(state): State<Arc<AppState>>,
    mut req: Request<B>,
    next: Next<B>,
) -> Result<Response, AppError>
where
    B: Send + 'static,
{
    let token = bearer_token(&req).ok_or(AppError::MissingToken)?;

    let current_user = state.auth.resolve(token).await.map_err(|e| {
        tracing::debug!("rejected bearer token: {e}");
        e
    })?;

    // the handler extracts the user from here
    req.extensions_mut().insert(current_user);
    Ok(next.run(req).await)
}
