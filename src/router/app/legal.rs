use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};

use std::sync::Arc;

use crate::{
    ai::advisor::{Category, LegalAdvisor},
    data::model::{
        LegalQuery, LegalQueryChanges, LegalQueryCreate, LegalQueryUpdate, Pagination, User,
    },
    error::{AppError, AppResult},
    AppState,
};

const DEFAULT_LIMIT: u32 = 20;

fn query_not_found() -> AppError {
    AppError::NotFound("Legal query not found".to_string())
}

fn parse_category(label: &str) -> AppResult<Category> {
    label
        .parse::<Category>()
        .map_err(|e| AppError::Validation(e.to_string()))
}

fn validate_query(text: &str) -> AppResult<()> {
    if text.trim().is_empty() {
        return Err(AppError::Validation("Query must not be empty".to_string()));
    }
    Ok(())
}

/// Asks the advisor for an answer; a record carrying an error is never stored.
fn generate(advisor: &dyn LegalAdvisor, text: &str) -> AppResult<String> {
    let record = advisor.respond(text);
    if let Some(error) = &record.error {
        tracing::error!("legal response generation failed: {error}");
    }
    record.into_usable().ok_or(AppError::ResponseGenerationFailed)
}

/// Works out what an update changes. New query text regenerates the answer
/// and, unless the caller picked one, the category.
fn plan_update(
    advisor: &dyn LegalAdvisor,
    existing: &LegalQuery,
    update: LegalQueryUpdate,
) -> AppResult<LegalQueryChanges> {
    let mut changes = LegalQueryChanges {
        category: update.category.as_deref().map(parse_category).transpose()?,
        is_saved: update.is_saved,
        ..Default::default()
    };

    if let Some(query) = update.query {
        if query != existing.query {
            validate_query(&query)?;
            changes.response = Some(generate(advisor, &query)?);
            if changes.category.is_none() {
                changes.category = Some(advisor.categorize(&query));
            }
        }
        changes.query = Some(query);
    }

    Ok(changes)
}

#[axum::debug_handler]
pub async fn create_query(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(new_query): Json<LegalQueryCreate>,
) -> AppResult<Json<LegalQuery>> {
    validate_query(&new_query.query)?;
    let category = match new_query.category.as_deref() {
        Some(label) => parse_category(label)?,
        None => state.advisor.categorize(&new_query.query),
    };
    let response = generate(state.advisor.as_ref(), &new_query.query)?;

    let record = state
        .legal_repo
        .create(current_user.id, &new_query.query, &response, category)
        .await?;

    tracing::info!(query_id = record.id, %category, "answered legal query");
    Ok(Json(record))
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Vec<LegalQuery>>> {
    let records = state
        .legal_repo
        .list_for_user(current_user.id, false, page.skip, page.limit_or(DEFAULT_LIMIT))
        .await?;
    Ok(Json(records))
}

pub async fn saved(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Vec<LegalQuery>>> {
    let records = state
        .legal_repo
        .list_for_user(current_user.id, true, page.skip, page.limit_or(DEFAULT_LIMIT))
        .await?;
    Ok(Json(records))
}

pub async fn query_by_id(
    Path(query_id): Path<i64>,
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> AppResult<Json<LegalQuery>> {
    let record = state
        .legal_repo
        .find_owned(query_id, current_user.id)
        .await?
        .ok_or_else(query_not_found)?;
    Ok(Json(record))
}

#[axum::debug_handler]
pub async fn update_query(
    Path(query_id): Path<i64>,
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(update): Json<LegalQueryUpdate>,
) -> AppResult<Json<LegalQuery>> {
    let advisor = state.advisor.clone();
    let record = state
        .legal_repo
        .update_owned(query_id, current_user.id, |existing| {
            plan_update(advisor.as_ref(), existing, update)
        })
        .await?
        .ok_or_else(query_not_found)?;
    Ok(Json(record))
}

pub async fn delete_query(
    Path(query_id): Path<i64>,
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> AppResult<Json<LegalQuery>> {
    let record = state
        .legal_repo
        .delete_owned(query_id, current_user.id)
        .await?
        .ok_or_else(query_not_found)?;
    Ok(Json(record))
}
