use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::CurrentUser,
    candidates::{
        dto::{CandidateOut, ListCandidatesQuery},
        repo_types::{CandidatePatch, NewCandidate},
        services,
    },
    error::AppError,
    pagination::total_count_header,
    state::AppState,
};

pub fn candidate_routes() -> Router<AppState> {
    Router::new()
        .route("/candidates", post(create_candidate).get(list_candidates))
        .route(
            "/candidates/:id",
            get(get_candidate)
                .put(update_candidate)
                .delete(delete_candidate),
        )
        .route("/candidates/:id/purge", delete(purge_candidate))
}

#[instrument(skip(state, actor, payload), fields(actor_id = actor.id))]
pub async fn create_candidate(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(payload): Json<NewCandidate>,
) -> Result<Json<CandidateOut>, AppError> {
    let candidate = services::create(&state.db, payload).await?;
    Ok(Json(candidate.into()))
}

#[instrument(skip(state, actor), fields(actor_id = actor.id))]
pub async fn list_candidates(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Query(query): Query<ListCandidatesQuery>,
) -> Result<(HeaderMap, Json<Vec<CandidateOut>>), AppError> {
    let (rows, total) = services::list(&state.db, &query).await?;
    let items = rows.into_iter().map(CandidateOut::from).collect();
    Ok((total_count_header(total), Json(items)))
}

#[instrument(skip(state, actor), fields(actor_id = actor.id))]
pub async fn get_candidate(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<CandidateOut>, AppError> {
    let candidate = services::get(&state.db, id).await?;
    Ok(Json(candidate.into()))
}

#[instrument(skip(state, actor, payload), fields(actor_id = actor.id))]
pub async fn update_candidate(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<CandidatePatch>,
) -> Result<Json<CandidateOut>, AppError> {
    let candidate = services::update(&state.db, id, payload).await?;
    Ok(Json(candidate.into()))
}

#[instrument(skip(state, actor), fields(actor_id = actor.id))]
pub async fn delete_candidate(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    services::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, actor), fields(actor_id = actor.id))]
pub async fn purge_candidate(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    services::purge(&state.db, &actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
