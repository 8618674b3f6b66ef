use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::CurrentUser,
    error::AppError,
    pagination::{total_count_header, Pagination},
    state::AppState,
    users::{
        dto::{PublicUser, RegisterRequest, UpdateUserRequest},
        services,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user).get(list_users))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<PublicUser>, AppError> {
    let user = services::register(&state.db, payload).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, actor), fields(actor_id = actor.id))]
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Query(page): Query<Pagination>,
) -> Result<(HeaderMap, Json<Vec<PublicUser>>), AppError> {
    let (skip, limit) = page.window();
    let (users, total) = services::list(&state.db, &actor, skip, limit).await?;
    let items = users.into_iter().map(PublicUser::from).collect();
    Ok((total_count_header(total), Json(items)))
}

#[instrument(skip(state, actor), fields(actor_id = actor.id))]
pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<PublicUser>, AppError> {
    let user = services::get(&state.db, &actor, id).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, actor, payload), fields(actor_id = actor.id))]
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<PublicUser>, AppError> {
    let user = services::update(&state.db, &actor, id, payload).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, actor), fields(actor_id = actor.id))]
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    services::delete(&state.db, &actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
