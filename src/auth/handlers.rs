use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Form, Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{TokenRequest, TokenResponse},
        extractors::CurrentUser,
        jwt::JwtKeys,
    },
    error::AppError,
    state::AppState,
    users::{dto::PublicUser, services},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/token", post(login_for_access_token))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, form), fields(username = %form.username))]
pub async fn login_for_access_token(
    State(state): State<AppState>,
    Form(form): Form<TokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = services::authenticate(&state.db, &form.username, &form.password)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.issue(&user.email, None)?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
        expires_in: keys.ttl().whole_seconds(),
    }))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(user.into())
}
