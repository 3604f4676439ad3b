use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::auth_service::{self, CredentialsRequest, REFRESH_COOKIE};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
}

async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<CredentialsRequest>,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    let (user, tokens) = auth_service::register(&state, &request).await?;
    let jar = jar.add(auth_service::refresh_cookie(
        &state.config,
        tokens.refresh_token,
    ));
    Ok((
        jar,
        Json(json!({ "user": user, "accessToken": tokens.access_token })),
    ))
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<CredentialsRequest>,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    let (user, tokens) = auth_service::login(&state, &request).await?;
    let jar = jar.add(auth_service::refresh_cookie(
        &state.config,
        tokens.refresh_token,
    ));
    Ok((
        jar,
        Json(json!({ "user": user, "accessToken": tokens.access_token })),
    ))
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: Option<String>,
}

/// Rotates the token pair. The refresh token comes from the cookie, or from
/// the body for clients that cannot send cookies.
async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    let token = jar
        .get(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .or_else(|| body.and_then(|Json(request)| request.refresh_token))
        .ok_or_else(|| ApiError::unauthorized("Missing refresh token"))?;

    let (user, tokens) = auth_service::refresh(&state, &token).await?;
    let jar = jar.add(auth_service::refresh_cookie(
        &state.config,
        tokens.refresh_token,
    ));
    Ok((
        jar,
        Json(json!({ "user": user, "accessToken": tokens.access_token })),
    ))
}

async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    let jar = jar.add(auth_service::removal_cookie(&state.config));
    Ok((jar, Json(json!({ "success": true }))))
}

async fn me(State(state): State<AppState>, user: AuthUser) -> Result<Json<Value>, ApiError> {
    let user = auth_service::find_user(&state, user.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired token"))?;
    Ok(Json(json!(user)))
}
