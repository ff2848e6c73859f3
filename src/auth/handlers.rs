use axum::{
    extract::{rejection::JsonRejection, FromRef, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{error, instrument};

use crate::{
    auth::{
        dto::{
            CredentialsRequest, LoginResponse, MessageResponse, PublicUser, ResetConfirmRequest,
            ResetRequest,
        },
        jwt::{AuthUser, JwtKeys},
        reset::ResetService,
        services,
    },
    error::{ApiError, AuthError},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/reset_password", post(reset_password))
        .route("/reset_password/:token", post(reset_password_confirm))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to the Chatbot API" }))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let Json(payload) = payload?;
    services::signup(state.store.as_ref(), &payload.email, &payload.password).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::ok("Account successfully created")),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(payload) = payload?;
    let keys = JwtKeys::from_ref(&state);
    let token = services::login(state.store.as_ref(), &keys, &payload.email, &payload.password)
        .await
        .map_err(|e| match e {
            // Login keeps its own wording for an unknown email.
            AuthError::EmailNotFound => ApiError::new(
                StatusCode::BAD_REQUEST,
                "Email not found please create account",
            ),
            other => other.into(),
        })?;
    Ok(Json(LoginResponse {
        success: true,
        token,
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    payload: Result<Json<ResetRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(payload) = payload?;
    let reset = ResetService::from_ref(&state);
    reset.request_reset(&payload.email).await?;
    Ok(Json(MessageResponse::ok(
        "Password reset link sent to your email.",
    )))
}

#[instrument(skip_all)]
pub async fn reset_password_confirm(
    State(state): State<AppState>,
    Path(token): Path<String>,
    payload: Result<Json<ResetConfirmRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(payload) = payload?;
    let reset = ResetService::from_ref(&state);
    reset.confirm_reset(&token, &payload.password).await?;
    Ok(Json(MessageResponse::ok(
        "Password has been successfully reset.",
    )))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let user = state
        .store
        .find_by_id(user_id)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %user_id, "user lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string(),
            )
        })?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    Ok(Json(PublicUser {
        id: user.id,
        email: user.email,
        created_at: user.created_at,
    }))
}
