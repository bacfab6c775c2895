use axum::{
    extract::{Query, State},
    response::Response,
    Extension, Json,
};
use serde::Serialize;

use super::found;
use crate::error::UcpResult;
use crate::models::{
    BaseResponse, LoginRequest, RegisterRequest, ResetRequestQuery, SessionResponse, TokenQuery,
    UpdatePasswordRequest,
};
use crate::session::Session;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct IdentityResponse {
    #[serde(flatten)]
    pub base: BaseResponse,
    pub user: String,
    pub is_admin: bool,
    pub is_tester: bool,
}

impl From<&Session> for IdentityResponse {
    fn from(session: &Session) -> Self {
        Self {
            base: BaseResponse::ok(),
            user: session.identity.username.clone(),
            is_admin: session.identity.is_admin(),
            is_tester: session.identity.is_tester(),
        }
    }
}

// ─── Logged-out routes ───

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> UcpResult<Json<BaseResponse>> {
    state.accounts.register(req).await?;
    Ok(Json(BaseResponse::ok()))
}

pub async fn confirm(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> UcpResult<Response> {
    let parts = query.into_parts()?;
    state
        .accounts
        .confirm(&parts.email, &parts.token, parts.issued_at)
        .await?;
    Ok(found(state.links.home().as_str()))
}

pub async fn reset_request(
    State(state): State<AppState>,
    Query(query): Query<ResetRequestQuery>,
) -> UcpResult<Json<BaseResponse>> {
    let email = query.email.unwrap_or_default();
    state.accounts.request_password_reset(&email).await?;
    Ok(Json(BaseResponse::ok()))
}

/// Link target of the reset mail: checks the token, then sends the browser to the password form.
pub async fn confirm_reset(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> UcpResult<Response> {
    let parts = query.into_parts()?;
    state
        .accounts
        .check_reset_token(&parts.email, &parts.token, parts.issued_at)?;
    let form = state
        .links
        .password_form(&parts.email, &parts.token, parts.issued_at);
    Ok(found(form.as_str()))
}

pub async fn update_password(
    State(state): State<AppState>,
    Json(req): Json<UpdatePasswordRequest>,
) -> UcpResult<Json<BaseResponse>> {
    state.accounts.reset_password(req).await?;
    Ok(Json(BaseResponse::ok()))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> UcpResult<Json<SessionResponse>> {
    let identity = state.accounts.login(&req.username, &req.password).await?;
    let token = state.sessions.issue(&identity)?;
    tracing::info!(username = %identity.username, "Session opened");

    Ok(Json(SessionResponse {
        base: BaseResponse::ok(),
        token,
        is_admin: identity.is_admin(),
        is_tester: identity.is_tester(),
        user: identity.username,
    }))
}

// ─── Session routes ───

pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Json<BaseResponse> {
    state.sessions.revoke(&session.claims);
    tracing::info!(username = %session.identity.username, "Session closed");
    Json(BaseResponse::ok())
}

pub async fn check_auth(Extension(session): Extension<Session>) -> Json<IdentityResponse> {
    Json(IdentityResponse::from(&session))
}
