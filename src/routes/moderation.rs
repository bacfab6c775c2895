use axum::{extract::State, Extension, Json};
use serde::Deserialize;

use super::require_admin;
use crate::error::UcpResult;
use crate::models::{
    AjailRequest, BanEntry, BanRequest, BaseResponse, CharacterRef, DataResponse, LogsRequest,
    LogsResponse, UnbanRequest,
};
use crate::session::Session;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FetchCharacterRequest {
    pub character_name: String,
}

pub async fn fetch_character(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<FetchCharacterRequest>,
) -> UcpResult<Json<DataResponse<CharacterRef>>> {
    require_admin(&session)?;
    let found = state
        .moderation
        .fetch_character(&session.identity.username, &req.character_name)
        .await?;
    Ok(Json(DataResponse::new(found)))
}

pub async fn ban_list(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> UcpResult<Json<DataResponse<Vec<BanEntry>>>> {
    require_admin(&session)?;
    let bans = state
        .moderation
        .ban_list(&session.identity.username)
        .await?;
    Ok(Json(DataResponse::new(bans)))
}

pub async fn ban(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<BanRequest>,
) -> UcpResult<Json<BaseResponse>> {
    require_admin(&session)?;
    state.accounts.ban(&session.identity.username, req).await?;
    Ok(Json(BaseResponse::ok()))
}

pub async fn unban(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<UnbanRequest>,
) -> UcpResult<Json<BaseResponse>> {
    require_admin(&session)?;
    state
        .accounts
        .unban(&session.identity.username, &req.username)
        .await?;
    Ok(Json(BaseResponse::ok()))
}

pub async fn ajail(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<AjailRequest>,
) -> UcpResult<Json<BaseResponse>> {
    require_admin(&session)?;
    state
        .moderation
        .ajail(&session.identity.username, req)
        .await?;
    Ok(Json(BaseResponse::ok()))
}

pub async fn logs(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<LogsRequest>,
) -> UcpResult<Json<LogsResponse>> {
    let logs = state
        .moderation
        .logs(&session.identity.username, &req.category)
        .await?;
    Ok(Json(LogsResponse {
        base: BaseResponse::ok(),
        logs,
    }))
}
