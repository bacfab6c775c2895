use axum::{extract::State, Extension, Json};

use super::auth::IdentityResponse;
use crate::error::UcpResult;
use crate::models::{BaseResponse, CharacterData, CharacterRef, DataResponse, RejectCharacterRequest};
use crate::session::Session;
use crate::state::AppState;

pub async fn check(Extension(session): Extension<Session>) -> Json<IdentityResponse> {
    Json(IdentityResponse::from(&session))
}

pub async fn waiting_list(
    State(state): State<AppState>,
) -> UcpResult<Json<DataResponse<Vec<CharacterData>>>> {
    Ok(Json(DataResponse::new(state.characters.list_waiting().await?)))
}

pub async fn accept_character(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<CharacterRef>,
) -> UcpResult<Json<BaseResponse>> {
    state
        .characters
        .accept(&session.identity.username, req)
        .await?;
    Ok(Json(BaseResponse::ok()))
}

pub async fn reject_character(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<RejectCharacterRequest>,
) -> UcpResult<Json<BaseResponse>> {
    state
        .characters
        .reject(&session.identity.username, req)
        .await?;
    Ok(Json(BaseResponse::ok()))
}
