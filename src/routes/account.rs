use axum::{extract::State, Extension, Json};

use crate::error::UcpResult;
use crate::models::{
    AccountStats, BaseResponse, CharacterData, DataResponse, ServerStats, StaffMember,
};
use crate::session::Session;
use crate::state::AppState;

pub async fn get_data(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> UcpResult<Json<DataResponse<AccountStats>>> {
    let stats = state
        .reports
        .account_stats(&session.identity.username)
        .await?;
    Ok(Json(DataResponse::new(stats)))
}

pub async fn get_staff(
    State(state): State<AppState>,
) -> UcpResult<Json<DataResponse<Vec<StaffMember>>>> {
    Ok(Json(DataResponse::new(state.reports.staff().await?)))
}

pub async fn server_stats(
    State(state): State<AppState>,
) -> UcpResult<Json<DataResponse<ServerStats>>> {
    Ok(Json(DataResponse::new(state.reports.server_stats().await?)))
}

pub async fn create_character(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<CharacterData>,
) -> UcpResult<Json<BaseResponse>> {
    state
        .characters
        .propose(&session.identity.username, req)
        .await?;
    Ok(Json(BaseResponse::ok()))
}
