use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::{request_id::RequestId, CurrentUser},
    models::CoupleView,
    routes::{payload::Payload, AppState},
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StartDateRequest {
    pub start_date: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct JoinRequest {
    pub code: String,
}

pub async fn get_couple(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<Json<CoupleView>> {
    let couple = state.pairing.get_couple(user_id).await?;
    Ok(Json(couple))
}

/// Handler for setting or clearing the relationship start date
pub async fn set_start_date(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Payload(request): Payload<StartDateRequest>,
) -> AppResult<Json<CoupleView>> {
    let couple = state
        .pairing
        .set_start_date(user_id, &request.start_date)
        .await?;
    Ok(Json(couple))
}

/// Handler for redeeming an invite code
pub async fn join(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    CurrentUser(user_id): CurrentUser,
    Payload(request): Payload<JoinRequest>,
) -> AppResult<Json<CoupleView>> {
    tracing::info!(request_id = %request_id, user_id, "Processing join request");

    let couple = state.pairing.join(user_id, &request.code).await?;
    Ok(Json(couple))
}
