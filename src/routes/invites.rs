use axum::{
    extract::{Path, State},
    http::{HeaderName, HeaderValue, StatusCode},
    Extension, Json,
};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::{request_id::RequestId, CurrentUser},
    models::Invite,
    routes::{AppState, HX_TRIGGER},
};

pub const INVITE_CREATED_TRIGGER: &str = "invite-created";

pub async fn list(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<Json<Vec<Invite>>> {
    let invites = state.pairing.list_invites(user_id).await?;
    Ok(Json(invites))
}

/// Handler for issuing a new invite code
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<(StatusCode, [(HeaderName, HeaderValue); 1], Json<Invite>)> {
    tracing::info!(request_id = %request_id, user_id, "Creating invite");

    let invite = state.pairing.create_invite(user_id).await?;

    Ok((
        StatusCode::CREATED,
        [(HX_TRIGGER, HeaderValue::from_static(INVITE_CREATED_TRIGGER))],
        Json(invite),
    ))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(code): Path<String>,
) -> AppResult<Json<Invite>> {
    let invite = state.pairing.get_invite(user_id, &code).await?;
    Ok(Json(invite))
}
