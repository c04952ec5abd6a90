use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::{request_id::RequestId, CurrentUser, HxRequest},
    models::{
        CanvasItem, ColorInput, ColorUpdate, CornerColors, CornerView, ItemId, Lenient,
        LenientFlag,
    },
    routes::{payload::Payload, AppState, HX_TRIGGER},
    services::corner::Placement,
};

pub const ITEM_REMOVED_TRIGGER: &str = "itemRemoved";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PlaceRequest {
    pub item_key: Option<String>,
    pub x: Lenient,
    pub y: Lenient,
    pub z: Lenient,
    pub rotation: Lenient,
    pub scale: Lenient,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NudgeRequest {
    pub dx: Lenient,
    pub dy: Lenient,
    pub drot: Lenient,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HeightRequest {
    pub dz: Lenient,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PositionRequest {
    pub x: Lenient,
    pub y: Lenient,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ScaleRequest {
    pub scale: Lenient,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LayerRequest {
    pub layer: Lenient,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StackRequest {
    pub dir: Lenient,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TiltRequest {
    pub tilt_x: Lenient,
    pub tilt_y: Lenient,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FlipRequest {
    pub flip_x: LenientFlag,
    pub flip_y: LenientFlag,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ColorRequest {
    pub color: ColorInput,
}

/// Handler for the corner view
pub async fn view(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<Json<CornerView>> {
    let view = state.corner.view(user_id).await?;
    Ok(Json(view))
}

pub async fn place(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    CurrentUser(user_id): CurrentUser,
    Payload(request): Payload<PlaceRequest>,
) -> AppResult<(StatusCode, Json<CanvasItem>)> {
    tracing::info!(
        request_id = %request_id,
        user_id,
        item_key = ?request.item_key,
        "Placing item"
    );

    let placement = Placement {
        item_key: request.item_key,
        x: request.x.value(),
        y: request.y.value(),
        z: request.z.value(),
        rotation: request.rotation.value(),
        scale: request.scale.value(),
    };
    let item = state.corner.place(user_id, placement).await?;

    Ok((StatusCode::CREATED, Json(item)))
}

/// Handler for item removal. Fragment callers get an empty body; both flows
/// carry the `itemRemoved` trigger.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    CurrentUser(user_id): CurrentUser,
    HxRequest(fragment): HxRequest,
    Path(item_id): Path<ItemId>,
) -> AppResult<Response> {
    tracing::info!(request_id = %request_id, user_id, item_id, "Removing item");

    state.corner.delete(user_id, item_id).await?;

    let trigger = [(HX_TRIGGER, HeaderValue::from_static(ITEM_REMOVED_TRIGGER))];
    let response = if fragment {
        (trigger, "").into_response()
    } else {
        (trigger, Json(json!({ "deleted": item_id }))).into_response()
    };
    Ok(response)
}

pub async fn nudge(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<ItemId>,
    Payload(request): Payload<NudgeRequest>,
) -> AppResult<Json<CanvasItem>> {
    let item = state
        .corner
        .nudge(
            user_id,
            item_id,
            request.dx.value(),
            request.dy.value(),
            request.drot.value(),
        )
        .await?;
    Ok(Json(item))
}

pub async fn height(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<ItemId>,
    Payload(request): Payload<HeightRequest>,
) -> AppResult<Json<CanvasItem>> {
    let item = state
        .corner
        .set_height(user_id, item_id, request.dz.value())
        .await?;
    Ok(Json(item))
}

pub async fn position(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<ItemId>,
    Payload(request): Payload<PositionRequest>,
) -> AppResult<Json<CanvasItem>> {
    let item = state
        .corner
        .set_position(user_id, item_id, request.x.value(), request.y.value())
        .await?;
    Ok(Json(item))
}

pub async fn scale(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<ItemId>,
    Payload(request): Payload<ScaleRequest>,
) -> AppResult<Json<CanvasItem>> {
    let item = state
        .corner
        .set_scale(user_id, item_id, request.scale.value())
        .await?;
    Ok(Json(item))
}

pub async fn layer(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<ItemId>,
    Payload(request): Payload<LayerRequest>,
) -> AppResult<Json<CanvasItem>> {
    let item = state
        .corner
        .set_layer(user_id, item_id, request.layer.value())
        .await?;
    Ok(Json(item))
}

pub async fn stack(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<ItemId>,
    Payload(request): Payload<StackRequest>,
) -> AppResult<Json<CanvasItem>> {
    let item = state
        .corner
        .restack(user_id, item_id, request.dir.value())
        .await?;
    Ok(Json(item))
}

pub async fn tilt(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<ItemId>,
    Payload(request): Payload<TiltRequest>,
) -> AppResult<Json<CanvasItem>> {
    let item = state
        .corner
        .set_tilt(
            user_id,
            item_id,
            request.tilt_x.value(),
            request.tilt_y.value(),
        )
        .await?;
    Ok(Json(item))
}

pub async fn flip(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<ItemId>,
    Payload(request): Payload<FlipRequest>,
) -> AppResult<Json<CanvasItem>> {
    let item = state
        .corner
        .set_flip(user_id, item_id, request.flip_x.0, request.flip_y.0)
        .await?;
    Ok(Json(item))
}

pub async fn color(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<ItemId>,
    Payload(request): Payload<ColorRequest>,
) -> AppResult<Json<CanvasItem>> {
    let item = state
        .corner
        .set_color(user_id, item_id, request.color.0)
        .await?;
    Ok(Json(item))
}

/// Handler for the couple-wide canvas, floor and wall colors
pub async fn couple_colors(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Payload(update): Payload<ColorUpdate>,
) -> AppResult<Json<CornerColors>> {
    let colors = state.corner.set_couple_colors(user_id, update).await?;
    Ok(Json(colors))
}
