use axum::{
    Extension, Json,
    extract::{Path, State, rejection::{JsonRejection, PathRejection}},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use pulse_types::api::SendBroadcastRequest;
use pulse_types::models::{Account, BroadcastView, ReadReceipt};

use crate::auth::{AppState, blocking};
use crate::error::ApiError;

/// GET /broadcasts: all broadcasts with the caller's own read state.
pub async fn list_broadcasts(
    State(state): State<AppState>,
    Extension(caller): Extension<Account>,
) -> Result<Json<Vec<BroadcastView>>, ApiError> {
    let views = blocking(&state, move |db| db.list_broadcasts_for_account(caller.id)).await?;
    Ok(Json(views))
}

/// POST /broadcasts: admin callers only; the store enforces it.
pub async fn send_broadcast(
    State(state): State<AppState>,
    Extension(caller): Extension<Account>,
    payload: Result<Json<SendBroadcastRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let broadcast = blocking(&state, move |db| {
        db.create_broadcast(caller.id, &req.body, &req.category)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(broadcast)))
}

/// POST /broadcasts/{id}/read
pub async fn mark_broadcast_read(
    State(state): State<AppState>,
    Extension(caller): Extension<Account>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ReadReceipt>, ApiError> {
    let Path(broadcast_id) = path?;
    let receipt = blocking(&state, move |db| db.mark_broadcast_read(broadcast_id, caller.id)).await?;
    Ok(Json(receipt))
}
