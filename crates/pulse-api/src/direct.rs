use axum::{
    Extension, Json,
    extract::{Path, State, rejection::{JsonRejection, PathRejection}},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use pulse_types::api::SendDirectMessageRequest;
use pulse_types::models::{Account, DirectMessage};

use crate::auth::{AppState, blocking};
use crate::error::ApiError;

/// GET /direct-messages: everything sent to or by the caller's role.
pub async fn list_direct_messages(
    State(state): State<AppState>,
    Extension(caller): Extension<Account>,
) -> Result<Json<Vec<DirectMessage>>, ApiError> {
    let messages = blocking(&state, move |db| db.list_direct_messages_for_role(caller.role)).await?;
    Ok(Json(messages))
}

/// POST /direct-messages: sender id and role come from the caller.
pub async fn send_direct_message(
    State(state): State<AppState>,
    Extension(caller): Extension<Account>,
    payload: Result<Json<SendDirectMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let message = blocking(&state, move |db| {
        db.create_direct_message(caller.id, caller.role, &req.body, &req.category)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// POST /direct-messages/{id}/read
pub async fn mark_direct_message_read(
    State(state): State<AppState>,
    Extension(caller): Extension<Account>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<DirectMessage>, ApiError> {
    let Path(message_id) = path?;
    let message = blocking(&state, move |db| db.mark_direct_message_read(message_id, caller.role)).await?;
    Ok(Json(message))
}
