use axum::{Extension, Json, extract::State};

use pulse_types::api::UnreadCountResponse;
use pulse_types::models::Account;

use crate::auth::{AppState, blocking};
use crate::error::ApiError;

/// GET /unread-count: derived on every request, never cached.
pub async fn unread_count(
    State(state): State<AppState>,
    Extension(caller): Extension<Account>,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let unread = blocking(&state, move |db| db.compute_unread_count(caller.role, caller.id)).await?;
    Ok(Json(UnreadCountResponse { unread }))
}
