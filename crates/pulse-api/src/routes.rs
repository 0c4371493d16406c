use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::auth::{self, AppState};
use crate::middleware::require_auth;
use crate::{broadcasts, direct, unread};

/// Build the delivery API router. Transport layers (CORS, tracing) are added
/// by the binary.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new().route("/health", get(health));

    let protected_routes = Router::new()
        .route("/me", get(auth::me))
        .route(
            "/direct-messages",
            get(direct::list_direct_messages).post(direct::send_direct_message),
        )
        .route("/direct-messages/{id}/read", post(direct::mark_direct_message_read))
        .route(
            "/broadcasts",
            get(broadcasts::list_broadcasts).post(broadcasts::send_broadcast),
        )
        .route("/broadcasts/{id}/read", post(broadcasts::mark_broadcast_read))
        .route("/unread-count", get(unread::unread_count))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

async fn health() -> &'static str {
    "ok"
}
