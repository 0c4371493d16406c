use std::sync::Arc;

use axum::{Extension, Json};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::error;
use uuid::Uuid;

use pulse_db::{Database, DeliveryError};
use pulse_types::api::Claims;
use pulse_types::models::{Account, Role};

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

/// Run a store operation off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> pulse_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::from(DeliveryError::Internal(anyhow::anyhow!("worker task failed")))
        })?
        .map_err(ApiError::from)
}

/// Mint a bearer token for an account. Identity providers and the bootstrap
/// path use this; the API itself only verifies tokens.
pub fn create_token(secret: &str, account_id: Uuid, role: Role) -> anyhow::Result<String> {
    let claims = Claims {
        sub: account_id,
        role,
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// GET /me: the resolved caller.
pub async fn me(Extension(caller): Extension<Account>) -> Json<Account> {
    Json(caller)
}
