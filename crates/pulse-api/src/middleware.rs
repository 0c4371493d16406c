use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::warn;

use pulse_db::DeliveryError;
use pulse_types::api::Claims;

use crate::auth::{AppState, blocking};
use crate::error::ApiError;

/// Validate the bearer token and resolve it to a stored account. The
/// resolved `Account` is inserted as a request extension; its stored role is
/// what every handler trusts.
pub async fn require_auth(
    State(state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer
        .map_err(|_| DeliveryError::Authentication("missing bearer token".into()))?;

    let token_data = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        warn!("Rejected bearer token: {}", e);
        DeliveryError::Authentication("invalid or expired token".into())
    })?;

    let account_id = token_data.claims.sub;
    let account = blocking(&state, move |db| db.get_account(account_id))
        .await?
        .ok_or_else(|| {
            warn!("Token for unknown account {}", account_id);
            DeliveryError::Authentication("account not recognized".into())
        })?;

    if account.role != token_data.claims.role {
        warn!(
            "Token role {} differs from stored role {} for {}",
            token_data.claims.role, account.role, account.id
        );
    }

    req.extensions_mut().insert(account);
    Ok(next.run(req).await)
}
