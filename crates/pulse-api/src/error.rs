use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use pulse_db::DeliveryError;
use pulse_types::error::{ErrorBody, ErrorKind};

/// Handler error. Every delivery failure keeps its own status code and a
/// JSON body naming the kind.
#[derive(Debug)]
pub struct ApiError(pub DeliveryError);

impl From<DeliveryError> for ApiError {
    fn from(e: DeliveryError) -> Self {
        Self(e)
    }
}

/// Malformed bodies and unknown fields (such as a client-chosen `id` or
/// `read`) are input errors.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(DeliveryError::Validation(rejection.body_text()))
    }
}

/// An id that does not parse cannot name an existing item.
impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(DeliveryError::NotFound(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = match kind {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
            ErrorKind::Authorization => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = match &self.0 {
            DeliveryError::Internal(e) => {
                error!("Internal error: {:#}", e);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorBody { error: kind, message })).into_response()
    }
}
