use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::request::Parts;
use uuid::Uuid;

use crate::utils::error::AppError;

/// Set by the upstream identity gateway once the organizer session is verified.
pub const ORGANIZER_HEADER: &str = "x-user-id";

/// The authenticated organizer making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrganizerId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for OrganizerId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ORGANIZER_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::AuthError("Missing organizer identity".to_string()))?;

        Uuid::parse_str(raw.trim())
            .map(OrganizerId)
            .map_err(|_| AppError::AuthError("Malformed organizer identity".to_string()))
    }
}

/// JSON body whose parse failures come back in the standard error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);
