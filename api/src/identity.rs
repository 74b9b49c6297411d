//! Explicit request identity.
//!
//! Every mutating endpoint takes a [`StaffIdentity`] extracted from the
//! `X-Staff-Id` header, so the acting staff member is an explicit value
//! passed into the handler instead of ambient session state. Login and
//! session mechanics are out of scope; callers are expected to sit behind
//! an authenticating proxy that sets the header.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::AppError;

pub const STAFF_ID_HEADER: &str = "x-staff-id";

/// The authenticated staff member performing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaffIdentity(pub Uuid);

impl<S> FromRequestParts<S> for StaffIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(STAFF_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok())
            .map(StaffIdentity)
            .ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(request: Request<()>) -> Result<StaffIdentity, AppError> {
        let (mut parts, ()) = request.into_parts();
        StaffIdentity::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn extracts_a_valid_header() {
        let id = Uuid::now_v7();
        let request = Request::builder()
            .header(STAFF_ID_HEADER, id.to_string())
            .body(())
            .unwrap();

        assert_eq!(extract(request).await.unwrap(), StaffIdentity(id));
    }

    #[tokio::test]
    async fn rejects_missing_or_malformed_headers() {
        let request = Request::builder().body(()).unwrap();
        assert!(matches!(
            extract(request).await,
            Err(AppError::Unauthorized)
        ));

        let request = Request::builder()
            .header(STAFF_ID_HEADER, "not-a-uuid")
            .body(())
            .unwrap();
        assert!(matches!(
            extract(request).await,
            Err(AppError::Unauthorized)
        ));
    }
}
