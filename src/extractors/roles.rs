//! Extract caller roles from the request (`X-Roles` header).

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Header carrying comma-separated role names.
pub const ROLES_HEADER: &str = "X-Roles";

/// Roles of the caller; empty when the header is absent.
#[derive(Clone, Debug, Default)]
pub struct CurrentRoles(pub Vec<String>);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentRoles
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let roles = parts
            .headers
            .get(ROLES_HEADER)
            .and_then(|v: &axum::http::HeaderValue| v.to_str().ok())
            .map(|s: &str| {
                s.split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(CurrentRoles(roles))
    }
}
