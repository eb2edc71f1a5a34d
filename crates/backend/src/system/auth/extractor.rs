use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use contracts::system::auth::{Actor, TokenClaims};

/// Extractor for the authenticated caller
/// Usage in handlers: `async fn handler(CurrentUser(actor): CurrentUser) -> Response`
pub struct CurrentUser(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // TokenClaims are set by require_auth
        parts
            .extensions
            .get::<TokenClaims>()
            .map(|claims| CurrentUser(Actor::from(claims)))
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
