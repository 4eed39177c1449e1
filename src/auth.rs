use axum::{
    extract::{FromRef, FromRequestParts, Request},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::{
    error::AppError,
    models::AccountId,
    token::{TokenError, TokenKind, TokenService},
};

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request. Only the account id is
/// carried; nothing else from the token is trusted downstream. Handlers pass
/// `id` to the ownership checks in `policy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: AccountId,
}

/// bearer_token
///
/// Pulls `<token>` out of `Authorization: Bearer <token>`. Anything else
/// (missing header, non-UTF-8 value, another scheme, empty token) counts as
/// no credential at all.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// AuthUser Extractor Implementation
///
/// Resolves the principal from the bearer access token.
///
/// 1. Reuse: if the `authenticate` middleware already resolved the principal
///    for this request, it is taken from the request extensions.
/// 2. Token Extraction: no usable bearer header is `Unauthenticated` (403).
/// 3. Verification: the token must be an access token signed with the access
///    secret. Expiry is reported as `ExpiredToken` so clients know to refresh;
///    every other failure is `InvalidToken` (both 401).
///
/// No database lookup happens here. A token for an account that no longer
/// exists still authenticates; operations that need the account report
/// `NotFound` themselves.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenService: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(*user);
        }

        let token = bearer_token(parts).ok_or(AppError::Unauthenticated)?;

        let tokens = TokenService::from_ref(state);
        let claims = tokens.verify(token, TokenKind::Access).map_err(|e| match e {
            TokenError::Expired => AppError::ExpiredToken,
            _ => AppError::InvalidToken,
        })?;

        Ok(AuthUser { id: claims.sub })
    }
}

/// authenticate
///
/// Route-layer middleware for the authenticated router. The `AuthUser`
/// argument rejects the request before the handler runs if authentication
/// fails; on success the principal is stored in the request extensions so the
/// handler's own `AuthUser` does not verify the token a second time.
pub async fn authenticate(auth_user: AuthUser, mut request: Request, next: Next) -> Response {
    tracing::debug!(account_id = %auth_user.id, "request authenticated");
    request.extensions_mut().insert(auth_user);
    next.run(request).await
}
