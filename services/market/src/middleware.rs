//! Session middleware: bearer-token validation and identity resolution
//!
//! Every protected request walks the same ladder: header present,
//! scheme is Bearer, token decodes, and the email claim still resolves
//! to an account. That last lookup is the revocation check (a deleted
//! account invalidates its tokens immediately) and it is the only user
//! lookup the request performs; handlers reuse the resolved identity.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::models::User;
use crate::state::AppState;

/// Identity resolved by the session middleware, attached to request
/// extensions. Authoritative over any per-handler re-derivation.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Pull the bearer token out of the request headers. A missing or
/// unreadable header and a non-Bearer scheme are distinct failures.
fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiError::AuthMissing)?;

    let (scheme, token) = header.split_once(' ').ok_or(ApiError::AuthScheme)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(ApiError::AuthScheme);
    }

    Ok(token.trim())
}

/// Validate the bearer token and attach the resolved user
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())?;

    let claims = state
        .jwt_service
        .decode(token)
        .map_err(|_| ApiError::AuthInvalid)?;

    let user = state
        .user_repository
        .find_by_email(&claims.email)
        .await?
        .ok_or(ApiError::AuthUserNotFound)?;

    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn missing_header_is_rejected() {
        let headers = HeaderMap::new();
        let result = bearer_token(&headers);
        assert!(matches!(result, Err(ApiError::AuthMissing)));
    }

    #[test]
    fn non_bearer_scheme_is_rejected() {
        let headers = headers_with("Basic dXN1YXJpbzpzZWNyZXRv");
        let result = bearer_token(&headers);
        assert!(matches!(result, Err(ApiError::AuthScheme)));

        let headers = headers_with("token-sin-esquema");
        let result = bearer_token(&headers);
        assert!(matches!(result, Err(ApiError::AuthScheme)));
    }

    #[test]
    fn bearer_token_is_extracted() {
        let headers = headers_with("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let headers = headers_with("bearer abc.def.ghi");
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let headers = headers_with("Bearer  abc.def.ghi ");
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }
}
