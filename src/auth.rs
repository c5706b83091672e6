/// Authentication extractors and utilities
use crate::{account::PublicProfile, context::AppContext, error::ApiError};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::CookieJar;

/// Cookie carrying the access token
pub const ACCESS_COOKIE: &str = "accessToken";
/// Cookie carrying the refresh token
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Authenticated context - verifies the access token and attaches the
/// caller's public profile as the request principal
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub account: PublicProfile,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        // Cookie first, then Authorization header
        let token = extract_token(parts)
            .ok_or_else(|| ApiError::Authentication("missing credentials".to_string()))?;

        let account_id = state.tokens.verify_access(&token)?;

        // The subject may have disappeared since the token was signed
        let account = state
            .accounts
            .public_profile(&account_id)
            .await
            .map_err(|e| match e {
                ApiError::NotFound(_) => {
                    ApiError::Authentication("invalid access token".to_string())
                }
                other => other,
            })?;

        Ok(AuthContext { account })
    }
}

/// Optional authenticated context - does not fail if no valid auth provided
#[derive(Debug, Clone)]
pub struct OptionalAuthContext {
    pub auth: Option<AuthContext>,
}

#[async_trait]
impl FromRequestParts<AppContext> for OptionalAuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthContext::from_request_parts(parts, state).await.ok();

        Ok(OptionalAuthContext { auth })
    }
}

/// Resolve the access token from the request: `accessToken` cookie first,
/// then `Authorization: Bearer`, first present wins
fn extract_token(parts: &Parts) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(cookie) = jar.get(ACCESS_COOKIE) {
        return Some(cookie.value().to_string());
    }

    extract_bearer_token(&parts.headers)
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_static("Bearer some-token"),
        );
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("some-token"));

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer_token(&headers), None);

        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }
}
