// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! Applied to the protected router subtree with
//! `axum::middleware::from_fn_with_state(state, require_auth)`. The verified
//! identity is stored in the request extensions, where the [`Auth`] extractor
//! picks it up without verifying the token a second time.
//!
//! [`Auth`]: super::Auth

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{AuthError, AuthenticatedUser, TokenIssuer, TokenKind};
use crate::state::AppState;

/// Pull the bearer token out of the `Authorization` header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or(AuthError::InvalidAuthHeader)?;

    if token.is_empty() {
        return Err(AuthError::MissingAuthHeader);
    }
    Ok(token)
}

/// Verify the bearer access token on a request.
pub(crate) fn authenticate(
    headers: &HeaderMap,
    tokens: &TokenIssuer,
) -> Result<AuthenticatedUser, AuthError> {
    let token = bearer_token(headers)?;
    let claims = tokens.verify(token, TokenKind::Access)?;
    Ok(AuthenticatedUser::from_claims(claims))
}

/// Reject the request with 401 unless it carries a valid access token.
pub async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    match authenticate(request.headers(), &state.tokens) {
        Ok(user) => {
            tracing::debug!(user_id = %user.user_id, "request authenticated");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(error_code = e.error_code(), "request rejected");
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::config::TokenConfig;
    use axum::http::HeaderValue;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&TokenConfig::new("access", "refresh"))
    }

    fn headers_with(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn missing_header_is_rejected() {
        assert!(matches!(
            bearer_token(&HeaderMap::new()),
            Err(AuthError::MissingAuthHeader)
        ));
    }

    #[test]
    fn non_bearer_scheme_is_rejected() {
        assert!(matches!(
            bearer_token(&headers_with("Basic dXNlcjpwdw==")),
            Err(AuthError::InvalidAuthHeader)
        ));
    }

    #[test]
    fn valid_access_token_authenticates() {
        let issuer = issuer();
        let token = issuer.issue_access_token("user-9", Role::User).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );

        let user = authenticate(&headers, &issuer).unwrap();
        assert_eq!(user.user_id, "user-9");
        assert_eq!(user.role, Role::User);
    }

    #[test]
    fn refresh_token_is_not_accepted_as_bearer() {
        let issuer = issuer();
        let token = issuer.issue_refresh_token("user-9", Role::User).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );

        let err = authenticate(&headers, &issuer).unwrap_err();
        assert!(err.is_invalid_token());
    }
}
