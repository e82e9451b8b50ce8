// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token issuer for access and refresh JWTs.
//!
//! Both token kinds are HS256 JWTs. They are signed with different secrets
//! and carry a `kind` claim, so one can never be replayed as the other.
//! Refresh tokens are additionally bound to the user record through a
//! SHA-256 [`fingerprint`]; only the fingerprint is persisted.

use std::time::Duration;

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use sha2::{Digest, Sha256};

use super::claims::{TokenClaims, TokenKind};
use super::{AuthError, Role};
use crate::config::TokenConfig;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SigningKeys {
    fn from_secret(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

/// Signs and verifies the two token kinds.
pub struct TokenIssuer {
    access: SigningKeys,
    refresh: SigningKeys,
}

impl TokenIssuer {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            access: SigningKeys::from_secret(&config.access_secret, config.access_ttl),
            refresh: SigningKeys::from_secret(&config.refresh_secret, config.refresh_ttl),
        }
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Lifetime of refresh tokens, also used as the cookie max-age.
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh.ttl
    }

    pub fn issue_access_token(&self, user_id: &str, role: Role) -> Result<String, AuthError> {
        self.issue(TokenKind::Access, user_id, role)
    }

    pub fn issue_refresh_token(&self, user_id: &str, role: Role) -> Result<String, AuthError> {
        self.issue(TokenKind::Refresh, user_id, role)
    }

    fn issue(&self, kind: TokenKind, user_id: &str, role: Role) -> Result<String, AuthError> {
        let keys = self.keys(kind);
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(keys.ttl.as_secs()).unwrap_or(i64::MAX);

        let claims = TokenClaims {
            sub: user_id.to_string(),
            role,
            kind,
            iat: now,
            exp: now.saturating_add(ttl),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| AuthError::InternalError(format!("failed to sign token: {e}")))
    }

    /// Verify signature, expiry and kind of a token.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_aud = false;

        let token_data = decode::<TokenClaims>(token, &self.keys(kind).decoding, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::MalformedToken,
            })?;

        if token_data.claims.kind != kind {
            return Err(AuthError::WrongTokenKind);
        }

        Ok(token_data.claims)
    }
}

/// Stable digest of a refresh token, the only form in which it is stored.
pub fn fingerprint(token: &str) -> String {
    Base64UrlUnpadded::encode_string(&Sha256::digest(token.as_bytes()))
}
