// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Email/password accounts with a two-token session.
//!
//! ## Auth Flow
//!
//! 1. `register` / `login` verify credentials and issue:
//!    - a short-lived access token, returned in the JSON body
//!    - a long-lived refresh token, set as the `jid` HttpOnly cookie
//! 2. Clients send `Authorization: Bearer <access token>` on protected routes
//! 3. `refresh-token` trades the cookie for a new pair; the old refresh token
//!    stops working because only the newest fingerprint is kept
//! 4. `logout` clears the stored fingerprint
//!
//! ## Security
//!
//! - Access and refresh tokens are signed with distinct HS256 secrets
//! - Refresh tokens are persisted only as a SHA-256 fingerprint
//! - Passwords are hashed with argon2id
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod cookies;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod password;
pub mod roles;
pub mod tokens;

use unicode_normalization::UnicodeNormalization;

pub use claims::{AuthenticatedUser, TokenKind};
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth};
pub use roles::Role;
pub use tokens::{fingerprint, TokenIssuer};

/// Canonical form of an email address, used for storage and lookups.
pub fn normalize_email(email: &str) -> String {
    email.trim().nfkc().collect::<String>().to_lowercase()
}
