// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account and session endpoints.
//!
//! The access token travels in JSON bodies; the refresh token only ever
//! travels in the `jid` cookie.

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use crate::{
    auth::{
        cookies::{refresh_cookie, refresh_token_from, removal_cookie},
        normalize_email,
        password::{hash_password_blocking, verify_password_blocking},
        Auth, AuthError, Role, TokenKind,
    },
    error::ApiError,
    ledger::enroll,
    models::{
        LoginRequest, LoginResponse, MessageResponse, ReferralBonusNotice, RefreshResponse,
        RegisterRequest, RegisterResponse, UserProfile, UserSummary,
    },
    state::AppState,
    storage::{NewUser, StoreError, UserRecord},
};

/// Issue a fresh token pair, remember the refresh token, and build its cookie.
fn start_session(state: &AppState, user: &UserRecord) -> Result<(String, Cookie<'static>), ApiError> {
    let access_token = state.tokens.issue_access_token(&user.id, user.role)?;
    let refresh_token = state.tokens.issue_refresh_token(&user.id, user.role)?;

    state.users.update_user(&user.id, |u| -> Result<(), StoreError> {
        u.set_refresh_token(&refresh_token);
        Ok(())
    })?;

    let cookie = refresh_cookie(refresh_token, state.tokens.refresh_ttl(), state.config.cookie_secure);
    Ok((access_token, cookie))
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    tag = "Auth",
    responses(
        (status = 201, description = "Account created; refresh token set in the jid cookie", body = RegisterResponse),
        (status = 400, description = "Missing fields, missing consent, or email already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<RegisterResponse>), ApiError> {
    let (Some(email), Some(password)) = (required(request.email), required(request.password)) else {
        return Err(ApiError::bad_request("Email and password are required"));
    };
    if !request.agreed_to_privacy_policy {
        return Err(ApiError::bad_request("You must agree to the privacy policy"));
    }

    let email = normalize_email(&email);
    if !email.contains('@') {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    let role = if state.config.is_admin_email(&email) {
        Role::Admin
    } else {
        Role::User
    };

    let password_hash = hash_password_blocking(password).await?;
    let input = NewUser {
        name: required(request.name).map(|name| name.trim().to_string()),
        email,
        password_hash,
        role,
        gender: request.gender,
        occupation: required(request.occupation),
        occupation_type: request.occupation_type,
        agreed_to_privacy_policy: true,
    };

    let registration = enroll(
        &state.users,
        input,
        request.referral_code.as_deref(),
        state.rng.as_ref(),
    )?;
    let (access_token, cookie) = start_session(&state, &registration.user)?;

    tracing::info!(
        user_id = %registration.user.id,
        referred = registration.referrer_id.is_some(),
        "user registered"
    );

    let (message, referral_bonus) = match registration.welcome_bonus {
        Some(coins) => (
            "User registered successfully with referral bonus!",
            Some(ReferralBonusNotice {
                message: format!("You received {coins} coins for using a referral code!"),
                coins,
            }),
        ),
        None => ("User registered successfully", None),
    };

    Ok((
        StatusCode::CREATED,
        jar.add(cookie),
        Json(RegisterResponse {
            message: message.to_string(),
            user: UserSummary::from(&registration.user),
            access_token,
            referral_bonus,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Logged in; refresh token set in the jid cookie", body = LoginResponse),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let (Some(email), Some(password)) = (required(request.email), required(request.password)) else {
        return Err(ApiError::bad_request("Email and password are required"));
    };
    let email = normalize_email(&email);

    let Some(user) = state.users.find_by_email(&email)? else {
        tracing::info!("login failed: unknown email");
        return Err(AuthError::InvalidCredentials.into());
    };
    if !verify_password_blocking(password, user.password_hash.clone()).await? {
        tracing::info!(user_id = %user.id, "login failed: wrong password");
        return Err(AuthError::InvalidCredentials.into());
    }

    let (access_token, cookie) = start_session(&state, &user)?;
    tracing::info!(user_id = %user.id, "login successful");

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            message: "Login successful".to_string(),
            user: UserSummary::from(&user),
            access_token,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses((status = 200, description = "Session ended and cookie cleared", body = MessageResponse))
)]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    if let Some(token) = refresh_token_from(&jar) {
        match state.tokens.verify(&token, TokenKind::Refresh) {
            Ok(claims) => {
                let cleared = state.users.update_user(&claims.sub, |u| -> Result<(), StoreError> {
                    u.clear_refresh_token();
                    Ok(())
                });
                match cleared {
                    Ok(()) => tracing::info!(user_id = %claims.sub, "user logged out"),
                    Err(e) => tracing::warn!(user_id = %claims.sub, error = %e, "could not clear session on logout"),
                }
            }
            Err(e) if e.is_invalid_token() => {
                tracing::info!(error_code = e.error_code(), "logout with invalid refresh token")
            }
            Err(e) => tracing::warn!(error = %e, "logout could not verify refresh token"),
        }
    }

    (
        jar.add(removal_cookie(state.config.cookie_secure)),
        Json(MessageResponse::new("Logged out successfully")),
    )
}

/// Trade the refresh cookie for a new token pair.
///
/// The stored fingerprint is compared and replaced inside one write
/// transaction, so each refresh token can be redeemed once. Any failure
/// clears the cookie and leaves the stored session untouched.
#[utoipa::path(
    post,
    path = "/api/auth/refresh-token",
    tag = "Auth",
    responses(
        (status = 200, description = "New access token; rotated refresh cookie", body = RefreshResponse),
        (status = 401, description = "Missing, invalid, expired or superseded refresh token")
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<RefreshResponse>), (CookieJar, ApiError)> {
    let secure = state.config.cookie_secure;
    let reject = |e: AuthError| {
        if e.is_invalid_token() {
            tracing::warn!(error_code = e.error_code(), "refresh with invalid token");
        } else {
            tracing::info!(error_code = e.error_code(), "refresh rejected");
        }
        (jar.clone().add(removal_cookie(secure)), ApiError::from(e))
    };

    let token = refresh_token_from(&jar).ok_or_else(|| reject(AuthError::MissingRefreshToken))?;
    let claims = state
        .tokens
        .verify(&token, TokenKind::Refresh)
        .map_err(|e| reject(e))?;

    let exists = state
        .users
        .get_user(&claims.sub)
        .map_err(|e| reject(e.into()))?
        .is_some();
    if !exists {
        return Err(reject(AuthError::InvalidSession));
    }

    let rotated = state.users.update_user(&claims.sub, |user| -> Result<_, AuthError> {
        if !user.refresh_token_matches(&token) {
            return Err(AuthError::InvalidSession);
        }
        let access_token = state.tokens.issue_access_token(&user.id, user.role)?;
        let refresh_token = state.tokens.issue_refresh_token(&user.id, user.role)?;
        user.set_refresh_token(&refresh_token);
        Ok((access_token, refresh_token, UserSummary::from(&*user)))
    });
    let (access_token, refresh_token, user) = rotated.map_err(|e| reject(e))?;

    let cookie = refresh_cookie(refresh_token, state.tokens.refresh_ttl(), secure);

    tracing::info!(user_id = %user.id, "session refreshed");
    Ok((jar.add(cookie), Json(RefreshResponse { access_token, user })))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user without credentials", body = UserProfile),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "User no longer exists")
    )
)]
pub async fn me(State(state): State<AppState>, Auth(caller): Auth) -> Result<Json<UserProfile>, ApiError> {
    let user = state
        .users
        .get_user(&caller.user_id)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(UserProfile::from(&user)))
}
