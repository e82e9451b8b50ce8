// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{middleware::require_auth, Role},
    config::AppConfig,
    ledger::{ReferralAction, ReferralEntry, WalletEntry, WalletEntryKind},
    models::{
        ConvertResponse, CreditRequest, CreditResponse, LoginRequest, LoginResponse,
        MessageResponse, ProfileResponse, ReferralBonusNotice, ReferralDashboard, ReferredUser,
        RefreshResponse, RegisterRequest, RegisterResponse, RewardPaymentRequest,
        RewardPaymentResponse, UpdateAvatarRequest, UpdateProfileRequest, UseDivineCoinResponse,
        UserProfile, UserSummary, WalletResponse,
    },
    state::AppState,
    storage::{Gender, NotificationPrefs, OccupationType},
};

pub mod admin;
pub mod auth;
pub mod health;
pub mod referral;
pub mod users;
pub mod wallet;

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/health", get(health::health))
        .route("/api/health/live", get(health::liveness))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/refresh-token", post(auth::refresh_token));

    let protected_routes = Router::new()
        .route("/api/auth/me", get(auth::me))
        // Users
        .route("/api/users/profile", get(users::get_profile))
        .route("/api/users/update-profile", put(users::update_profile))
        .route("/api/users/update-avatar", put(users::update_avatar))
        // Wallet
        .route("/api/wallet", get(wallet::get_wallet))
        .route("/api/wallet/convert-to-divine", post(wallet::convert_to_divine))
        .route("/api/wallet/use-divine-coin", post(wallet::use_divine_coin))
        // Referral
        .route("/api/referral/dashboard", get(referral::dashboard))
        .route("/api/referral/reward-payment", post(referral::reward_payment))
        // Older clients reach the wallet through the referral prefix
        .route("/api/referral/wallet", get(wallet::get_wallet))
        .route("/api/referral/convert", post(wallet::convert_to_divine))
        .route("/api/referral/use-divine", post(wallet::use_divine_coin))
        // Admin
        .route("/api/admin/wallet/credit", post(admin::credit_wallet))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let cors = cors_layer(&state.config);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Browsers only send the refresh cookie cross-origin when the origin is
/// listed explicitly, so credentials are allowed only for configured origins.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring unusable CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some("Access token from /api/auth/login or /api/auth/refresh-token"))
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Sincut Server API",
        description = "Accounts, coin wallet and referral rewards."
    ),
    paths(
        health::health,
        health::liveness,
        auth::register,
        auth::login,
        auth::logout,
        auth::refresh_token,
        auth::me,
        users::get_profile,
        users::update_profile,
        users::update_avatar,
        wallet::get_wallet,
        wallet::convert_to_divine,
        wallet::use_divine_coin,
        referral::dashboard,
        referral::reward_payment,
        admin::credit_wallet
    ),
    components(
        schemas(
            Role,
            Gender,
            OccupationType,
            NotificationPrefs,
            WalletEntry,
            WalletEntryKind,
            ReferralEntry,
            ReferralAction,
            MessageResponse,
            RegisterRequest,
            RegisterResponse,
            ReferralBonusNotice,
            LoginRequest,
            LoginResponse,
            RefreshResponse,
            UserSummary,
            UserProfile,
            ProfileResponse,
            UpdateProfileRequest,
            UpdateAvatarRequest,
            WalletResponse,
            ConvertResponse,
            UseDivineCoinResponse,
            ReferralDashboard,
            ReferredUser,
            RewardPaymentRequest,
            RewardPaymentResponse,
            CreditRequest,
            CreditResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Auth", description = "Registration, login and session tokens"),
        (name = "Users", description = "Profile management"),
        (name = "Wallet", description = "Coin balances and divine coin conversion"),
        (name = "Referral", description = "Referral dashboard and payment rewards"),
        (name = "Admin", description = "Administrative operations")
    )
)]
struct ApiDoc;
