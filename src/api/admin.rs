// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-only ledger operations.

use axum::{extract::State, Json};

use crate::{
    auth::AdminOnly,
    error::ApiError,
    ledger::WalletEntryKind,
    models::{CreditRequest, CreditResponse},
    state::AppState,
};

/// Credit coins to any user, recorded as an `earn` entry.
#[utoipa::path(
    post,
    path = "/api/admin/wallet/credit",
    request_body = CreditRequest,
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Coins credited", body = CreditResponse),
        (status = 400, description = "Zero amount, empty reason or overflow"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "User not found")
    )
)]
pub async fn credit_wallet(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
    Json(request): Json<CreditRequest>,
) -> Result<Json<CreditResponse>, ApiError> {
    let reason = request.reason.trim();
    if reason.is_empty() {
        return Err(ApiError::bad_request("A reason is required"));
    }

    let response = state
        .users
        .update_user(&request.user_id, |user| -> Result<_, ApiError> {
            user.wallet.credit(
                request.amount,
                WalletEntryKind::Earn,
                reason,
                Some(admin.user_id.clone()),
            )?;
            Ok(CreditResponse {
                user_id: user.id.clone(),
                coins: user.wallet.coins(),
                divine_coins: user.wallet.divine_coins(),
            })
        })?;

    tracing::info!(
        admin_id = %admin.user_id,
        user_id = %response.user_id,
        amount = request.amount,
        "admin credited coins"
    );
    Ok(Json(response))
}
