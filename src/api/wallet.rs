// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{ConvertResponse, UseDivineCoinResponse, WalletResponse},
    state::AppState,
};

#[utoipa::path(
    get,
    path = "/api/wallet",
    tag = "Wallet",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Balances and history, newest first", body = WalletResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_wallet(State(state): State<AppState>, Auth(caller): Auth) -> Result<Json<WalletResponse>, ApiError> {
    let user = state
        .users
        .get_user(&caller.user_id)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(WalletResponse::from(&user)))
}

#[utoipa::path(
    post,
    path = "/api/wallet/convert-to-divine",
    tag = "Wallet",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All whole multiples of 333 coins converted", body = ConvertResponse),
        (status = 400, description = "Fewer than 333 coins"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "User not found")
    )
)]
pub async fn convert_to_divine(
    State(state): State<AppState>,
    Auth(caller): Auth,
) -> Result<Json<ConvertResponse>, ApiError> {
    let response = state.users.update_user(&caller.user_id, |user| -> Result<_, ApiError> {
        let conversion = user.wallet.convert_to_divine()?;
        Ok(ConvertResponse {
            message: format!(
                "Successfully converted {} coins to {} divine coin(s)",
                conversion.coins_used, conversion.divine_coins_added
            ),
            coins_used: conversion.coins_used,
            divine_coins_added: conversion.divine_coins_added,
            coins: user.wallet.coins(),
            divine_coins: user.wallet.divine_coins(),
        })
    })?;

    tracing::info!(
        user_id = %caller.user_id,
        coins_used = response.coins_used,
        divine_coins_added = response.divine_coins_added,
        "coins converted"
    );
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/wallet/use-divine-coin",
    tag = "Wallet",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "One divine coin spent", body = UseDivineCoinResponse),
        (status = 400, description = "No divine coins available"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "User not found")
    )
)]
pub async fn use_divine_coin(
    State(state): State<AppState>,
    Auth(caller): Auth,
) -> Result<Json<UseDivineCoinResponse>, ApiError> {
    let remaining = state
        .users
        .update_user(&caller.user_id, |user| -> Result<_, ApiError> {
            Ok(user.wallet.use_divine_coin()?)
        })?;

    tracing::info!(user_id = %caller.user_id, remaining, "divine coin used");
    Ok(Json(UseDivineCoinResponse {
        message: "Divine coin used successfully!".to_string(),
        divine_coins: remaining,
    }))
}
