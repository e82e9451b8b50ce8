// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use crate::{
    auth::Auth,
    error::ApiError,
    ledger::reward_payment as apply_payment_reward,
    models::{ReferralDashboard, ReferredUser, RewardPaymentRequest, RewardPaymentResponse},
    state::AppState,
};

#[utoipa::path(
    get,
    path = "/api/referral/dashboard",
    tag = "Referral",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Referral code, totals, referred users and history", body = ReferralDashboard),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "User not found")
    )
)]
pub async fn dashboard(
    State(state): State<AppState>,
    Auth(caller): Auth,
) -> Result<Json<ReferralDashboard>, ApiError> {
    let user = state
        .users
        .get_user(&caller.user_id)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let mut referred_users = Vec::new();
    for record in state.users.referrals_by(&user.id)? {
        match state.users.get_user(&record.referred_id)? {
            Some(referred) => referred_users.push(ReferredUser {
                id: referred.id,
                name: referred.name,
                email: referred.email,
                reward_amount: record.reward_amount,
                joined_at: record.created_at,
            }),
            None => tracing::warn!(referred_id = %record.referred_id, "referral record points at a missing user"),
        }
    }
    referred_users.sort_by(|a, b| b.joined_at.cmp(&a.joined_at));

    let referral = &user.referral;
    let totals = referral.totals();
    Ok(Json(ReferralDashboard {
        referral_code: referral.code().to_string(),
        total_referred_users: referral.count(),
        referral_coins: referral.coins_earned(),
        total_signup_bonus: totals.signup_bonus,
        total_payment_bonus: totals.payment_bonus,
        total_referral_bonus: totals.referral_bonus,
        referred_users,
        history: referral.history().iter().rev().cloned().collect(),
    }))
}

/// Apply the payment bonuses for a completed payment.
///
/// Users may only claim for themselves; admins may name any user.
#[utoipa::path(
    post,
    path = "/api/referral/reward-payment",
    request_body = RewardPaymentRequest,
    tag = "Referral",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Bonuses applied", body = RewardPaymentResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Rewarding another user requires admin"),
        (status = 404, description = "User not found")
    )
)]
pub async fn reward_payment(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Json(request): Json<RewardPaymentRequest>,
) -> Result<Json<RewardPaymentResponse>, ApiError> {
    let buyer_id = request
        .user_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| caller.user_id.clone());
    if buyer_id != caller.user_id && !caller.is_admin() {
        tracing::warn!(caller = %caller.user_id, buyer_id = %buyer_id, "payment reward for another user refused");
        return Err(ApiError::forbidden("Not allowed to reward another user"));
    }

    let reward = apply_payment_reward(&state.users, &buyer_id)?;
    Ok(Json(RewardPaymentResponse {
        message: "Referral reward applied".to_string(),
        buyer_coins: reward.coins,
        buyer_divine_coins: reward.divine_coins,
        referrer_rewarded: reward.referrer_credited.is_some(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthenticatedUser, Role};
    use crate::ledger::{enroll, ReferralAction, Registration};
    use crate::storage::NewUser;
    use crate::test_support::test_state;
    use axum::http::StatusCode;

    fn register(state: &AppState, name: &str, code: Option<&str>) -> Registration {
        enroll(
            &state.users,
            NewUser {
                name: Some(name.to_string()),
                email: format!("{}@example.com", name.to_lowercase()),
                password_hash: "hash".to_string(),
                role: Role::User,
                gender: None,
                occupation: None,
                occupation_type: None,
                agreed_to_privacy_policy: true,
            },
            code,
            state.rng.as_ref(),
        )
        .unwrap()
    }

    fn auth(id: &str, role: Role) -> Auth {
        Auth(AuthenticatedUser {
            user_id: id.to_string(),
            role,
            expires_at: 0,
        })
    }

    #[tokio::test]
    async fn dashboard_lists_referred_users() {
        let (state, _dir) = test_state();
        let alice = register(&state, "Alice", None);
        let bob = register(&state, "Bob", Some(alice.user.referral.code()));

        let Json(board) = dashboard(State(state), auth(&alice.user.id, Role::User))
            .await
            .unwrap();

        assert_eq!(board.referral_code, alice.user.referral.code());
        assert_eq!(board.total_referred_users, 1);
        assert_eq!(board.total_signup_bonus, 40);
        assert_eq!(board.referral_coins, 40);
        assert_eq!(board.referred_users.len(), 1);
        assert_eq!(board.referred_users[0].id, bob.user.id);
        assert_eq!(board.history[0].action, ReferralAction::SignupBonus);
    }

    #[tokio::test]
    async fn reward_defaults_to_caller() {
        let (state, _dir) = test_state();
        let alice = register(&state, "Alice", None);
        let bob = register(&state, "Bob", Some(alice.user.referral.code()));

        let Json(body) = reward_payment(
            State(state.clone()),
            auth(&bob.user.id, Role::User),
            Json(RewardPaymentRequest::default()),
        )
        .await
        .unwrap();

        assert_eq!(body.buyer_coins, 90);
        assert!(body.referrer_rewarded);
        let alice = state.users.get_user(&alice.user.id).unwrap().unwrap();
        assert_eq!(alice.wallet.coins(), 60);
    }

    #[tokio::test]
    async fn rewarding_someone_else_requires_admin() {
        let (state, _dir) = test_state();
        let alice = register(&state, "Alice", None);
        let bob = register(&state, "Bob", None);

        let err = reward_payment(
            State(state.clone()),
            auth(&bob.user.id, Role::User),
            Json(RewardPaymentRequest {
                user_id: Some(alice.user.id.clone()),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(state.users.get_user(&alice.user.id).unwrap().unwrap().wallet.coins(), 0);

        let Json(body) = reward_payment(
            State(state),
            auth("some-admin", Role::Admin),
            Json(RewardPaymentRequest {
                user_id: Some(alice.user.id.clone()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(body.buyer_coins, 50);
        assert!(!body.referrer_rewarded);
    }

    #[tokio::test]
    async fn reward_for_unknown_user_is_404() {
        let (state, _dir) = test_state();
        let err = reward_payment(
            State(state),
            auth("admin", Role::Admin),
            Json(RewardPaymentRequest {
                user_id: Some("ghost".to_string()),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
