// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. Field names are camelCase on
//! the wire and user ids are exposed as `_id`, matching what existing
//! frontends of this service expect.
//!
//! ## Model Categories
//!
//! - **Auth**: registration, login and session refresh
//! - **Profile**: the user as shown to themselves
//! - **Wallet**: balances, conversion and divine coin spending
//! - **Referral**: dashboard and payment rewards
//! - **Admin**: manual coin credits

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Role;
use crate::ledger::{ReferralEntry, WalletEntry};
use crate::storage::{Gender, NotificationPrefs, OccupationType, UserRecord};

// =============================================================================
// Generic
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// =============================================================================
// Auth Models
// =============================================================================

/// Registration form. Required fields are optional here so a missing one is
/// reported as a 400 with a readable message instead of a decode failure.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub gender: Option<Gender>,
    pub occupation_type: Option<OccupationType>,
    pub occupation: Option<String>,
    #[serde(default)]
    pub agreed_to_privacy_policy: bool,
    /// Code of the user who invited this one
    pub referral_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Compact user shape returned alongside tokens.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupation_type: Option<OccupationType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    pub referral_code: String,
    pub coins: u64,
    pub divine_coins: u64,
}

impl From<&UserRecord> for UserSummary {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            gender: user.gender,
            occupation_type: user.occupation_type,
            occupation: user.occupation.clone(),
            referral_code: user.referral.code().to_string(),
            coins: user.wallet.coins(),
            divine_coins: user.wallet.divine_coins(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReferralBonusNotice {
    pub message: String,
    pub coins: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserSummary,
    pub access_token: String,
    pub referral_bonus: Option<ReferralBonusNotice>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: String,
    pub user: UserSummary,
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub user: UserSummary,
}

// =============================================================================
// Profile Models
// =============================================================================

/// Full user record minus credentials.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub role: Role,
    pub gender: Option<Gender>,
    pub occupation: Option<String>,
    pub occupation_type: Option<OccupationType>,
    pub agreed_to_privacy_policy: bool,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub referral_count: u64,
    pub coins: u64,
    pub divine_coins: u64,
    pub profile_image: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub notifications: NotificationPrefs,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&UserRecord> for UserProfile {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            gender: user.gender,
            occupation: user.occupation.clone(),
            occupation_type: user.occupation_type,
            agreed_to_privacy_policy: user.agreed_to_privacy_policy,
            referral_code: user.referral.code().to_string(),
            referred_by: user.referral.referred_by().map(str::to_string),
            referral_count: user.referral.count(),
            coins: user.wallet.coins(),
            divine_coins: user.wallet.divine_coins(),
            profile_image: user.profile_image.clone(),
            phone: user.phone.clone(),
            bio: user.bio.clone(),
            notifications: user.notifications.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub user: UserProfile,
}

/// Only the fields present are changed.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAvatarRequest {
    /// File name of one of the preset avatars, e.g. `cat.png`
    pub profile_image: Option<String>,
}

// =============================================================================
// Wallet Models
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    pub coins: u64,
    pub divine_coins: u64,
    /// Coins earned through referrals over the account's lifetime
    pub referral_coins: u64,
    /// Newest first
    pub wallet_history: Vec<WalletEntry>,
}

impl From<&UserRecord> for WalletResponse {
    fn from(user: &UserRecord) -> Self {
        let view = user.wallet.view();
        Self {
            coins: view.coins,
            divine_coins: view.divine_coins,
            referral_coins: user.referral.coins_earned(),
            wallet_history: view.history,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub message: String,
    pub coins_used: u64,
    pub divine_coins_added: u64,
    pub coins: u64,
    pub divine_coins: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UseDivineCoinResponse {
    pub message: String,
    pub divine_coins: u64,
}

// =============================================================================
// Referral Models
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReferredUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub reward_amount: u64,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReferralDashboard {
    pub referral_code: String,
    pub total_referred_users: u64,
    pub referral_coins: u64,
    pub total_signup_bonus: u64,
    pub total_payment_bonus: u64,
    pub total_referral_bonus: u64,
    pub referred_users: Vec<ReferredUser>,
    /// Newest first
    pub history: Vec<ReferralEntry>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RewardPaymentRequest {
    /// Paying user; defaults to the caller. Only admins may name someone else.
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RewardPaymentResponse {
    pub message: String,
    pub buyer_coins: u64,
    pub buyer_divine_coins: u64,
    pub referrer_rewarded: bool,
}

// =============================================================================
// Admin Models
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreditRequest {
    pub user_id: String,
    pub amount: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreditResponse {
    pub user_id: String,
    pub coins: u64,
    pub divine_coins: u64,
}
