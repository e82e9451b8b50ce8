// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{fingerprint, Role};
use crate::ledger::{ReferralState, Wallet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Gender {
    Male,
    Female,
    Other,
    PreferNotToSay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OccupationType {
    Employed,
    Unemployed,
    Student,
    Entrepreneur,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPrefs {
    pub email_updates: bool,
    pub sms_updates: bool,
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        Self {
            email_updates: true,
            sms_updates: false,
        }
    }
}

/// Validated registration input, ready to become a [`UserRecord`].
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: Option<String>,
    /// Already normalized
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub gender: Option<Gender>,
    pub occupation: Option<String>,
    pub occupation_type: Option<OccupationType>,
    pub agreed_to_privacy_policy: bool,
}

/// A user account with its embedded wallet and referral state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub role: Role,

    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub occupation_type: Option<OccupationType>,
    pub agreed_to_privacy_policy: bool,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub notifications: NotificationPrefs,

    /// Fingerprint of the one refresh token currently accepted
    #[serde(default)]
    refresh_token_hash: Option<String>,

    pub referral: ReferralState,
    #[serde(default)]
    pub wallet: Wallet,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(id: String, input: NewUser, referral: ReferralState) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: input.name,
            email: input.email,
            password_hash: input.password_hash,
            role: input.role,
            gender: input.gender,
            occupation: input.occupation,
            occupation_type: input.occupation_type,
            agreed_to_privacy_policy: input.agreed_to_privacy_policy,
            profile_image: None,
            phone: None,
            bio: None,
            notifications: NotificationPrefs::default(),
            refresh_token_hash: None,
            referral,
            wallet: Wallet::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Name for history descriptions, falling back to the email.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }

    /// Accept `token` as the only valid refresh token from now on.
    pub fn set_refresh_token(&mut self, token: &str) {
        self.refresh_token_hash = Some(fingerprint(token));
    }

    pub fn clear_refresh_token(&mut self) {
        self.refresh_token_hash = None;
    }

    pub fn has_session(&self) -> bool {
        self.refresh_token_hash.is_some()
    }

    pub fn refresh_token_matches(&self, token: &str) -> bool {
        self.refresh_token_hash.as_deref() == Some(fingerprint(token).as_str())
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// One row of the referrals table: who brought whom, and what it paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReferralRecord {
    pub referrer_id: String,
    pub referred_id: String,
    pub reward_given: bool,
    pub reward_amount: u64,
    pub created_at: DateTime<Utc>,
}
