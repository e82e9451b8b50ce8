// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Referral engine.
//!
//! A user's referrer is fixed when the account is created and can never be
//! changed afterwards: [`ReferralState`] has no setter for it. Signup bonuses
//! are paid in the same write transaction that inserts the new user, so a
//! failed registration never leaves a credited referrer behind.

use chrono::{DateTime, Utc};
use ring::rand::SecureRandom;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::wallet::WalletEntryKind;
use super::LedgerError;
use crate::storage::{NewUser, ReferralRecord, StoreError, UserDatabase, UserRecord, UserWriter};

/// Paid to the referrer when someone signs up with their code.
pub const SIGNUP_REFERRAL_BONUS: u64 = 40;
/// Paid to the new user for signing up with a valid code.
pub const REFERRED_SIGNUP_BONUS: u64 = 40;
/// Paid to a user for a completed payment.
pub const PAYMENT_BONUS: u64 = 50;
/// Paid to the referrer of a user who completed a payment.
pub const REFERRER_PAYMENT_BONUS: u64 = 20;

const CODE_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_SUFFIX_LEN: usize = 6;
const CODE_FALLBACK_PREFIX: &str = "USR";
const CODE_ATTEMPTS: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum ReferralError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("system random number generator failed")]
    Rng,

    #[error("could not allocate a unique referral code")]
    CodeSpaceExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReferralAction {
    /// Someone signed up with this user's code
    SignupBonus,
    /// This user completed a payment
    PaymentBonus,
    /// A user this one referred completed a payment
    ReferralBonus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReferralEntry {
    pub action: ReferralAction,
    pub amount: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referred_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Per-action sums over a referral history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReferralTotals {
    pub signup_bonus: u64,
    pub payment_bonus: u64,
    pub referral_bonus: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralState {
    code: String,
    #[serde(default)]
    referred_by: Option<String>,
    #[serde(default)]
    count: u64,
    /// Coins earned from other users' activity
    #[serde(default)]
    coins_earned: u64,
    #[serde(default)]
    history: Vec<ReferralEntry>,
}

impl ReferralState {
    pub fn new(code: String, referred_by: Option<String>) -> Self {
        Self {
            code,
            referred_by,
            count: 0,
            coins_earned: 0,
            history: Vec::new(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Id of the user whose code was used at signup.
    pub fn referred_by(&self) -> Option<&str> {
        self.referred_by.as_deref()
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn coins_earned(&self) -> u64 {
        self.coins_earned
    }

    pub fn history(&self) -> &[ReferralEntry] {
        &self.history
    }

    pub fn totals(&self) -> ReferralTotals {
        self.history
            .iter()
            .fold(ReferralTotals::default(), |mut totals, entry| {
                let slot = match entry.action {
                    ReferralAction::SignupBonus => &mut totals.signup_bonus,
                    ReferralAction::PaymentBonus => &mut totals.payment_bonus,
                    ReferralAction::ReferralBonus => &mut totals.referral_bonus,
                };
                *slot = slot.saturating_add(entry.amount);
                totals
            })
    }

    fn record_signup(&mut self, referred_user: &str, amount: u64) {
        self.count = self.count.saturating_add(1);
        self.coins_earned = self.coins_earned.saturating_add(amount);
        self.history.push(ReferralEntry {
            action: ReferralAction::SignupBonus,
            amount,
            referred_user: Some(referred_user.to_string()),
            by: None,
            created_at: Utc::now(),
        });
    }

    fn record_payment_bonus(&mut self, amount: u64) {
        self.history.push(ReferralEntry {
            action: ReferralAction::PaymentBonus,
            amount,
            referred_user: None,
            by: Some("system".to_string()),
            created_at: Utc::now(),
        });
    }

    fn record_referral_bonus(&mut self, referred_user: &str, amount: u64) {
        self.coins_earned = self.coins_earned.saturating_add(amount);
        self.history.push(ReferralEntry {
            action: ReferralAction::ReferralBonus,
            amount,
            referred_user: Some(referred_user.to_string()),
            by: None,
            created_at: Utc::now(),
        });
    }
}

/// `ABC-X7K2QP`: up to three letters or digits of the name, then six random symbols.
pub fn generate_referral_code(name: Option<&str>, rng: &dyn SecureRandom) -> Result<String, ReferralError> {
    let prefix: String = name
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(3)
        .collect::<String>()
        .to_ascii_uppercase();
    let prefix = if prefix.is_empty() {
        CODE_FALLBACK_PREFIX.to_string()
    } else {
        prefix
    };

    // Rejection sampling keeps every symbol equally likely.
    let limit = (u8::MAX as usize + 1) / CODE_ALPHABET.len() * CODE_ALPHABET.len();
    let mut suffix = String::with_capacity(CODE_SUFFIX_LEN);
    let mut buf = [0u8; 16];
    while suffix.len() < CODE_SUFFIX_LEN {
        rng.fill(&mut buf).map_err(|_| ReferralError::Rng)?;
        for byte in buf {
            if (byte as usize) < limit && suffix.len() < CODE_SUFFIX_LEN {
                suffix.push(CODE_ALPHABET[byte as usize % CODE_ALPHABET.len()] as char);
            }
        }
    }

    Ok(format!("{prefix}-{suffix}"))
}

/// Draw codes from `next_code` until one is free in the referral-code index.
fn allocate_code(
    tx: &UserWriter<'_>,
    mut next_code: impl FnMut() -> Result<String, ReferralError>,
) -> Result<String, ReferralError> {
    for _ in 0..CODE_ATTEMPTS {
        let code = next_code()?;
        if !tx.referral_code_taken(&code)? {
            return Ok(code);
        }
        tracing::debug!(code = %code, "referral code collision, retrying");
    }
    Err(ReferralError::CodeSpaceExhausted)
}

/// Outcome of [`enroll`].
#[derive(Debug, Clone)]
pub struct Registration {
    pub user: UserRecord,
    /// Set when the supplied referral code resolved to a user
    pub referrer_id: Option<String>,
    /// Coins the new user received for using a referral code
    pub welcome_bonus: Option<u64>,
}

/// Create a user and, if `referral_code` names an existing user, pay both
/// signup bonuses. Everything happens in one write transaction.
///
/// An unknown referral code is not an error: the user is created without a
/// referrer.
pub fn enroll(
    db: &UserDatabase,
    input: NewUser,
    referral_code: Option<&str>,
    rng: &dyn SecureRandom,
) -> Result<Registration, ReferralError> {
    let user_id = uuid::Uuid::new_v4().to_string();
    let referral_code = referral_code.map(str::trim).filter(|code| !code.is_empty());

    db.write(|tx| -> Result<Registration, ReferralError> {
        if tx.find_by_email(&input.email)?.is_some() {
            return Err(StoreError::EmailTaken.into());
        }

        let own_code = allocate_code(tx, || generate_referral_code(input.name.as_deref(), rng))?;

        let referrer = match referral_code {
            Some(code) => {
                let found = tx.find_by_referral_code(code)?;
                if found.is_none() {
                    tracing::warn!(referral_code = %code, "referral code not found, registering without referrer");
                }
                found
            }
            None => None,
        };

        let referral = ReferralState::new(own_code, referrer.as_ref().map(|r| r.id.clone()));
        let mut user = UserRecord::new(user_id, input, referral);

        let Some(mut referrer) = referrer else {
            tx.insert_user(&user)?;
            return Ok(Registration {
                user,
                referrer_id: None,
                welcome_bonus: None,
            });
        };

        user.wallet.credit(
            REFERRED_SIGNUP_BONUS,
            WalletEntryKind::ReferralBonus,
            format!("Welcome bonus for joining with {}'s referral code", referrer.display_name()),
            Some(referrer.id.clone()),
        )?;
        tx.insert_user(&user)?;

        referrer.touch();
        referrer.wallet.credit(
            SIGNUP_REFERRAL_BONUS,
            WalletEntryKind::ReferralBonus,
            format!("Referral bonus for {}", user.display_name()),
            Some(user.id.clone()),
        )?;
        referrer.referral.record_signup(&user.id, SIGNUP_REFERRAL_BONUS);
        if let Some(conversion) = referrer.wallet.auto_convert()? {
            tracing::info!(
                user_id = %referrer.id,
                divine_coins = conversion.divine_coins_added,
                "auto-converted referrer coins"
            );
        }
        tx.save_user(&referrer)?;

        tx.insert_referral(&ReferralRecord {
            referrer_id: referrer.id.clone(),
            referred_id: user.id.clone(),
            reward_given: true,
            reward_amount: SIGNUP_REFERRAL_BONUS,
            created_at: Utc::now(),
        })?;

        tracing::info!(
            user_id = %user.id,
            referrer_id = %referrer.id,
            bonus = SIGNUP_REFERRAL_BONUS,
            "referral signup rewarded"
        );

        Ok(Registration {
            user,
            referrer_id: Some(referrer.id),
            welcome_bonus: Some(REFERRED_SIGNUP_BONUS),
        })
    })
}

/// Outcome of [`reward_payment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReward {
    pub coins: u64,
    pub divine_coins: u64,
    /// Referrer that received the follow-up bonus, if any
    pub referrer_credited: Option<String>,
}

/// Pay the payment bonus to `buyer_id`, then the referrer bonus to their
/// referrer.
///
/// The two credits are separate transactions. A referrer that no longer
/// exists is logged and skipped; the buyer's bonus stands either way.
pub fn reward_payment(db: &UserDatabase, buyer_id: &str) -> Result<PaymentReward, ReferralError> {
    let buyer = db.update_user(buyer_id, |buyer| -> Result<UserRecord, ReferralError> {
        buyer
            .wallet
            .credit(PAYMENT_BONUS, WalletEntryKind::PaymentBonus, "Payment bonus", None)?;
        buyer.referral.record_payment_bonus(PAYMENT_BONUS);
        buyer.wallet.auto_convert()?;
        Ok(buyer.clone())
    })?;
    tracing::info!(user_id = %buyer.id, bonus = PAYMENT_BONUS, "payment bonus credited");

    let mut referrer_credited = None;
    if let Some(referrer_id) = buyer.referral.referred_by() {
        let credited = db.update_user(referrer_id, |referrer| -> Result<(), ReferralError> {
            referrer.wallet.credit(
                REFERRER_PAYMENT_BONUS,
                WalletEntryKind::ReferralBonus,
                format!("Referral bonus for {}'s payment", buyer.display_name()),
                Some(buyer.id.clone()),
            )?;
            referrer.referral.record_referral_bonus(&buyer.id, REFERRER_PAYMENT_BONUS);
            referrer.wallet.auto_convert()?;
            Ok(())
        });

        match credited {
            Ok(()) => {
                tracing::info!(
                    user_id = %referrer_id,
                    referred_user = %buyer.id,
                    bonus = REFERRER_PAYMENT_BONUS,
                    "referrer payment bonus credited"
                );
                referrer_credited = Some(referrer_id.to_string());
            }
            Err(ReferralError::Store(StoreError::NotFound(_))) => {
                tracing::warn!(user_id = %buyer.id, referrer_id = %referrer_id, "referrer no longer exists, skipping bonus");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(PaymentReward {
        coins: buyer.wallet.coins(),
        divine_coins: buyer.wallet.divine_coins(),
        referrer_credited,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use ring::rand::SystemRandom;
    use tempfile::TempDir;

    fn open_db() -> (UserDatabase, TempDir) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let db = UserDatabase::open(&dir.path().join("test.redb")).unwrap();
        (db, dir)
    }

    fn new_user(name: &str) -> NewUser {
        NewUser {
            name: Some(name.to_string()),
            email: format!("{}@example.com", name.to_lowercase()),
            password_hash: "hash".to_string(),
            role: Role::User,
            gender: None,
            occupation: None,
            occupation_type: None,
            agreed_to_privacy_policy: true,
        }
    }

    fn register(db: &UserDatabase, name: &str, code: Option<&str>) -> Registration {
        enroll(db, new_user(name), code, &SystemRandom::new()).unwrap()
    }

    #[test]
    fn code_has_name_prefix_and_random_suffix() {
        let rng = SystemRandom::new();
        let code = generate_referral_code(Some("alice"), &rng).unwrap();
        let (prefix, suffix) = code.split_once('-').unwrap();

        assert_eq!(prefix, "ALI");
        assert_eq!(suffix.len(), 6);
        assert!(suffix.bytes().all(|b| CODE_ALPHABET.contains(&b)));
    }

    #[test]
    fn code_prefix_falls_back_for_missing_name() {
        let rng = SystemRandom::new();
        assert!(generate_referral_code(None, &rng).unwrap().starts_with("USR-"));
        assert!(generate_referral_code(Some("!!"), &rng).unwrap().starts_with("USR-"));
        assert!(generate_referral_code(Some("Jo"), &rng).unwrap().starts_with("JO-"));
    }

    #[test]
    fn registration_without_code_starts_empty() {
        let (db, _dir) = open_db();
        let reg = register(&db, "Alice", None);

        assert_eq!(reg.user.wallet.coins(), 0);
        assert!(reg.user.referral.referred_by().is_none());
        assert!(reg.welcome_bonus.is_none());
        assert!(db.find_by_referral_code(reg.user.referral.code()).unwrap().is_some());
    }

    #[test]
    fn codes_are_unique_across_users() {
        let (db, _dir) = open_db();
        let a = register(&db, "Alice", None);
        let b = register(&db, "Alicia", None);
        assert_ne!(a.user.referral.code(), b.user.referral.code());
    }

    #[test]
    fn signup_with_code_rewards_both_sides() {
        let (db, _dir) = open_db();
        let alice = register(&db, "Alice", None);
        let bob = register(&db, "Bob", Some(alice.user.referral.code()));

        assert_eq!(bob.referrer_id.as_deref(), Some(alice.user.id.as_str()));
        assert_eq!(bob.welcome_bonus, Some(REFERRED_SIGNUP_BONUS));
        assert_eq!(bob.user.wallet.coins(), 40);
        assert_eq!(bob.user.referral.referred_by(), Some(alice.user.id.as_str()));

        let alice = db.get_user(&alice.user.id).unwrap().unwrap();
        assert_eq!(alice.wallet.coins(), 40);
        assert_eq!(alice.referral.count(), 1);
        let history = alice.referral.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, ReferralAction::SignupBonus);
        assert_eq!(history[0].amount, 40);
        assert_eq!(history[0].referred_user.as_deref(), Some(bob.user.id.as_str()));
        assert_eq!(alice.wallet.history()[0].kind, WalletEntryKind::ReferralBonus);

        let records = db.referrals_by(&alice.id).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].referred_id, bob.user.id);
        assert!(records[0].reward_given);
    }

    #[test]
    fn unknown_code_registers_without_bonus() {
        let (db, _dir) = open_db();
        let reg = register(&db, "Carol", Some("NOPE-000000"));

        assert!(reg.referrer_id.is_none());
        assert_eq!(reg.user.wallet.coins(), 0);
        assert!(reg.user.referral.referred_by().is_none());
    }

    #[test]
    fn duplicate_email_credits_nobody() {
        let (db, _dir) = open_db();
        let alice = register(&db, "Alice", None);
        register(&db, "Bob", None);

        let err = enroll(&db, new_user("Bob"), Some(alice.user.referral.code()), &SystemRandom::new())
            .unwrap_err();
        assert!(matches!(err, ReferralError::Store(StoreError::EmailTaken)));

        let alice = db.get_user(&alice.user.id).unwrap().unwrap();
        assert_eq!(alice.wallet.coins(), 0);
        assert_eq!(alice.referral.count(), 0);
    }

    #[test]
    fn referrer_auto_converts_at_threshold() {
        let (db, _dir) = open_db();
        let alice = register(&db, "Alice", None);
        db.update_user(&alice.user.id, |u| -> Result<(), ReferralError> {
            u.wallet.credit(300, WalletEntryKind::Earn, "seed", None)?;
            Ok(())
        })
        .unwrap();

        register(&db, "Bob", Some(alice.user.referral.code()));

        let alice = db.get_user(&alice.user.id).unwrap().unwrap();
        assert_eq!(alice.wallet.divine_coins(), 1);
        assert_eq!(alice.wallet.coins(), 340 - 333);
    }

    #[test]
    fn payment_rewards_buyer_and_referrer() {
        let (db, _dir) = open_db();
        let alice = register(&db, "Alice", None);
        let bob = register(&db, "Bob", Some(alice.user.referral.code()));

        let reward = reward_payment(&db, &bob.user.id).unwrap();
        assert_eq!(reward.coins, 40 + PAYMENT_BONUS);
        assert_eq!(reward.referrer_credited.as_deref(), Some(alice.user.id.as_str()));

        let alice = db.get_user(&alice.user.id).unwrap().unwrap();
        assert_eq!(alice.wallet.coins(), 40 + REFERRER_PAYMENT_BONUS);
        assert_eq!(alice.referral.totals().referral_bonus, REFERRER_PAYMENT_BONUS);
        assert_eq!(alice.referral.coins_earned(), 60);

        let bob = db.get_user(&bob.user.id).unwrap().unwrap();
        assert_eq!(bob.referral.totals().payment_bonus, PAYMENT_BONUS);
        assert_eq!(bob.wallet.history().last().unwrap().kind, WalletEntryKind::PaymentBonus);
    }

    #[test]
    fn payment_without_referrer_only_pays_buyer() {
        let (db, _dir) = open_db();
        let alice = register(&db, "Alice", None);

        let reward = reward_payment(&db, &alice.user.id).unwrap();
        assert_eq!(reward.coins, PAYMENT_BONUS);
        assert!(reward.referrer_credited.is_none());
    }

    #[test]
    fn payment_for_unknown_user_is_not_found() {
        let (db, _dir) = open_db();
        let err = reward_payment(&db, "ghost").unwrap_err();
        assert!(matches!(err, ReferralError::Store(StoreError::NotFound(_))));
    }

    #[test]
    fn repeated_payments_auto_convert() {
        let (db, _dir) = open_db();
        let alice = register(&db, "Alice", None);

        let mut last = None;
        for _ in 0..7 {
            last = Some(reward_payment(&db, &alice.user.id).unwrap());
        }
        // 7 * 50 = 350 coins, one conversion of 333
        let last = last.unwrap();
        assert_eq!(last.divine_coins, 1);
        assert_eq!(last.coins, 17);
    }

    #[test]
    fn colliding_codes_exhaust_allocation() {
        let (db, _dir) = open_db();
        let alice = register(&db, "Alice", None);
        let taken = alice.user.referral.code().to_string();

        let mut attempts = 0;
        let result = db.write(|tx| {
            allocate_code(tx, || {
                attempts += 1;
                Ok(taken.clone())
            })
        });

        assert!(matches!(result, Err(ReferralError::CodeSpaceExhausted)));
        assert_eq!(attempts, CODE_ATTEMPTS);
    }

    #[test]
    fn allocation_retries_past_a_collision() {
        let (db, _dir) = open_db();
        let alice = register(&db, "Alice", None);
        let mut candidates = vec!["ALI-FRESH1".to_string(), alice.user.referral.code().to_string()];

        let code = db
            .write(|tx| allocate_code(tx, || Ok(candidates.pop().unwrap())))
            .unwrap();
        assert_eq!(code, "ALI-FRESH1");
        assert!(candidates.is_empty());
    }

    #[test]
    fn concurrent_payments_lose_no_credit() {
        const PAYMENTS: u64 = 6;
        let (db, _dir) = open_db();
        let alice = register(&db, "Alice", None);
        let bob = register(&db, "Bob", Some(alice.user.referral.code()));

        std::thread::scope(|s| {
            for _ in 0..PAYMENTS {
                s.spawn(|| reward_payment(&db, &bob.user.id).unwrap());
            }
        });

        let alice = db.get_user(&alice.user.id).unwrap().unwrap();
        assert_eq!(alice.wallet.coins(), SIGNUP_REFERRAL_BONUS + PAYMENTS * REFERRER_PAYMENT_BONUS);
        assert_eq!(alice.wallet.history().len(), 1 + PAYMENTS as usize);
        assert_eq!(alice.referral.history().len(), 1 + PAYMENTS as usize);
        assert_eq!(alice.referral.totals().referral_bonus, PAYMENTS * REFERRER_PAYMENT_BONUS);

        // 40 + 6 * 50 = 340 coins, converted once at 333
        let bob = db.get_user(&bob.user.id).unwrap().unwrap();
        assert_eq!(bob.wallet.coins(), 7);
        assert_eq!(bob.wallet.divine_coins(), 1);
        assert_eq!(bob.referral.totals().payment_bonus, PAYMENTS * PAYMENT_BONUS);
    }
}
