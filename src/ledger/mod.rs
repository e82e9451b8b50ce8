// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Coin Ledger
//!
//! Every user carries a [`Wallet`] (coins and divine coins) and a
//! [`ReferralState`] (own code, referrer, bonus history). Both live inside
//! the user record and are only mutated through the methods here, which pair
//! each balance change with exactly one history entry.
//!
//! ## Bonus table
//!
//! | Event                        | Recipient | Coins |
//! |------------------------------|-----------|-------|
//! | Signup with a referral code  | referrer  | 40    |
//! | Signup with a referral code  | new user  | 40    |
//! | Payment                      | payer     | 50    |
//! | Payment                      | referrer  | 20    |
//!
//! 333 coins convert to one divine coin.

pub mod error;
pub mod referral;
pub mod wallet;

pub use error::LedgerError;
pub use referral::{
    enroll, generate_referral_code, reward_payment, PaymentReward, ReferralAction, ReferralEntry,
    ReferralError, ReferralState, ReferralTotals, Registration, PAYMENT_BONUS,
    REFERRED_SIGNUP_BONUS, REFERRER_PAYMENT_BONUS, SIGNUP_REFERRAL_BONUS,
};
pub use wallet::{Conversion, Wallet, WalletEntry, WalletEntryKind, WalletView, COINS_PER_DIVINE_COIN};
