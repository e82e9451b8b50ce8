// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent state lives in a single redb file under `DATA_DIR`:
//!
//! ```text
//! $DATA_DIR/
//!   sincut.redb   # users, email/referral-code indexes, referrals
//! ```
//!
//! A user record embeds its wallet and referral history, so every ledger
//! operation is one read-modify-write of one row inside one transaction.

pub mod records;
pub mod user_db;

pub use records::{Gender, NewUser, NotificationPrefs, OccupationType, ReferralRecord, UserRecord};
pub use user_db::{StoreError, StoreResult, UserDatabase, UserWriter};
