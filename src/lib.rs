// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sincut Server - Coin Wallet & Referral Ledger Service
//!
//! Accounts sign in with short-lived JWT access tokens and a rotating refresh
//! token kept in an HTTP-only cookie. Every account owns a coin wallet that
//! converts into divine coins, and a referral code that pays both sides when
//! new users sign up or pay.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token issuing, password hashing and request authentication
//! - `ledger` - Wallet arithmetic and the referral bonus engine
//! - `storage` - Embedded redb user database

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod state;
pub mod storage;

#[cfg(test)]
mod test_support;
