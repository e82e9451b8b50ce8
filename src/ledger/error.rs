// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger rule violations.

/// A wallet operation was refused; the wallet is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("You need at least {required} coins to convert to divine coin (have {available})")]
    InsufficientBalance { required: u64, available: u64 },

    #[error("You need at least 1 divine coin to use")]
    InsufficientDivineCoins,

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Balance would overflow")]
    BalanceOverflow,
}
