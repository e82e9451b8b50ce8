// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Coin and divine-coin balances with an append-only history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::LedgerError;

/// Fixed conversion rate: this many coins buy one divine coin.
pub const COINS_PER_DIVINE_COIN: u64 = 333;

/// Reason for a wallet history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WalletEntryKind {
    Earn,
    /// Coins paid out of the balance; kept so stored histories still load
    Spend,
    /// Coins leaving the balance in a conversion
    Conversion,
    /// Divine coins gained from a conversion
    DivineCoinReceived,
    DivineCoinUsed,
    ReferralBonus,
    PaymentBonus,
}

/// Immutable record of one balance change.
///
/// `amount` is signed: coins for coin entries, divine coins for the
/// `divine_coin_*` kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletEntry {
    pub kind: WalletEntryKind,
    pub amount: i64,
    pub description: String,
    /// User on the other side of a bonus, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WalletEntry {
    fn new(kind: WalletEntryKind, amount: i64, description: String, counterparty: Option<String>) -> Self {
        Self {
            kind,
            amount,
            description,
            counterparty,
            created_at: Utc::now(),
        }
    }
}

/// Outcome of a coin to divine-coin conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Conversion {
    pub coins_used: u64,
    pub divine_coins_added: u64,
}

/// Wallet as returned to clients, newest history first.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletView {
    pub coins: u64,
    pub divine_coins: u64,
    pub history: Vec<WalletEntry>,
}

/// Balances are unsigned, so they can never go negative; every mutator
/// either succeeds and appends history, or fails without touching anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    coins: u64,
    divine_coins: u64,
    #[serde(default)]
    history: Vec<WalletEntry>,
}

impl Wallet {
    pub fn coins(&self) -> u64 {
        self.coins
    }

    pub fn divine_coins(&self) -> u64 {
        self.divine_coins
    }

    /// History in insertion order (oldest first).
    pub fn history(&self) -> &[WalletEntry] {
        &self.history
    }

    /// Add `amount` coins and record why. Returns the new coin balance.
    pub fn credit(
        &mut self,
        amount: u64,
        kind: WalletEntryKind,
        description: impl Into<String>,
        counterparty: Option<String>,
    ) -> Result<u64, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let signed = i64::try_from(amount).map_err(|_| LedgerError::BalanceOverflow)?;
        let balance = self
            .coins
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;

        self.coins = balance;
        self.history
            .push(WalletEntry::new(kind, signed, description.into(), counterparty));
        Ok(balance)
    }

    /// Convert as many whole divine coins as the balance allows.
    ///
    /// Writes one `conversion` / `divine_coin_received` pair regardless of
    /// how many divine coins are produced.
    pub fn convert_to_divine(&mut self) -> Result<Conversion, LedgerError> {
        if self.coins < COINS_PER_DIVINE_COIN {
            return Err(LedgerError::InsufficientBalance {
                required: COINS_PER_DIVINE_COIN,
                available: self.coins,
            });
        }

        let divine_coins_added = self.coins / COINS_PER_DIVINE_COIN;
        let coins_used = divine_coins_added * COINS_PER_DIVINE_COIN;
        let divine_total = self
            .divine_coins
            .checked_add(divine_coins_added)
            .ok_or(LedgerError::BalanceOverflow)?;
        let coins_signed = i64::try_from(coins_used).map_err(|_| LedgerError::BalanceOverflow)?;
        let divine_signed =
            i64::try_from(divine_coins_added).map_err(|_| LedgerError::BalanceOverflow)?;

        self.coins -= coins_used;
        self.divine_coins = divine_total;
        self.history.push(WalletEntry::new(
            WalletEntryKind::Conversion,
            -coins_signed,
            format!("Converted {coins_used} coins to {divine_coins_added} divine coin(s)"),
            None,
        ));
        self.history.push(WalletEntry::new(
            WalletEntryKind::DivineCoinReceived,
            divine_signed,
            format!("Received {divine_coins_added} divine coin(s) from conversion"),
            None,
        ));

        Ok(Conversion {
            coins_used,
            divine_coins_added,
        })
    }

    /// Convert if the balance allows it, otherwise do nothing.
    pub fn auto_convert(&mut self) -> Result<Option<Conversion>, LedgerError> {
        if self.coins < COINS_PER_DIVINE_COIN {
            return Ok(None);
        }
        self.convert_to_divine().map(Some)
    }

    /// Spend one divine coin. Returns the remaining divine coins.
    pub fn use_divine_coin(&mut self) -> Result<u64, LedgerError> {
        if self.divine_coins == 0 {
            return Err(LedgerError::InsufficientDivineCoins);
        }

        self.divine_coins -= 1;
        self.history.push(WalletEntry::new(
            WalletEntryKind::DivineCoinUsed,
            -1,
            "Used divine coin for premium feature".to_string(),
            None,
        ));
        Ok(self.divine_coins)
    }

    pub fn view(&self) -> WalletView {
        WalletView {
            coins: self.coins,
            divine_coins: self.divine_coins,
            history: self.history.iter().rev().cloned().collect(),
        }
    }
}
