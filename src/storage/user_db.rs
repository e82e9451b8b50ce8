// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded user database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user_id → serialized UserRecord
//! - `email_index`: normalized email → user_id (unique)
//! - `referral_code_index`: referral code → user_id (unique)
//! - `referrals`: composite key (referrer_id|referred_id) → serialized ReferralRecord
//!
//! redb admits a single write transaction at a time, so every
//! read-modify-write done through [`UserDatabase::write`] is serialized
//! against all others.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};

use super::records::{ReferralRecord, UserRecord};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: user_id → serialized UserRecord (JSON bytes).
const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Unique index: normalized email → user_id.
const EMAIL_INDEX: TableDefinition<&str, &str> = TableDefinition::new("email_index");

/// Unique index: referral code → user_id.
const REFERRAL_CODE_INDEX: TableDefinition<&str, &str> = TableDefinition::new("referral_code_index");

/// Referral records keyed `referrer_id|referred_id` so one referrer is a contiguous range.
const REFERRALS: TableDefinition<&str, &[u8]> = TableDefinition::new("referrals");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("User already exists")]
    EmailTaken,

    #[error("referral code already assigned: {0}")]
    ReferralCodeTaken(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Key Helpers
// =============================================================================

fn referral_key(referrer_id: &str, referred_id: &str) -> String {
    format!("{referrer_id}|{referred_id}")
}

/// Range bounds covering every referral of one referrer.
///
/// `}` sorts directly after `|`, so `[id|, id})` holds exactly the keys
/// with the `id|` prefix.
fn referral_range(referrer_id: &str) -> (String, String) {
    (format!("{referrer_id}|"), format!("{referrer_id}}}"))
}

// =============================================================================
// UserDatabase
// =============================================================================

/// Embedded ACID user database.
pub struct UserDatabase {
    db: Database,
}

impl UserDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(EMAIL_INDEX)?;
            let _ = write_txn.open_table(REFERRAL_CODE_INDEX)?;
            let _ = write_txn.open_table(REFERRALS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn get_user(&self, user_id: &str) -> StoreResult<Option<UserRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        let user = match table.get(user_id)? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };
        Ok(user)
    }

    /// Look up a user by already-normalized email.
    pub fn find_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let user_id = {
            let read_txn = self.db.begin_read()?;
            let index = read_txn.open_table(EMAIL_INDEX)?;
            let id = index.get(email)?.map(|v| v.value().to_string());
            id
        };
        match user_id {
            Some(id) => self.get_user(&id),
            None => Ok(None),
        }
    }

    pub fn find_by_referral_code(&self, code: &str) -> StoreResult<Option<UserRecord>> {
        let user_id = {
            let read_txn = self.db.begin_read()?;
            let index = read_txn.open_table(REFERRAL_CODE_INDEX)?;
            let id = index.get(code)?.map(|v| v.value().to_string());
            id
        };
        match user_id {
            Some(id) => self.get_user(&id),
            None => Ok(None),
        }
    }

    /// All referral records where `referrer_id` is the referrer.
    pub fn referrals_by(&self, referrer_id: &str) -> StoreResult<Vec<ReferralRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(REFERRALS)?;
        let (start, end) = referral_range(referrer_id);

        let mut records = Vec::new();
        for entry in table.range(start.as_str()..end.as_str())? {
            let (_, value) = entry?;
            records.push(serde_json::from_slice(value.value())?);
        }
        Ok(records)
    }

    /// Cheap readiness probe: open a read transaction on the users table.
    pub fn health_check(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(USERS)?;
        Ok(())
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Run `f` inside one write transaction.
    ///
    /// Commits when `f` returns `Ok`, aborts (discarding every change made
    /// through the writer) when it returns `Err`.
    pub fn write<T, E>(&self, f: impl FnOnce(&UserWriter<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let txn = self.db.begin_write().map_err(StoreError::from)?;
        let result = f(&UserWriter { txn: &txn });

        match result {
            Ok(value) => {
                txn.commit().map_err(StoreError::from)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort_err) = txn.abort() {
                    tracing::warn!(error = %abort_err, "failed to abort write transaction");
                }
                Err(e)
            }
        }
    }

    /// Load a user, apply `f`, and save it back in one transaction.
    ///
    /// `updated_at` is bumped before `f` runs. Nothing is written if `f` fails.
    pub fn update_user<T, E>(
        &self,
        user_id: &str,
        f: impl FnOnce(&mut UserRecord) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        self.write(|tx| {
            let mut user = tx
                .get_user(user_id)?
                .ok_or_else(|| StoreError::NotFound(format!("User {user_id}")))?;
            user.touch();
            let value = f(&mut user)?;
            tx.save_user(&user)?;
            Ok(value)
        })
    }
}

// =============================================================================
// UserWriter
// =============================================================================

/// Table access inside an open write transaction.
pub struct UserWriter<'txn> {
    txn: &'txn WriteTransaction,
}

impl UserWriter<'_> {
    pub fn get_user(&self, user_id: &str) -> StoreResult<Option<UserRecord>> {
        let table = self.txn.open_table(USERS)?;
        let bytes = table.get(user_id)?.map(|v| v.value().to_vec());
        match bytes {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn find_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        match self.indexed_id(EMAIL_INDEX, email)? {
            Some(id) => self.get_user(&id),
            None => Ok(None),
        }
    }

    pub fn find_by_referral_code(&self, code: &str) -> StoreResult<Option<UserRecord>> {
        match self.indexed_id(REFERRAL_CODE_INDEX, code)? {
            Some(id) => self.get_user(&id),
            None => Ok(None),
        }
    }

    pub fn referral_code_taken(&self, code: &str) -> StoreResult<bool> {
        Ok(self.indexed_id(REFERRAL_CODE_INDEX, code)?.is_some())
    }

    fn indexed_id(&self, index: TableDefinition<&str, &str>, key: &str) -> StoreResult<Option<String>> {
        let table = self.txn.open_table(index)?;
        let id = table.get(key)?.map(|v| v.value().to_string());
        Ok(id)
    }

    /// Insert a brand-new user together with its unique index entries.
    pub fn insert_user(&self, user: &UserRecord) -> StoreResult<()> {
        if self.indexed_id(EMAIL_INDEX, &user.email)?.is_some() {
            return Err(StoreError::EmailTaken);
        }
        if self.referral_code_taken(user.referral.code())? {
            return Err(StoreError::ReferralCodeTaken(user.referral.code().to_string()));
        }

        let json = serde_json::to_vec(user)?;
        {
            let mut users = self.txn.open_table(USERS)?;
            if users.get(user.id.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!("User {}", user.id)));
            }
            users.insert(user.id.as_str(), json.as_slice())?;
        }
        {
            let mut emails = self.txn.open_table(EMAIL_INDEX)?;
            emails.insert(user.email.as_str(), user.id.as_str())?;
        }
        {
            let mut codes = self.txn.open_table(REFERRAL_CODE_INDEX)?;
            codes.insert(user.referral.code(), user.id.as_str())?;
        }
        Ok(())
    }

    /// Overwrite an existing user, keeping the email index in step.
    pub fn save_user(&self, user: &UserRecord) -> StoreResult<()> {
        let previous = self
            .get_user(&user.id)?
            .ok_or_else(|| StoreError::NotFound(format!("User {}", user.id)))?;

        if previous.email != user.email {
            let mut emails = self.txn.open_table(EMAIL_INDEX)?;
            let owner = emails.get(user.email.as_str())?.map(|v| v.value().to_string());
            if owner.is_some_and(|owner| owner != user.id) {
                return Err(StoreError::EmailTaken);
            }
            emails.remove(previous.email.as_str())?;
            emails.insert(user.email.as_str(), user.id.as_str())?;
        }

        let json = serde_json::to_vec(user)?;
        let mut users = self.txn.open_table(USERS)?;
        users.insert(user.id.as_str(), json.as_slice())?;
        Ok(())
    }

    pub fn insert_referral(&self, record: &ReferralRecord) -> StoreResult<()> {
        let key = referral_key(&record.referrer_id, &record.referred_id);
        let json = serde_json::to_vec(record)?;
        let mut table = self.txn.open_table(REFERRALS)?;
        table.insert(key.as_str(), json.as_slice())?;
        Ok(())
    }
}
