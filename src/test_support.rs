// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for unit tests.

use tempfile::TempDir;

use crate::config::{AppConfig, TokenConfig};
use crate::state::AppState;
use crate::storage::UserDatabase;

pub const ADMIN_EMAIL: &str = "admin@sincut.test";

pub fn test_config(data_dir: &std::path::Path) -> AppConfig {
    let mut config = AppConfig::new(data_dir, TokenConfig::new("test-access", "test-refresh"));
    config.admin_emails = vec![ADMIN_EMAIL.to_string()];
    config
}

/// Application state backed by a fresh database in a temp directory.
///
/// Keep the returned `TempDir` alive for the duration of the test.
pub fn test_state() -> (AppState, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = test_config(temp_dir.path());
    let users = UserDatabase::open(&config.database_path()).expect("Failed to open database");
    (AppState::new(users, config), temp_dir)
}
