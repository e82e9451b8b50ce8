// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use ring::rand::SystemRandom;

use crate::auth::TokenIssuer;
use crate::config::AppConfig;
use crate::storage::UserDatabase;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserDatabase>,
    pub tokens: Arc<TokenIssuer>,
    pub config: Arc<AppConfig>,
    /// Randomness for referral codes
    pub rng: Arc<SystemRandom>,
}

impl AppState {
    pub fn new(users: UserDatabase, config: AppConfig) -> Self {
        let tokens = TokenIssuer::new(&config.tokens);
        Self {
            users: Arc::new(users),
            tokens: Arc::new(tokens),
            config: Arc::new(config),
            rng: Arc::new(SystemRandom::new()),
        }
    }
}
