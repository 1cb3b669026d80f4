// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Contributor Hub: backend for a community contributor program.
//!
//! Members sign up, earn points through referrals, content, events and
//! quests, discuss in a forum and follow a community activity feed. The
//! feed is grouped by recency and importance, and forum replies are
//! rebuilt into threads, by pure transforms in [`services`].

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::FeedBuilder;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub feed: FeedBuilder,
}

impl AppState {
    pub fn new(config: Config, db: FirestoreDb) -> Self {
        let feed = config.feed_builder();
        Self { config, db, feed }
    }
}
