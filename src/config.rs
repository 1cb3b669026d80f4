// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honoured for local development. On Cloud Run the
//! secrets are injected as environment variables by the deployment.

use chrono::Weekday;
use std::env;

use crate::services::feed::{FeedBuilder, ImportancePolicy, PolicyError};

const DEFAULT_FEED_LIMIT: u32 = 50;
const MAX_FEED_LIMIT: u32 = 200;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Mark the session cookie `Secure` (HTTPS deployments)
    pub secure_cookies: bool,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,

    // --- Activity feed ---
    /// Number of most recent activities fetched for the feed
    pub feed_limit: u32,
    /// First day of the "This Week" section
    pub feed_week_start: Weekday,
    /// Type tag -> importance class mapping
    pub feed_importance: ImportancePolicy,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let jwt_signing_key = env::var("JWT_SIGNING_KEY")
            .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
            .trim()
            .as_bytes()
            .to_vec();
        if jwt_signing_key.is_empty() {
            return Err(ConfigError::Invalid {
                name: "JWT_SIGNING_KEY",
                reason: "must not be empty".to_string(),
            });
        }

        let feed_importance = match env::var("FEED_IMPORTANCE") {
            Ok(spec) => ImportancePolicy::default().with_overrides(&spec)?,
            Err(_) => ImportancePolicy::default(),
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: parse_var("PORT", 8080)?,
            secure_cookies: parse_var("SECURE_COOKIES", false)?,
            jwt_signing_key,
            feed_limit: parse_var("FEED_LIMIT", DEFAULT_FEED_LIMIT)?.clamp(1, MAX_FEED_LIMIT),
            feed_week_start: parse_var("FEED_WEEK_START", Weekday::Sun)?,
            feed_importance,
        })
    }

    /// Deterministic configuration for tests.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:3000".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            secure_cookies: false,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            feed_limit: DEFAULT_FEED_LIMIT,
            feed_week_start: Weekday::Sun,
            feed_importance: ImportancePolicy::default(),
        }
    }

    /// Feed builder configured with this policy and week start.
    pub fn feed_builder(&self) -> FeedBuilder {
        FeedBuilder::new(self.feed_importance.clone(), self.feed_week_start)
    }
}

fn parse_var<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("Invalid FEED_IMPORTANCE: {0}")]
    Importance(#[from] PolicyError),
}
