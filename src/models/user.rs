// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Member model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Tier every new member starts in.
pub const DEFAULT_TIER: &str = "explorer";

/// Authorization role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    #[default]
    Contributor,
    Ambassador,
}

/// Member profile stored in Firestore (document ID = `id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// Lowercased login email; empty for wallet-only members
    pub email: String,
    /// Argon2 PHC string; never serialized into API responses. Empty for
    /// wallet-only members, who cannot log in with a password.
    pub password_hash: String,
    /// Lowercased `0x` address for members who connected a wallet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    pub username: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub avatar_url: String,
    pub joined_at: DateTime<Utc>,
    #[serde(default)]
    pub skill_tags: Vec<String>,
    #[serde(default)]
    pub lens_handle: String,
    #[serde(default)]
    pub farcaster_handle: String,
    #[serde(default)]
    pub x_handle: String,
    #[serde(default)]
    pub telegram_handle: String,
    #[serde(default)]
    pub college: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub is_onboarded: bool,
    pub tier: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub referral_code: String,

    // ─── Counters ────────────────────────────────────────────────
    #[serde(default)]
    pub referrals_count: u32,
    #[serde(default)]
    pub content_count: u32,
    #[serde(default)]
    pub events_count: u32,
    #[serde(default)]
    pub sponsor_leads_count: u32,
    #[serde(default)]
    pub total_points: u32,
    #[serde(default)]
    pub quests_completed: u32,
    #[serde(default)]
    pub stipend: u32,
}

impl User {
    /// A fresh member with default tier, role and zeroed counters.
    pub fn new(
        id: String,
        email: String,
        password_hash: String,
        username: String,
        referral_code: String,
        joined_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            email,
            password_hash,
            wallet_address: None,
            username,
            bio: String::new(),
            avatar_url: String::new(),
            joined_at,
            skill_tags: Vec::new(),
            lens_handle: String::new(),
            farcaster_handle: String::new(),
            x_handle: String::new(),
            telegram_handle: String::new(),
            college: String::new(),
            city: String::new(),
            region: String::new(),
            is_onboarded: false,
            tier: DEFAULT_TIER.to_string(),
            role: Role::default(),
            referral_code,
            referrals_count: 0,
            content_count: 0,
            events_count: 0,
            sponsor_leads_count: 0,
            total_points: 0,
            quests_completed: 0,
            stipend: 0,
        }
    }

    /// A member identified only by a wallet address (`0x` + 40 hex digits,
    /// already lowercased). Username and referral code derive from the
    /// address, and the document id is fixed per address so a second
    /// concurrent connect cannot create a duplicate.
    pub fn from_wallet(address: &str, joined_at: DateTime<Utc>) -> Self {
        let hex = address.trim_start_matches("0x");
        let mut user = Self::new(
            format!("wallet_{address}"),
            String::new(),
            String::new(),
            format!("user_{}", hex.chars().take(6).collect::<String>()),
            format!(
                "REF_{}",
                hex.chars().take(8).collect::<String>().to_ascii_uppercase()
            ),
            joined_at,
        );
        user.wallet_address = Some(address.to_string());
        user
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }
}

/// Compact author/actor view attached to activities, topics and replies.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub tier: String,
    pub avatar_url: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            tier: user.tier.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

/// Full public profile (everything except credentials).
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct MemberProfile {
    pub id: String,
    pub email: String,
    pub wallet_address: Option<String>,
    pub username: String,
    pub bio: String,
    pub avatar_url: String,
    pub joined_at: String,
    pub skill_tags: Vec<String>,
    pub lens_handle: String,
    pub farcaster_handle: String,
    pub x_handle: String,
    pub telegram_handle: String,
    pub college: String,
    pub city: String,
    pub region: String,
    pub is_onboarded: bool,
    pub tier: String,
    pub role: Role,
    pub referral_code: String,
    pub referrals_count: u32,
    pub content_count: u32,
    pub events_count: u32,
    pub sponsor_leads_count: u32,
    pub total_points: u32,
    pub quests_completed: u32,
    pub stipend: u32,
}

impl From<User> for MemberProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            wallet_address: user.wallet_address,
            username: user.username,
            bio: user.bio,
            avatar_url: user.avatar_url,
            joined_at: crate::time_utils::format_utc_rfc3339(user.joined_at),
            skill_tags: user.skill_tags,
            lens_handle: user.lens_handle,
            farcaster_handle: user.farcaster_handle,
            x_handle: user.x_handle,
            telegram_handle: user.telegram_handle,
            college: user.college,
            city: user.city,
            region: user.region,
            is_onboarded: user.is_onboarded,
            tier: user.tier,
            role: user.role,
            referral_code: user.referral_code,
            referrals_count: user.referrals_count,
            content_count: user.content_count,
            events_count: user.events_count,
            sponsor_leads_count: user.sponsor_leads_count,
            total_points: user.total_points,
            quests_completed: user.quests_completed,
            stipend: user.stipend,
        }
    }
}
