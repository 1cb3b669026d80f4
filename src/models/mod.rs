// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod activity;
pub mod forum;
pub mod quest;
pub mod stats;
pub mod user;

pub use activity::{Activity, ActivityEvent, ActivityRecord, ActivityView};
pub use forum::{ForumCategory, ForumReply, ForumTopic};
pub use quest::{Quest, QuestCompletion};
pub use stats::{DashboardStats, LeaderboardEntry, LeaderboardSort};
pub use user::{MemberProfile, Role, User, UserSummary};
