// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Community-wide aggregates and leaderboard ordering.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::user::{MemberProfile, User};

/// Number of members shown on the leaderboard.
pub const LEADERBOARD_SIZE: usize = 50;

/// Totals shown on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_contributors: u64,
    pub total_referrals: u64,
    pub total_events: u64,
    pub total_content: u64,
}

impl DashboardStats {
    pub fn from_users<'a>(users: impl IntoIterator<Item = &'a User>) -> Self {
        users.into_iter().fold(Self::default(), |mut acc, user| {
            acc.total_contributors += 1;
            acc.total_referrals += u64::from(user.referrals_count);
            acc.total_events += u64::from(user.events_count);
            acc.total_content += u64::from(user.content_count);
            acc
        })
    }
}

/// Leaderboard ranking column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeaderboardSort {
    #[default]
    TotalPoints,
    Referrals,
    Events,
    Content,
}

impl LeaderboardSort {
    /// Parse the `sortBy` query value; anything unknown ranks by points.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("referrals") => Self::Referrals,
            Some("events") => Self::Events,
            Some("content") => Self::Content,
            _ => Self::TotalPoints,
        }
    }

    /// Stored field name, used for Firestore ordering.
    pub fn field(self) -> &'static str {
        match self {
            Self::TotalPoints => "total_points",
            Self::Referrals => "referrals_count",
            Self::Events => "events_count",
            Self::Content => "content_count",
        }
    }

    pub fn score(self, user: &User) -> u32 {
        match self {
            Self::TotalPoints => user.total_points,
            Self::Referrals => user.referrals_count,
            Self::Events => user.events_count,
            Self::Content => user.content_count,
        }
    }
}

/// One leaderboard row: 1-based position plus the ranked counter.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub score: u32,
    #[serde(flatten)]
    pub member: MemberProfile,
}

/// Number rows already ordered by `sort`, keeping at most [`LEADERBOARD_SIZE`].
pub fn rank_members(users: Vec<User>, sort: LeaderboardSort) -> Vec<LeaderboardEntry> {
    users
        .into_iter()
        .take(LEADERBOARD_SIZE)
        .enumerate()
        .map(|(i, user)| LeaderboardEntry {
            rank: i + 1,
            score: sort.score(&user),
            member: MemberProfile::from(user),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(referrals: u32, events: u32, content: u32) -> User {
        let mut u = User::new(
            "u".to_string(),
            "u@example.com".to_string(),
            String::new(),
            "u".to_string(),
            String::new(),
            chrono::DateTime::from_timestamp(0, 0).unwrap(),
        );
        u.referrals_count = referrals;
        u.events_count = events;
        u.content_count = content;
        u
    }

    #[test]
    fn test_dashboard_totals() {
        let users = [user(10, 1, 3), user(5, 0, 2)];
        let stats = DashboardStats::from_users(&users);
        assert_eq!(
            stats,
            DashboardStats {
                total_contributors: 2,
                total_referrals: 15,
                total_events: 1,
                total_content: 5,
            }
        );
    }

    #[test]
    fn test_unknown_sort_falls_back_to_points() {
        assert_eq!(LeaderboardSort::parse(Some("bogus")), LeaderboardSort::TotalPoints);
        assert_eq!(LeaderboardSort::parse(None), LeaderboardSort::TotalPoints);
        assert_eq!(LeaderboardSort::parse(Some("events")), LeaderboardSort::Events);
        assert_eq!(LeaderboardSort::Referrals.field(), "referrals_count");
    }

    #[test]
    fn test_rank_members_numbers_from_one() {
        let rows = rank_members(vec![user(9, 0, 0), user(4, 0, 0)], LeaderboardSort::Referrals);
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].rank, rows[0].score), (1, 9));
        assert_eq!((rows[1].rank, rows[1].score), (2, 4));

        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["referralsCount"], 9);
        assert!(json.get("passwordHash").is_none());
    }
}
