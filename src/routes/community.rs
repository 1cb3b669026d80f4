// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Community-wide views: leaderboard, dashboard totals, search and the
//! caller's tier progress.

use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::forum::{ForumTopic, TopicView};
use crate::models::stats::rank_members;
use crate::models::{
    DashboardStats, LeaderboardEntry, LeaderboardSort, MemberProfile, User, UserSummary,
};
use crate::services::tiers::{self, TierProgress};
use crate::AppState;

/// Shortest query `/api/search` answers.
const MIN_SEARCH_LEN: usize = 2;
/// Most results returned per kind.
const MAX_SEARCH_RESULTS: usize = 20;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/leaderboard", get(leaderboard))
        .route("/api/dashboard/stats", get(dashboard_stats))
        .route("/api/search", get(search))
}

pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/me/progress", get(my_progress))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeaderboardQuery {
    sort_by: Option<String>,
}

async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>> {
    let sort = LeaderboardSort::parse(params.sort_by.as_deref());
    let users = state.db.get_leaderboard(sort).await?;
    tracing::debug!(sort = ?sort, count = users.len(), "Leaderboard fetched");
    Ok(Json(rank_members(users, sort)))
}

async fn dashboard_stats(State(state): State<Arc<AppState>>) -> Result<Json<DashboardStats>> {
    let users = state.db.list_users().await?;
    Ok(Json(DashboardStats::from_users(&users)))
}

// ─── Search ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

#[derive(Debug, Default, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SearchResults {
    pub members: Vec<MemberProfile>,
    pub topics: Vec<TopicView>,
}

/// Lowercased needle, or `None` when the query is too short to run.
fn search_needle(q: Option<&str>) -> Option<String> {
    let q = q?.trim();
    (q.chars().count() >= MIN_SEARCH_LEN).then(|| q.to_lowercase())
}

fn member_matches(user: &User, needle: &str) -> bool {
    [&user.username, &user.email, &user.bio]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}

fn topic_matches(topic: &ForumTopic, needle: &str) -> bool {
    topic.title.to_lowercase().contains(needle) || topic.content.to_lowercase().contains(needle)
}

/// Topics matching `needle` with their authors, in input order. Topics
/// whose author is gone are skipped.
fn matching_topics(topics: Vec<ForumTopic>, users: &[User], needle: &str) -> Vec<TopicView> {
    let authors: HashMap<&str, &User> = users.iter().map(|u| (u.id.as_str(), u)).collect();

    topics
        .into_iter()
        .filter(|t| topic_matches(t, needle))
        .filter_map(|t| {
            let author = authors.get(t.author_id.as_str()).map(|u| UserSummary::from(*u))?;
            Some(TopicView::new(t, Some(author)))
        })
        .take(MAX_SEARCH_RESULTS)
        .collect()
}

async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResults>> {
    let Some(needle) = search_needle(params.q.as_deref()) else {
        return Ok(Json(SearchResults::default()));
    };

    let (users, topics) = tokio::try_join!(
        state.db.list_users(),
        state.db.list_recent_topics(None)
    )?;

    let topics = matching_topics(topics, &users, &needle);
    let results = SearchResults {
        members: users
            .into_iter()
            .filter(|u| member_matches(u, &needle))
            .take(MAX_SEARCH_RESULTS)
            .map(MemberProfile::from)
            .collect(),
        topics,
    };

    tracing::debug!(
        members = results.members.len(),
        topics = results.topics.len(),
        "Search completed"
    );

    Ok(Json(results))
}

// ─── Progress ────────────────────────────────────────────────

async fn my_progress(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<TierProgress>> {
    let user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(Json(tiers::progress(
        &user.tier,
        user.referrals_count,
        user.events_count,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_queries_do_not_search() {
        assert_eq!(search_needle(None), None);
        assert_eq!(search_needle(Some(" a ")), None);
        assert_eq!(search_needle(Some("Rust")), Some("rust".to_string()));
    }

    #[test]
    fn test_member_match_is_case_insensitive() {
        let mut user = User::new(
            "u1".to_string(),
            "ada@example.com".to_string(),
            String::new(),
            "AdaLovelace".to_string(),
            String::new(),
            chrono::DateTime::from_timestamp(0, 0).unwrap(),
        );
        user.bio = "Writes Rust on weekends".to_string();

        assert!(member_matches(&user, "lovelace"));
        assert!(member_matches(&user, "rust"));
        assert!(!member_matches(&user, "python"));
    }

    fn topic(id: &str, author_id: &str, title: &str) -> ForumTopic {
        ForumTopic {
            id: id.to_string(),
            category_id: "c1".to_string(),
            title: title.to_string(),
            content: String::new(),
            image_url: String::new(),
            author_id: author_id.to_string(),
            created_at: chrono::DateTime::from_timestamp(0, 0).unwrap(),
            is_pinned: false,
            reply_count: 0,
            last_reply_at: None,
        }
    }

    #[test]
    fn test_topic_results_carry_author_and_skip_orphans() {
        let author = User::new(
            "u1".to_string(),
            "ada@example.com".to_string(),
            String::new(),
            "ada".to_string(),
            String::new(),
            chrono::DateTime::from_timestamp(0, 0).unwrap(),
        );
        let topics = vec![
            topic("t1", "u1", "Rust meetup"),
            topic("t2", "deleted", "Rust workshop"),
            topic("t3", "u1", "Design review"),
        ];

        let found = matching_topics(topics, &[author], "rust");

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "t1");
        assert_eq!(
            found[0].author.as_ref().map(|a| a.username.as_str()),
            Some("ada")
        );
    }
}
