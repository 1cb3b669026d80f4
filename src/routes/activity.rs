// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Community activity list and grouped feed.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{FixedOffset, Local};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{ActivityView, UserSummary};
use crate::services::TimeSection;
use crate::time_utils::now_utc;
use crate::AppState;

/// Largest UTC offset in minutes (UTC+14:00).
const MAX_TZ_OFFSET_MINUTES: i32 = 14 * 60;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activities", get(list_activities))
        .route("/api/activities/feed", get(get_feed))
}

/// Latest activities joined with their members, newest first.
async fn recent_activity_views(state: &AppState) -> Result<Vec<ActivityView>> {
    let activities = state
        .db
        .list_recent_activities(state.config.feed_limit)
        .await?;
    let users = state
        .db
        .get_users_by_ids(activities.iter().map(|a| a.user_id.as_str()))
        .await?;

    let views: Vec<ActivityView> = activities
        .iter()
        .filter_map(|activity| {
            let user = users.get(&activity.user_id).map(UserSummary::from)?;
            Some(ActivityView::new(activity, user))
        })
        .collect();

    if views.len() < activities.len() {
        tracing::debug!(
            dropped = activities.len() - views.len(),
            "Skipped activities of deleted members"
        );
    }
    Ok(views)
}

async fn list_activities(State(state): State<Arc<AppState>>) -> Result<Json<Vec<ActivityView>>> {
    Ok(Json(recent_activity_views(&state).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedQuery {
    tz_offset: Option<i32>,
}

/// Viewer timezone from a `tzOffset` in minutes east of UTC.
fn viewer_offset(minutes: Option<i32>) -> Result<Option<FixedOffset>> {
    let Some(minutes) = minutes else {
        return Ok(None);
    };
    if minutes.abs() > MAX_TZ_OFFSET_MINUTES {
        return Err(AppError::BadRequest(format!(
            "tzOffset must be within ±{} minutes, got {}",
            MAX_TZ_OFFSET_MINUTES, minutes
        )));
    }
    FixedOffset::east_opt(minutes * 60)
        .map(Some)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid tzOffset {}", minutes)))
}

/// Activities grouped into Today / This Week / Earlier sections.
async fn get_feed(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FeedQuery>,
) -> Result<Json<Vec<TimeSection<ActivityView>>>> {
    let offset = viewer_offset(params.tz_offset)?;
    let views = recent_activity_views(&state).await?;
    let count = views.len();

    let now = now_utc();
    let sections = match offset {
        Some(offset) => state.feed.build(views, &now.with_timezone(&offset)),
        None => state.feed.build(views, &now.with_timezone(&Local)),
    };

    tracing::debug!(
        activities = count,
        sections = sections.len(),
        tz_offset = ?params.tz_offset,
        "Built activity feed"
    );

    Ok(Json(sections))
}
