// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Member directory and profile editing.

use axum::{
    extract::{Path, State},
    routing::{get, patch},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::forum::TopicView;
use crate::models::{Activity, ActivityEvent, MemberProfile, User};
use crate::time_utils::now_utc;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/members", get(list_members))
        .route("/api/members/{id}", get(get_member))
        .route("/api/members/{id}/topics", get(get_member_topics))
}

pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/members/{id}", patch(update_member))
}

async fn list_members(State(state): State<Arc<AppState>>) -> Result<Json<Vec<MemberProfile>>> {
    let users = state.db.list_users().await?;
    tracing::debug!(count = users.len(), "Listing members");
    Ok(Json(users.into_iter().map(MemberProfile::from).collect()))
}

async fn get_member(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MemberProfile>> {
    let user = state
        .db
        .get_user(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;
    Ok(Json(MemberProfile::from(user)))
}

async fn get_member_topics(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TopicView>>> {
    let topics = state.db.list_topics_by_author(&id).await?;
    Ok(Json(
        topics
            .into_iter()
            .map(|topic| TopicView::new(topic, None))
            .collect(),
    ))
}

/// Partial profile update. Only fields present in the body change.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub username: Option<String>,
    #[validate(length(max = 1000))]
    pub bio: Option<String>,
    #[validate(length(max = 32))]
    pub skill_tags: Option<Vec<String>>,
    #[validate(length(max = 100))]
    pub lens_handle: Option<String>,
    #[validate(length(max = 100))]
    pub farcaster_handle: Option<String>,
    #[validate(length(max = 100))]
    pub x_handle: Option<String>,
    #[validate(length(max = 100))]
    pub telegram_handle: Option<String>,
    #[validate(length(max = 200))]
    pub college: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 100))]
    pub region: Option<String>,
}

impl UpdateProfileRequest {
    /// Apply the present fields to `user`, returning their wire names.
    pub fn apply(self, user: &mut User) -> Vec<String> {
        let mut updated = Vec::new();
        let mut set = |name: &str, value: Option<String>, field: &mut String| {
            if let Some(value) = value {
                *field = value;
                updated.push(name.to_string());
            }
        };

        set("username", self.username, &mut user.username);
        set("bio", self.bio, &mut user.bio);
        set("lensHandle", self.lens_handle, &mut user.lens_handle);
        set(
            "farcasterHandle",
            self.farcaster_handle,
            &mut user.farcaster_handle,
        );
        set("xHandle", self.x_handle, &mut user.x_handle);
        set(
            "telegramHandle",
            self.telegram_handle,
            &mut user.telegram_handle,
        );
        set("college", self.college, &mut user.college);
        set("city", self.city, &mut user.city);
        set("region", self.region, &mut user.region);

        if let Some(tags) = self.skill_tags {
            user.skill_tags = tags;
            updated.push("skillTags".to_string());
        }
        updated
    }
}

/// Update one's own profile.
async fn update_member(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<MemberProfile>> {
    if auth.user_id != id {
        return Err(AppError::Forbidden(format!(
            "user {} cannot edit profile {}",
            auth.user_id, id
        )));
    }
    body.validate()?;

    let mut user = state
        .db
        .get_user(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

    let updated_fields = body.apply(&mut user);
    if updated_fields.is_empty() {
        return Err(AppError::BadRequest("No profile fields to update".to_string()));
    }

    state.db.upsert_user(&user).await?;

    tracing::info!(user_id = %id, fields = ?updated_fields, "Profile updated");

    let activity = Activity::new(
        &id,
        ActivityEvent::ProfileUpdate { updated_fields },
        now_utc(),
    );
    if let Err(e) = state.db.create_activity(&activity).await {
        tracing::warn!(error = %e, user_id = %id, "Failed to record profile activity");
    }

    Ok(Json(MemberProfile::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User::new(
            "u1".to_string(),
            "ada@example.com".to_string(),
            String::new(),
            "ada".to_string(),
            String::new(),
            chrono::DateTime::from_timestamp(0, 0).unwrap(),
        )
    }

    #[test]
    fn test_apply_reports_only_present_fields() {
        let mut u = user();
        let body: UpdateProfileRequest = serde_json::from_value(serde_json::json!({
            "bio": "Rustacean",
            "xHandle": "@ada",
            "skillTags": ["rust", "design"]
        }))
        .unwrap();

        let fields = body.apply(&mut u);

        assert_eq!(fields, vec!["bio", "xHandle", "skillTags"]);
        assert_eq!(u.bio, "Rustacean");
        assert_eq!(u.x_handle, "@ada");
        assert_eq!(u.username, "ada");
    }

    #[test]
    fn test_empty_username_rejected() {
        let body = UpdateProfileRequest {
            username: Some(String::new()),
            ..Default::default()
        };
        assert!(body.validate().is_err());
    }
}
