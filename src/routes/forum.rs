// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Forum routes: categories, topics, replies and threaded discussions.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::{Validate, ValidationError};

use crate::error::{AppError, Result};
use crate::middleware::auth::{require_role, AuthUser};
use crate::models::forum::{
    CategoryView, ForumCategory, ForumReply, ForumTopic, ReplyView, TopicView,
    DEFAULT_CATEGORY_ICON,
};
use crate::models::{Activity, ActivityEvent, Role, UserSummary};
use crate::services::reply_tree::{build_reply_tree, ReplyNode};
use crate::time_utils::now_utc;
use crate::AppState;

const DEFAULT_RECENT_TOPICS: u32 = 10;
const MAX_RECENT_TOPICS: u32 = 50;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/forum/categories", get(list_categories))
        .route("/api/forum/categories/{id}/topics", get(list_category_topics))
        .route("/api/forum/recent-topics", get(recent_topics))
        .route("/api/forum/topics/{id}", get(get_topic))
        .route("/api/forum/topics/{id}/replies", get(list_replies))
        .route("/api/forum/topics/{id}/thread", get(get_thread))
}

pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/forum/topics", post(create_topic))
        .route("/api/forum/replies", post(create_reply))
        .route("/api/forum/categories", post(create_category))
        .route("/api/forum/categories/{id}", delete(delete_category))
}

// ─── Validation Helpers ──────────────────────────────────────

pub(crate) fn validate_uuid(value: &str) -> std::result::Result<(), ValidationError> {
    uuid::Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|_| ValidationError::new("uuid"))
}

fn validate_slug(value: &str) -> std::result::Result<(), ValidationError> {
    let ok = value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if ok {
        Ok(())
    } else {
        Err(ValidationError::new("slug"))
    }
}

// ─── Joins ───────────────────────────────────────────────────

/// Attach authors to topics. Topics whose author no longer exists are dropped.
async fn join_topic_authors(state: &AppState, topics: Vec<ForumTopic>) -> Result<Vec<TopicView>> {
    let authors = state
        .db
        .get_users_by_ids(topics.iter().map(|t| t.author_id.as_str()))
        .await?;

    Ok(topics
        .into_iter()
        .filter_map(|topic| {
            let author = authors.get(&topic.author_id).map(UserSummary::from)?;
            Some(TopicView::new(topic, Some(author)))
        })
        .collect())
}

/// Attach authors to replies, keeping order. Replies whose author no longer
/// exists are dropped.
async fn join_reply_authors(state: &AppState, replies: Vec<ForumReply>) -> Result<Vec<ReplyView>> {
    let authors = state
        .db
        .get_users_by_ids(replies.iter().map(|r| r.author_id.as_str()))
        .await?;

    Ok(replies
        .into_iter()
        .filter_map(|reply| {
            let author = authors.get(&reply.author_id).map(UserSummary::from)?;
            Some(ReplyView::new(reply, author))
        })
        .collect())
}

// ─── Categories ──────────────────────────────────────────────

async fn list_categories(State(state): State<Arc<AppState>>) -> Result<Json<Vec<CategoryView>>> {
    let categories = state.db.list_categories().await?;
    Ok(Json(categories.into_iter().map(CategoryView::from).collect()))
}

async fn list_category_topics(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TopicView>>> {
    let topics = state.db.list_topics_for_category(&id).await?;
    tracing::debug!(category_id = %id, count = topics.len(), "Listing category topics");
    Ok(Json(join_topic_authors(&state, topics).await?))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 100), custom(function = "validate_slug"))]
    pub slug: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(max = 50))]
    pub icon: Option<String>,
}

async fn create_category(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<CategoryView>)> {
    body.validate()?;
    require_role(&state, &auth, &[Role::Admin]).await?;

    if state.db.get_category_by_slug(&body.slug).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "Category slug '{}' already exists",
            body.slug
        )));
    }

    let category = ForumCategory {
        id: uuid::Uuid::new_v4().to_string(),
        name: body.name,
        description: body.description.unwrap_or_default(),
        slug: body.slug,
        icon: body
            .icon
            .filter(|icon| !icon.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY_ICON.to_string()),
        topic_count: 0,
    };
    state.db.upsert_category(&category).await?;

    tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");

    Ok((StatusCode::CREATED, Json(CategoryView::from(category))))
}

async fn delete_category(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    require_role(&state, &auth, &[Role::Admin]).await?;

    if state.db.get_category(&id).await?.is_none() {
        return Err(AppError::NotFound(format!("Category {} not found", id)));
    }
    state.db.delete_category_cascade(&id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ─── Topics ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RecentTopicsQuery {
    limit: Option<u32>,
}

/// Validated `limit` for the recent-topics listing.
fn recent_topics_limit(limit: Option<u32>) -> Result<u32> {
    match limit {
        None => Ok(DEFAULT_RECENT_TOPICS),
        Some(n) if (1..=MAX_RECENT_TOPICS).contains(&n) => Ok(n),
        Some(n) => Err(AppError::BadRequest(format!(
            "limit must be between 1 and {}, got {}",
            MAX_RECENT_TOPICS, n
        ))),
    }
}

async fn recent_topics(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecentTopicsQuery>,
) -> Result<Json<Vec<TopicView>>> {
    let limit = recent_topics_limit(params.limit)?;
    let topics = state.db.list_recent_topics(Some(limit)).await?;
    Ok(Json(join_topic_authors(&state, topics).await?))
}

async fn get_topic(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TopicView>> {
    let topic = state
        .db
        .get_topic(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Topic {} not found", id)))?;

    join_topic_authors(&state, vec![topic])
        .await?
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Topic {} not found", id)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTopicRequest {
    #[validate(custom(function = "validate_uuid"))]
    pub category_id: String,
    #[validate(length(min = 1, max = 500))]
    pub title: String,
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
    #[validate(length(max = 2048))]
    pub image_url: Option<String>,
}

async fn create_topic(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateTopicRequest>,
) -> Result<(StatusCode, Json<TopicView>)> {
    body.validate()?;

    let author = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let topic = ForumTopic {
        id: uuid::Uuid::new_v4().to_string(),
        category_id: body.category_id,
        title: body.title,
        content: body.content,
        image_url: body.image_url.unwrap_or_default(),
        author_id: author.id.clone(),
        created_at: now_utc(),
        is_pinned: false,
        reply_count: 0,
        last_reply_at: None,
    };
    let activity = Activity::new(
        &author.id,
        ActivityEvent::NewTopic {
            topic_id: topic.id.clone(),
            topic_title: topic.title.clone(),
        },
        topic.created_at,
    );

    state.db.create_topic_atomic(&topic, &activity).await?;

    Ok((
        StatusCode::CREATED,
        Json(TopicView::new(topic, Some(UserSummary::from(&author)))),
    ))
}

// ─── Replies ─────────────────────────────────────────────────

/// Flat replies, oldest first.
async fn list_replies(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ReplyView>>> {
    let replies = state.db.list_replies_for_topic(&id).await?;
    Ok(Json(join_reply_authors(&state, replies).await?))
}

/// Replies nested by parent into a forest.
async fn get_thread(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ReplyNode<ReplyView>>>> {
    let replies = state.db.list_replies_for_topic(&id).await?;
    let views = join_reply_authors(&state, replies).await?;
    let forest = build_reply_tree(views);

    tracing::debug!(topic_id = %id, roots = forest.len(), "Built reply thread");

    Ok(Json(forest))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReplyRequest {
    #[validate(custom(function = "validate_uuid"))]
    pub topic_id: String,
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
    #[validate(custom(function = "validate_uuid"))]
    pub parent_reply_id: Option<String>,
}

async fn create_reply(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateReplyRequest>,
) -> Result<(StatusCode, Json<ReplyView>)> {
    body.validate()?;

    let topic = state
        .db
        .get_topic(&body.topic_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Topic {} not found", body.topic_id)))?;

    if let Some(parent_id) = &body.parent_reply_id {
        let parent = state
            .db
            .get_reply(parent_id)
            .await?
            .ok_or_else(|| AppError::BadRequest(format!("Parent reply {} not found", parent_id)))?;
        if parent.topic_id != topic.id {
            return Err(AppError::BadRequest(
                "Parent reply belongs to a different topic".to_string(),
            ));
        }
    }

    let author = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let reply = ForumReply {
        id: uuid::Uuid::new_v4().to_string(),
        topic_id: topic.id.clone(),
        content: body.content,
        author_id: author.id.clone(),
        created_at: now_utc(),
        parent_reply_id: body.parent_reply_id,
    };
    let activity = Activity::new(
        &author.id,
        ActivityEvent::NewReply {
            reply_id: reply.id.clone(),
            topic_id: topic.id.clone(),
            topic_title: topic.title.clone(),
        },
        reply.created_at,
    );

    state.db.create_reply_atomic(&topic, &reply, &activity).await?;

    Ok((
        StatusCode::CREATED,
        Json(ReplyView::new(reply, UserSummary::from(&author))),
    ))
}
