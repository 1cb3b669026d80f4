// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Forum categories, topics and replies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::user::UserSummary;
use crate::services::reply_tree::ThreadedReply;
use crate::time_utils::format_utc_rfc3339;

/// Icon shown for categories created without one.
pub const DEFAULT_CATEGORY_ICON: &str = "MessageSquare";

/// Forum category stored in Firestore (document ID = `id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumCategory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub slug: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default)]
    pub topic_count: u32,
}

fn default_icon() -> String {
    DEFAULT_CATEGORY_ICON.to_string()
}

/// Forum topic stored in Firestore (document ID = `id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumTopic {
    pub id: String,
    pub category_id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub image_url: String,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub reply_count: u32,
    #[serde(default)]
    pub last_reply_at: Option<DateTime<Utc>>,
}

/// Forum reply stored in Firestore (document ID = `id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumReply {
    pub id: String,
    pub topic_id: String,
    pub content: String,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub parent_reply_id: Option<String>,
}

impl ThreadedReply for ForumReply {
    fn reply_id(&self) -> &str {
        &self.id
    }

    fn parent_reply_id(&self) -> Option<&str> {
        self.parent_reply_id.as_deref()
    }
}

// ─── API Views ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct CategoryView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub slug: String,
    pub icon: String,
    pub topic_count: u32,
}

impl From<ForumCategory> for CategoryView {
    fn from(c: ForumCategory) -> Self {
        Self {
            id: c.id,
            name: c.name,
            description: c.description,
            slug: c.slug,
            icon: c.icon,
            topic_count: c.topic_count,
        }
    }
}

/// Topic as returned by the API, optionally joined with its author.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct TopicView {
    pub id: String,
    pub category_id: String,
    pub title: String,
    pub content: String,
    pub image_url: String,
    pub author_id: String,
    pub created_at: String,
    pub is_pinned: bool,
    pub reply_count: u32,
    pub last_reply_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<UserSummary>,
}

impl TopicView {
    pub fn new(topic: ForumTopic, author: Option<UserSummary>) -> Self {
        Self {
            id: topic.id,
            category_id: topic.category_id,
            title: topic.title,
            content: topic.content,
            image_url: topic.image_url,
            author_id: topic.author_id,
            created_at: format_utc_rfc3339(topic.created_at),
            is_pinned: topic.is_pinned,
            reply_count: topic.reply_count,
            last_reply_at: topic.last_reply_at.map(format_utc_rfc3339),
            author,
        }
    }
}

/// Reply as returned by the API, joined with its author.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ReplyView {
    pub id: String,
    pub topic_id: String,
    pub content: String,
    pub author_id: String,
    pub created_at: String,
    pub parent_reply_id: Option<String>,
    pub author: UserSummary,
}

impl ReplyView {
    pub fn new(reply: ForumReply, author: UserSummary) -> Self {
        Self {
            id: reply.id,
            topic_id: reply.topic_id,
            content: reply.content,
            author_id: reply.author_id,
            created_at: format_utc_rfc3339(reply.created_at),
            parent_reply_id: reply.parent_reply_id,
            author,
        }
    }
}

impl ThreadedReply for ReplyView {
    fn reply_id(&self) -> &str {
        &self.id
    }

    fn parent_reply_id(&self) -> Option<&str> {
        self.parent_reply_id.as_deref()
    }
}
