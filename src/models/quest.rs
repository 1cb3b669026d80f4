// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Quests and per-member quest progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::time_utils::format_utc_rfc3339;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    #[default]
    InProgress,
    Completed,
}

/// Quest definition stored in Firestore (document ID = `id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quest {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub points: u32,
    #[serde(default = "default_target_count")]
    pub target_count: u32,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

fn default_target_count() -> u32 {
    1
}

fn default_active() -> bool {
    true
}

/// A member's progress on one quest.
///
/// The document ID is derived from the (quest, member) pair, so at most one
/// exists per pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestCompletion {
    pub id: String,
    pub quest_id: String,
    pub user_id: String,
    #[serde(default)]
    pub status: QuestStatus,
    #[serde(default)]
    pub progress: u8,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Document ID of the completion for `quest_id` and `user_id`.
pub fn completion_id(quest_id: &str, user_id: &str) -> String {
    format!("{quest_id}_{user_id}")
}

impl QuestCompletion {
    pub fn start(quest_id: &str, user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: completion_id(quest_id, user_id),
            quest_id: quest_id.to_string(),
            user_id: user_id.to_string(),
            status: QuestStatus::InProgress,
            progress: 0,
            started_at: now,
            completed_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == QuestStatus::Completed
    }

    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.status = QuestStatus::Completed;
        self.progress = 100;
        self.completed_at = Some(now);
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
pub struct QuestView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub points: u32,
    pub target_count: u32,
    pub difficulty: Difficulty,
    pub is_active: bool,
    pub created_at: String,
}

impl From<Quest> for QuestView {
    fn from(q: Quest) -> Self {
        Self {
            id: q.id,
            title: q.title,
            description: q.description,
            category: q.category,
            points: q.points,
            target_count: q.target_count,
            difficulty: q.difficulty,
            is_active: q.is_active,
            created_at: format_utc_rfc3339(q.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct CompletionView {
    pub id: String,
    pub quest_id: String,
    pub user_id: String,
    pub status: QuestStatus,
    pub progress: u8,
    pub started_at: String,
    pub completed_at: Option<String>,
    /// Present when listing the caller's quests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quest: Option<QuestView>,
}

impl CompletionView {
    pub fn new(completion: QuestCompletion, quest: Option<Quest>) -> Self {
        Self {
            id: completion.id,
            quest_id: completion.quest_id,
            user_id: completion.user_id,
            status: completion.status,
            progress: completion.progress,
            started_at: format_utc_rfc3339(completion.started_at),
            completed_at: completion.completed_at.map(format_utc_rfc3339),
            quest: quest.map(QuestView::from),
        }
    }
}
