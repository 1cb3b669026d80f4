// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Quest catalogue, admin management and member progress.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::{require_role, AuthUser};
use crate::models::quest::{CompletionView, Difficulty, QuestView};
use crate::models::{Activity, ActivityEvent, Quest, QuestCompletion, Role};
use crate::time_utils::now_utc;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/quests", get(list_quests))
}

pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/quests", post(create_quest))
        .route("/api/quests/my", get(my_quests))
        .route("/api/quests/{id}", patch(update_quest).delete(delete_quest))
        .route("/api/quests/{id}/start", post(start_quest))
        .route("/api/quests/{id}/complete", post(complete_quest))
}

async fn list_quests(State(state): State<Arc<AppState>>) -> Result<Json<Vec<QuestView>>> {
    let quests = state.db.list_active_quests().await?;
    Ok(Json(quests.into_iter().map(QuestView::from).collect()))
}

async fn load_quest(state: &AppState, id: &str) -> Result<Quest> {
    state
        .db
        .get_quest(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Quest {} not found", id)))
}

// ─── Admin ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    #[validate(range(max = 100_000))]
    pub points: u32,
    #[validate(range(min = 1, max = 10_000))]
    pub target_count: Option<u32>,
    pub difficulty: Option<Difficulty>,
}

async fn create_quest(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateQuestRequest>,
) -> Result<(StatusCode, Json<QuestView>)> {
    body.validate()?;
    require_role(&state, &auth, &[Role::Admin]).await?;

    let quest = Quest {
        id: uuid::Uuid::new_v4().to_string(),
        title: body.title,
        description: body.description.unwrap_or_default(),
        category: body.category,
        points: body.points,
        target_count: body.target_count.unwrap_or(1),
        difficulty: body.difficulty.unwrap_or_default(),
        is_active: true,
        created_at: now_utc(),
    };
    state.db.upsert_quest(&quest).await?;

    tracing::info!(quest_id = %quest.id, points = quest.points, "Quest created");

    Ok((StatusCode::CREATED, Json(QuestView::from(quest))))
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuestRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    #[validate(range(max = 100_000))]
    pub points: Option<u32>,
    #[validate(range(min = 1, max = 10_000))]
    pub target_count: Option<u32>,
    pub difficulty: Option<Difficulty>,
    pub is_active: Option<bool>,
}

impl UpdateQuestRequest {
    /// Apply present fields; returns whether anything changed.
    fn apply(self, quest: &mut Quest) -> bool {
        let mut changed = false;
        if let Some(title) = self.title {
            quest.title = title;
            changed = true;
        }
        if let Some(description) = self.description {
            quest.description = description;
            changed = true;
        }
        if let Some(category) = self.category {
            quest.category = category;
            changed = true;
        }
        if let Some(points) = self.points {
            quest.points = points;
            changed = true;
        }
        if let Some(target_count) = self.target_count {
            quest.target_count = target_count;
            changed = true;
        }
        if let Some(difficulty) = self.difficulty {
            quest.difficulty = difficulty;
            changed = true;
        }
        if let Some(is_active) = self.is_active {
            quest.is_active = is_active;
            changed = true;
        }
        changed
    }
}

async fn update_quest(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<UpdateQuestRequest>,
) -> Result<Json<QuestView>> {
    body.validate()?;
    require_role(&state, &auth, &[Role::Admin]).await?;

    let mut quest = load_quest(&state, &id).await?;
    if !body.apply(&mut quest) {
        return Err(AppError::BadRequest("No quest fields to update".to_string()));
    }
    state.db.upsert_quest(&quest).await?;

    tracing::info!(quest_id = %id, "Quest updated");

    Ok(Json(QuestView::from(quest)))
}

async fn delete_quest(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    require_role(&state, &auth, &[Role::Admin]).await?;

    load_quest(&state, &id).await?;
    state.db.delete_quest_cascade(&id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ─── Member Progress ─────────────────────────────────────────

async fn start_quest(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<CompletionView>)> {
    let quest = load_quest(&state, &id).await?;

    if state.db.get_completion(&id, &auth.user_id).await?.is_some() {
        tracing::warn!(quest_id = %id, user_id = %auth.user_id, "Quest already started");
        return Err(AppError::BadRequest("Quest already started".to_string()));
    }

    let completion = QuestCompletion::start(&id, &auth.user_id, now_utc());
    state.db.upsert_completion(&completion).await?;

    tracing::info!(quest_id = %id, user_id = %auth.user_id, "Quest started");

    Ok((
        StatusCode::CREATED,
        Json(CompletionView::new(completion, Some(quest))),
    ))
}

async fn complete_quest(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<CompletionView>> {
    let completion = state
        .db
        .get_completion(&id, &auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Quest {} not started", id)))?;
    if completion.is_completed() {
        return Err(AppError::BadRequest("Quest already completed".to_string()));
    }
    let quest = load_quest(&state, &id).await?;

    let now = now_utc();
    let activity = Activity::new(
        &auth.user_id,
        ActivityEvent::QuestCompleted {
            quest_id: quest.id.clone(),
            quest_title: quest.title.clone(),
            points: quest.points,
        },
        now,
    );
    let completion = state
        .db
        .complete_quest_atomic(&auth.user_id, &quest, &activity, now)
        .await?;

    Ok(Json(CompletionView::new(completion, Some(quest))))
}

/// The caller's quests, most recently started first.
async fn my_quests(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<CompletionView>>> {
    let completions = state.db.list_completions_for_user(&auth.user_id).await?;
    let mut quests = state
        .db
        .get_quests_by_ids(completions.iter().map(|c| c.quest_id.as_str()))
        .await?;

    let views = completions
        .into_iter()
        .map(|completion| {
            let quest = quests.remove(&completion.quest_id);
            CompletionView::new(completion, quest)
        })
        .collect();
    Ok(Json(views))
}
