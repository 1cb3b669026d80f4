// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (member profiles and counters)
//! - Forum categories, topics and replies
//! - Activities (community feed events)
//! - Quests and per-member quest completions
//!
//! Writes that bump a counter (topic count, reply count, quest points) run in
//! a transaction together with the document they count and the activity
//! recorded for them. The counter document is read through the transaction,
//! so a concurrent writer makes the commit fail instead of losing an
//! increment.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use firestore::{FirestoreConsistencySelector, FirestoreQueryDirection};
use futures_util::{stream, StreamExt};

use crate::db::collections;
use crate::error::AppError;
use crate::models::quest::completion_id;
use crate::models::stats::LEADERBOARD_SIZE;
use crate::models::{
    Activity, ActivityRecord, ForumCategory, ForumReply, ForumTopic, LeaderboardSort, Quest,
    QuestCompletion, User,
};

const MAX_CONCURRENT_DB_OPS: usize = 50;
// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Look up a member by (lowercased) login email.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(|q| q.field("email").eq(email))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().next())
    }

    /// Look up a member by (lowercased) wallet address.
    pub async fn get_user_by_wallet(&self, address: &str) -> Result<Option<User>, AppError> {
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(|q| q.field("wallet_address").eq(address))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().next())
    }

    /// Store a new user unless a document with its id already exists.
    ///
    /// Returns `false` when the id was taken.
    pub async fn create_user_if_absent(&self, user: &User) -> Result<bool, AppError> {
        let created: Result<User, firestore::errors::FirestoreError> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await;

        match created {
            Ok(_) => Ok(true),
            Err(firestore::errors::FirestoreError::DataConflictError(_)) => Ok(false),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    /// Create or update a user.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// All members, newest first.
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .order_by([("joined_at", FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Top members by the given counter.
    pub async fn get_leaderboard(&self, sort: LeaderboardSort) -> Result<Vec<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .order_by([(sort.field(), FirestoreQueryDirection::Descending)])
            .limit(LEADERBOARD_SIZE as u32)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fetch several users at once, keyed by id. Missing ids are absent from
    /// the map.
    pub async fn get_users_by_ids<'a, I>(&self, ids: I) -> Result<HashMap<String, User>, AppError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let unique: HashSet<String> = ids.into_iter().map(str::to_string).collect();

        let results = stream::iter(unique)
            .map(|id| async move { self.get_user(&id).await })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Option<User>, AppError>>>()
            .await;

        let mut users = HashMap::with_capacity(results.len());
        for result in results {
            if let Some(user) = result? {
                users.insert(user.id.clone(), user);
            }
        }
        Ok(users)
    }

    // ─── Activity Operations ─────────────────────────────────────

    pub async fn create_activity(&self, activity: &Activity) -> Result<(), AppError> {
        let record = activity.to_record();
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ACTIVITIES)
            .document_id(&record.id)
            .object(&record)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Most recent activities, newest first.
    pub async fn list_recent_activities(&self, limit: u32) -> Result<Vec<Activity>, AppError> {
        let records: Vec<ActivityRecord> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .order_by([("created_at", FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(records.into_iter().map(Activity::from).collect())
    }

    // ─── Forum Category Operations ───────────────────────────────

    pub async fn list_categories(&self) -> Result<Vec<ForumCategory>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::FORUM_CATEGORIES)
            .order_by([("name", FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn get_category(&self, category_id: &str) -> Result<Option<ForumCategory>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::FORUM_CATEGORIES)
            .obj()
            .one(category_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn get_category_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ForumCategory>, AppError> {
        let categories: Vec<ForumCategory> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::FORUM_CATEGORIES)
            .filter(|q| q.field("slug").eq(slug))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(categories.into_iter().next())
    }

    pub async fn upsert_category(&self, category: &ForumCategory) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::FORUM_CATEGORIES)
            .document_id(&category.id)
            .object(category)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a category with all of its topics and their replies.
    ///
    /// Returns the number of documents deleted.
    pub async fn delete_category_cascade(&self, category_id: &str) -> Result<usize, AppError> {
        let mut deleted_count = 0;

        let topics: Vec<ForumTopic> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::FORUM_TOPICS)
            .filter(|q| q.field("category_id").eq(category_id))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        for topic in &topics {
            let replies = self.list_replies_for_topic(&topic.id).await?;
            self.batch_delete(&replies, collections::FORUM_REPLIES, |r: &ForumReply| {
                r.id.clone()
            })
            .await?;
            deleted_count += replies.len();
        }
        tracing::debug!(category_id, replies = deleted_count, "Deleted category replies");

        self.batch_delete(&topics, collections::FORUM_TOPICS, |t: &ForumTopic| {
            t.id.clone()
        })
        .await?;
        deleted_count += topics.len();

        self.get_client()?
            .fluent()
            .delete()
            .from(collections::FORUM_CATEGORIES)
            .document_id(category_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        deleted_count += 1;

        tracing::info!(category_id, deleted_count, "Category deletion complete");

        Ok(deleted_count)
    }

    // ─── Forum Topic Operations ──────────────────────────────────

    pub async fn get_topic(&self, topic_id: &str) -> Result<Option<ForumTopic>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::FORUM_TOPICS)
            .obj()
            .one(topic_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Topics of one category, pinned first, then newest first.
    pub async fn list_topics_for_category(
        &self,
        category_id: &str,
    ) -> Result<Vec<ForumTopic>, AppError> {
        let mut topics: Vec<ForumTopic> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::FORUM_TOPICS)
            .filter(|q| q.field("category_id").eq(category_id))
            .order_by([("created_at", FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // Stable: keeps newest-first order within pinned and unpinned.
        topics.sort_by_key(|t| !t.is_pinned);
        Ok(topics)
    }

    pub async fn list_topics_by_author(&self, author_id: &str) -> Result<Vec<ForumTopic>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::FORUM_TOPICS)
            .filter(|q| q.field("author_id").eq(author_id))
            .order_by([("created_at", FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Newest topics across all categories; `None` returns every topic.
    pub async fn list_recent_topics(&self, limit: Option<u32>) -> Result<Vec<ForumTopic>, AppError> {
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::FORUM_TOPICS)
            .order_by([("created_at", FirestoreQueryDirection::Descending)]);

        let query = match limit {
            Some(limit) => query.limit(limit),
            None => query,
        };

        query
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Atomically store a new topic, bump its category's topic count and
    /// record the activity for it.
    ///
    /// Fails with `NotFound` if the category does not exist.
    pub async fn create_topic_atomic(
        &self,
        topic: &ForumTopic,
        activity: &Activity,
    ) -> Result<ForumCategory, AppError> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let mut category: ForumCategory = Self::transaction_reader(client, &transaction)
            .fluent()
            .select()
            .by_id_in(collections::FORUM_CATEGORIES)
            .obj()
            .one(&topic.category_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| {
                AppError::NotFound(format!("Category {} not found", topic.category_id))
            })?;
        category.topic_count = category.topic_count.saturating_add(1);

        client
            .fluent()
            .update()
            .in_col(collections::FORUM_TOPICS)
            .document_id(&topic.id)
            .object(topic)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add topic to transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::FORUM_CATEGORIES)
            .document_id(&category.id)
            .object(&category)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add category to transaction: {}", e))
            })?;

        self.add_activity_to_transaction(activity, &mut transaction)?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            topic_id = %topic.id,
            category_id = %category.id,
            topic_count = category.topic_count,
            "Topic created"
        );

        Ok(category)
    }

    // ─── Forum Reply Operations ──────────────────────────────────

    pub async fn get_reply(&self, reply_id: &str) -> Result<Option<ForumReply>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::FORUM_REPLIES)
            .obj()
            .one(reply_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Replies of one topic, oldest first.
    pub async fn list_replies_for_topic(&self, topic_id: &str) -> Result<Vec<ForumReply>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::FORUM_REPLIES)
            .filter(|q| q.field("topic_id").eq(topic_id))
            .order_by([("created_at", FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Atomically store a reply, bump the topic's reply count and
    /// `last_reply_at`, and record the activity for it.
    pub async fn create_reply_atomic(
        &self,
        topic: &ForumTopic,
        reply: &ForumReply,
        activity: &Activity,
    ) -> Result<ForumTopic, AppError> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let mut topic: ForumTopic = Self::transaction_reader(client, &transaction)
            .fluent()
            .select()
            .by_id_in(collections::FORUM_TOPICS)
            .obj()
            .one(&topic.id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound(format!("Topic {} not found", topic.id)))?;
        topic.reply_count = topic.reply_count.saturating_add(1);
        topic.last_reply_at = Some(reply.created_at);

        client
            .fluent()
            .update()
            .in_col(collections::FORUM_REPLIES)
            .document_id(&reply.id)
            .object(reply)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add reply to transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::FORUM_TOPICS)
            .document_id(&topic.id)
            .object(&topic)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add topic to transaction: {}", e)))?;

        self.add_activity_to_transaction(activity, &mut transaction)?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            reply_id = %reply.id,
            topic_id = %topic.id,
            reply_count = topic.reply_count,
            "Reply created"
        );

        Ok(topic)
    }

    // ─── Quest Operations ────────────────────────────────────────

    pub async fn get_quest(&self, quest_id: &str) -> Result<Option<Quest>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::QUESTS)
            .obj()
            .one(quest_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Active quests, newest first.
    pub async fn list_active_quests(&self) -> Result<Vec<Quest>, AppError> {
        let mut quests: Vec<Quest> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::QUESTS)
            .filter(|q| q.field("is_active").eq(true))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // Sorted here; equality filter plus ordering would need a composite index.
        quests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(quests)
    }

    pub async fn upsert_quest(&self, quest: &Quest) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::QUESTS)
            .document_id(&quest.id)
            .object(quest)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a quest and every member's progress on it.
    pub async fn delete_quest_cascade(&self, quest_id: &str) -> Result<usize, AppError> {
        let completions: Vec<QuestCompletion> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::QUEST_COMPLETIONS)
            .filter(|q| q.field("quest_id").eq(quest_id))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let count = completions.len();
        self.batch_delete(
            &completions,
            collections::QUEST_COMPLETIONS,
            |c: &QuestCompletion| c.id.clone(),
        )
        .await?;

        self.get_client()?
            .fluent()
            .delete()
            .from(collections::QUESTS)
            .document_id(quest_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(quest_id, completions = count, "Quest deleted");

        Ok(count + 1)
    }

    // ─── Quest Completion Operations ─────────────────────────────

    pub async fn get_completion(
        &self,
        quest_id: &str,
        user_id: &str,
    ) -> Result<Option<QuestCompletion>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::QUEST_COMPLETIONS)
            .obj()
            .one(&completion_id(quest_id, user_id))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn upsert_completion(&self, completion: &QuestCompletion) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::QUEST_COMPLETIONS)
            .document_id(&completion.id)
            .object(completion)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// A member's quest progress, most recently started first.
    pub async fn list_completions_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<QuestCompletion>, AppError> {
        let mut completions: Vec<QuestCompletion> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::QUEST_COMPLETIONS)
            .filter(|q| q.field("user_id").eq(user_id))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        completions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(completions)
    }

    /// Fetch quests by id, keyed by id. Missing ids are absent from the map.
    pub async fn get_quests_by_ids<'a, I>(&self, ids: I) -> Result<HashMap<String, Quest>, AppError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let unique: HashSet<String> = ids.into_iter().map(str::to_string).collect();

        let results = stream::iter(unique)
            .map(|id| async move { self.get_quest(&id).await })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Option<Quest>, AppError>>>()
            .await;

        let mut quests = HashMap::with_capacity(results.len());
        for result in results {
            if let Some(quest) = result? {
                quests.insert(quest.id.clone(), quest);
            }
        }
        Ok(quests)
    }

    /// Atomically mark a member's quest completed, credit its points to the
    /// member and record the activity.
    ///
    /// Fails with `NotFound` if the quest was never started and `BadRequest`
    /// if it is already completed. Returns the updated completion.
    pub async fn complete_quest_atomic(
        &self,
        user_id: &str,
        quest: &Quest,
        activity: &Activity,
        now: DateTime<Utc>,
    ) -> Result<QuestCompletion, AppError> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let reader = Self::transaction_reader(client, &transaction);
        let id = completion_id(&quest.id, user_id);
        let (completion, user) = tokio::try_join!(
            reader
                .fluent()
                .select()
                .by_id_in(collections::QUEST_COMPLETIONS)
                .obj::<QuestCompletion>()
                .one(&id),
            reader
                .fluent()
                .select()
                .by_id_in(collections::USERS)
                .obj::<User>()
                .one(user_id),
        )
        .map_err(|e| AppError::Database(e.to_string()))?;

        let checked = match (completion, user) {
            (None, _) => Err(AppError::NotFound(format!("Quest {} not started", quest.id))),
            (Some(c), _) if c.is_completed() => {
                Err(AppError::BadRequest("Quest already completed".to_string()))
            }
            (_, None) => Err(AppError::NotFound(format!("User {} not found", user_id))),
            (Some(c), Some(u)) => Ok((c, u)),
        };
        let (mut completion, mut user) = match checked {
            Ok(found) => found,
            Err(e) => {
                if let Err(rollback) = transaction.rollback().await {
                    tracing::warn!(error = %rollback, "Transaction rollback failed");
                }
                return Err(e);
            }
        };
        user.total_points = user.total_points.saturating_add(quest.points);
        user.quests_completed = user.quests_completed.saturating_add(1);
        completion.complete(now);

        client
            .fluent()
            .update()
            .in_col(collections::QUEST_COMPLETIONS)
            .document_id(&completion.id)
            .object(&completion)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add completion to transaction: {}", e))
            })?;

        client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(&user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add user to transaction: {}", e)))?;

        self.add_activity_to_transaction(activity, &mut transaction)?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            user_id = %user.id,
            quest_id = %quest.id,
            points = quest.points,
            total_points = user.total_points,
            "Quest completed"
        );

        Ok(completion)
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Client whose reads take part in `transaction`.
    fn transaction_reader(
        client: &firestore::FirestoreDb,
        transaction: &firestore::FirestoreTransaction<'_>,
    ) -> firestore::FirestoreDb {
        client.clone_with_consistency_selector(FirestoreConsistencySelector::Transaction(
            transaction.transaction_id().clone(),
        ))
    }

    fn add_activity_to_transaction(
        &self,
        activity: &Activity,
        transaction: &mut firestore::FirestoreTransaction<'_>,
    ) -> Result<(), AppError> {
        let record = activity.to_record();
        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::ACTIVITIES)
            .document_id(&record.id)
            .object(&record)
            .add_to_transaction(transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add activity to transaction: {}", e))
            })?;
        Ok(())
    }

    /// Helper to batch delete documents using transactions.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        let client = self.get_client()?;

        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for item in chunk {
                let doc_id = id_extractor(item);
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }
}
