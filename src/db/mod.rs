// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const FORUM_CATEGORIES: &str = "forum_categories";
    pub const FORUM_TOPICS: &str = "forum_topics";
    pub const FORUM_REPLIES: &str = "forum_replies";
    pub const ACTIVITIES: &str = "activities";
    pub const QUESTS: &str = "quests";
    /// Per-member quest progress (one document per quest/member pair)
    pub const QUEST_COMPLETIONS: &str = "quest_completions";
}
