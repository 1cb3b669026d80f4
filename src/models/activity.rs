// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Community activity model for storage and API.
//!
//! Firestore keeps activities as `{type, metadata}` documents where the
//! metadata shape depends on the type. In memory an activity carries an
//! [`ActivityEvent`], one variant per known type with the fields that type
//! needs, next to the metadata map exactly as stored. The map is what the
//! API returns, so keys no variant names survive a read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::user::UserSummary;
use crate::services::feed::FeedEntry;

/// What happened, with its type-specific details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "metadata",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ActivityEvent {
    NewContributor {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tier: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        wallet_address: Option<String>,
    },
    TierUp {
        new_tier: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        topic_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_preview: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
    },
    QuestCompleted {
        quest_id: String,
        quest_title: String,
        points: u32,
    },
    NewTopic {
        topic_id: String,
        topic_title: String,
    },
    NewReply {
        reply_id: String,
        topic_id: String,
        topic_title: String,
    },
    ProfileUpdate {
        updated_fields: Vec<String>,
    },
    ReferralMilestone {
        count: u32,
    },
    EventOrganized {
        event_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        topic_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_preview: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
    },
    /// A stored document whose type is unknown or whose metadata does not
    /// fit its type. Kept verbatim so it is still displayed.
    #[serde(skip)]
    Unrecognized {
        type_tag: String,
        metadata: Map<String, Value>,
    },
}

impl ActivityEvent {
    /// Wire/storage type tag.
    pub fn type_tag(&self) -> &str {
        match self {
            ActivityEvent::NewContributor { .. } => "new_contributor",
            ActivityEvent::TierUp { .. } => "tier_up",
            ActivityEvent::QuestCompleted { .. } => "quest_completed",
            ActivityEvent::NewTopic { .. } => "new_topic",
            ActivityEvent::NewReply { .. } => "new_reply",
            ActivityEvent::ProfileUpdate { .. } => "profile_update",
            ActivityEvent::ReferralMilestone { .. } => "referral_milestone",
            ActivityEvent::EventOrganized { .. } => "event_organized",
            ActivityEvent::Unrecognized { type_tag, .. } => type_tag,
        }
    }

    /// Metadata map holding exactly this event's fields.
    pub fn metadata(&self) -> Map<String, Value> {
        if let ActivityEvent::Unrecognized { metadata, .. } = self {
            return metadata.clone();
        }
        match serde_json::to_value(self) {
            Ok(Value::Object(mut doc)) => match doc.remove("metadata") {
                Some(Value::Object(metadata)) => metadata,
                _ => Map::new(),
            },
            _ => Map::new(),
        }
    }

    /// Rebuild an event from its stored `type` and `metadata`. Keys the
    /// variant does not name are ignored here.
    pub fn from_parts(type_tag: &str, metadata: Map<String, Value>) -> Self {
        let doc = serde_json::json!({ "type": type_tag, "metadata": &metadata });
        match serde_json::from_value(doc) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(type_tag, error = %e, "Keeping activity as unrecognized");
                ActivityEvent::Unrecognized {
                    type_tag: type_tag.to_string(),
                    metadata,
                }
            }
        }
    }
}

/// Stored activity document in Firestore (document ID = `id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub user_id: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

/// An activity with typed details.
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub id: String,
    pub user_id: String,
    pub event: ActivityEvent,
    /// Stored metadata, verbatim
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    /// New activity with a fresh id.
    pub fn new(user_id: impl Into<String>, event: ActivityEvent, created_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            metadata: event.metadata(),
            event,
            created_at,
        }
    }

    pub fn to_record(&self) -> ActivityRecord {
        ActivityRecord {
            id: self.id.clone(),
            activity_type: self.event.type_tag().to_string(),
            user_id: self.user_id.clone(),
            metadata: self.metadata.clone(),
            created_at: self.created_at,
        }
    }
}

impl From<ActivityRecord> for Activity {
    fn from(record: ActivityRecord) -> Self {
        Self {
            event: ActivityEvent::from_parts(&record.activity_type, record.metadata.clone()),
            metadata: record.metadata,
            id: record.id,
            user_id: record.user_id,
            created_at: record.created_at,
        }
    }
}

impl FeedEntry for Activity {
    fn type_tag(&self) -> &str {
        self.event.type_tag()
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Activity joined with the member who performed it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityView {
    pub id: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub user_id: String,
    pub metadata: Map<String, Value>,
    #[serde(serialize_with = "crate::time_utils::serialize_rfc3339")]
    pub created_at: DateTime<Utc>,
    pub user: UserSummary,
}

impl ActivityView {
    pub fn new(activity: &Activity, user: UserSummary) -> Self {
        Self {
            id: activity.id.clone(),
            activity_type: activity.event.type_tag().to_string(),
            user_id: activity.user_id.clone(),
            metadata: activity.metadata.clone(),
            created_at: activity.created_at,
            user,
        }
    }
}

impl FeedEntry for ActivityView {
    fn type_tag(&self) -> &str {
        &self.activity_type
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
