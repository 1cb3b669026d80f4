// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (`FIRESTORE_EMULATOR_HOST` set); otherwise they skip.
//!
//! Every test uses fresh uuid-based ids so runs do not interfere.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::Duration;
use contributor_hub::error::AppError;
use contributor_hub::models::forum::{ForumCategory, ForumReply, ForumTopic};
use contributor_hub::models::quest::{Difficulty, QuestStatus};
use contributor_hub::models::{Activity, ActivityEvent, Quest, QuestCompletion, User};
use contributor_hub::time_utils::now_utc;
use futures_util::future::join_all;
use tower::ServiceExt;

mod common;
use common::{body_json, create_test_app_with_db, create_test_jwt, test_db, unique_id};

fn test_user() -> User {
    let id = unique_id("user");
    User::new(
        id.clone(),
        format!("{id}@example.com"),
        "$argon2id$placeholder".to_string(),
        "tester".to_string(),
        "REF_TEST".to_string(),
        now_utc(),
    )
}

fn test_category() -> ForumCategory {
    let id = uuid::Uuid::new_v4().to_string();
    ForumCategory {
        slug: format!("cat-{id}"),
        id,
        name: "General".to_string(),
        description: String::new(),
        icon: "MessageSquare".to_string(),
        topic_count: 0,
    }
}

fn test_topic(category_id: &str, author_id: &str) -> ForumTopic {
    ForumTopic {
        id: uuid::Uuid::new_v4().to_string(),
        category_id: category_id.to_string(),
        title: "Welcome".to_string(),
        content: "Introduce yourself".to_string(),
        image_url: String::new(),
        author_id: author_id.to_string(),
        created_at: now_utc(),
        is_pinned: false,
        reply_count: 0,
        last_reply_at: None,
    }
}

fn topic_activity(topic: &ForumTopic) -> Activity {
    Activity::new(
        &topic.author_id,
        ActivityEvent::NewTopic {
            topic_id: topic.id.clone(),
            topic_title: topic.title.clone(),
        },
        topic.created_at,
    )
}

// ═══════════════════════════════════════════════════════════════════════════
// USER TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_user_round_trip_and_email_lookup() {
    require_emulator!();

    let db = test_db().await;
    let user = test_user();

    assert!(db.get_user(&user.id).await.unwrap().is_none());
    db.upsert_user(&user).await.unwrap();

    let fetched = db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(fetched.username, "tester");
    assert_eq!(fetched.tier, "explorer");
    assert_eq!(fetched.joined_at, user.joined_at);

    let by_email = db.get_user_by_email(&user.email).await.unwrap().unwrap();
    assert_eq!(by_email.id, user.id);

    let users = db
        .get_users_by_ids([user.id.as_str(), "missing-user"])
        .await
        .unwrap();
    assert_eq!(users.len(), 1);
    assert!(users.contains_key(&user.id));

    println!("✓ User stored and found by email: {}", user.id);
}

// ═══════════════════════════════════════════════════════════════════════════
// FORUM TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_topic_creation_bumps_category_count() {
    require_emulator!();

    let db = test_db().await;
    let user = test_user();
    db.upsert_user(&user).await.unwrap();
    let category = test_category();
    db.upsert_category(&category).await.unwrap();

    let topic = test_topic(&category.id, &user.id);
    let updated = db
        .create_topic_atomic(&topic, &topic_activity(&topic))
        .await
        .unwrap();
    assert_eq!(updated.topic_count, 1);

    let stored = db.get_category(&category.id).await.unwrap().unwrap();
    assert_eq!(stored.topic_count, 1);

    let by_slug = db.get_category_by_slug(&category.slug).await.unwrap().unwrap();
    assert_eq!(by_slug.id, category.id);

    let topics = db.list_topics_for_category(&category.id).await.unwrap();
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0].id, topic.id);
}

#[tokio::test]
async fn test_topic_in_missing_category_rejected() {
    require_emulator!();

    let db = test_db().await;
    let topic = test_topic(&uuid::Uuid::new_v4().to_string(), "nobody");

    let result = db.create_topic_atomic(&topic, &topic_activity(&topic)).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(db.get_topic(&topic.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_pinned_topics_listed_first() {
    require_emulator!();

    let db = test_db().await;
    let category = test_category();
    db.upsert_category(&category).await.unwrap();

    let mut old_pinned = test_topic(&category.id, "u1");
    old_pinned.is_pinned = true;
    old_pinned.created_at = now_utc() - Duration::days(10);
    let newer = test_topic(&category.id, "u1");

    for topic in [&old_pinned, &newer] {
        db.create_topic_atomic(topic, &topic_activity(topic))
            .await
            .unwrap();
    }

    let topics = db.list_topics_for_category(&category.id).await.unwrap();
    let ids: Vec<&str> = topics.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec![old_pinned.id.as_str(), newer.id.as_str()]);
}

#[tokio::test]
async fn test_reply_updates_topic_and_threads() {
    require_emulator!();

    let db = test_db().await;
    let category = test_category();
    db.upsert_category(&category).await.unwrap();
    let topic = test_topic(&category.id, "u1");
    db.create_topic_atomic(&topic, &topic_activity(&topic))
        .await
        .unwrap();

    let first = ForumReply {
        id: uuid::Uuid::new_v4().to_string(),
        topic_id: topic.id.clone(),
        content: "Hi!".to_string(),
        author_id: "u2".to_string(),
        created_at: now_utc(),
        parent_reply_id: None,
    };
    let answer = ForumReply {
        id: uuid::Uuid::new_v4().to_string(),
        parent_reply_id: Some(first.id.clone()),
        created_at: first.created_at + Duration::seconds(5),
        ..first.clone()
    };

    for reply in [&first, &answer] {
        let activity = Activity::new(
            &reply.author_id,
            ActivityEvent::NewReply {
                reply_id: reply.id.clone(),
                topic_id: topic.id.clone(),
                topic_title: topic.title.clone(),
            },
            reply.created_at,
        );
        db.create_reply_atomic(&topic, reply, &activity)
            .await
            .unwrap();
    }

    let stored = db.get_topic(&topic.id).await.unwrap().unwrap();
    assert_eq!(stored.reply_count, 2);
    assert_eq!(stored.last_reply_at, Some(answer.created_at));

    let replies = db.list_replies_for_topic(&topic.id).await.unwrap();
    let forest = contributor_hub::services::build_reply_tree(replies);
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].children.len(), 1);
    assert_eq!(forest[0].children[0].reply.id, answer.id);
}

#[tokio::test]
async fn test_category_delete_cascades() {
    require_emulator!();

    let db = test_db().await;
    let category = test_category();
    db.upsert_category(&category).await.unwrap();
    let topic = test_topic(&category.id, "u1");
    db.create_topic_atomic(&topic, &topic_activity(&topic))
        .await
        .unwrap();

    let deleted = db.delete_category_cascade(&category.id).await.unwrap();

    assert_eq!(deleted, 2);
    assert!(db.get_category(&category.id).await.unwrap().is_none());
    assert!(db.get_topic(&topic.id).await.unwrap().is_none());
}

// ═══════════════════════════════════════════════════════════════════════════
// QUEST TESTS
// ═══════════════════════════════════════════════════════════════════════════

fn test_quest(points: u32) -> Quest {
    Quest {
        id: uuid::Uuid::new_v4().to_string(),
        title: "Write a tutorial".to_string(),
        description: String::new(),
        category: "content".to_string(),
        points,
        target_count: 1,
        difficulty: Difficulty::Medium,
        is_active: true,
        created_at: now_utc(),
    }
}

fn completed_activity(user_id: &str, quest: &Quest) -> Activity {
    Activity::new(
        user_id,
        ActivityEvent::QuestCompleted {
            quest_id: quest.id.clone(),
            quest_title: quest.title.clone(),
            points: quest.points,
        },
        now_utc(),
    )
}

#[tokio::test]
async fn test_quest_completion_credits_points() {
    require_emulator!();

    let db = test_db().await;
    let user = test_user();
    db.upsert_user(&user).await.unwrap();

    let quest = test_quest(40);
    db.upsert_quest(&quest).await.unwrap();

    let started = QuestCompletion::start(&quest.id, &user.id, now_utc());
    db.upsert_completion(&started).await.unwrap();

    let activity = completed_activity(&user.id, &quest);
    let done = db
        .complete_quest_atomic(&user.id, &quest, &activity, now_utc())
        .await
        .unwrap();
    assert_eq!(done.status, QuestStatus::Completed);

    let stored = db.get_completion(&quest.id, &user.id).await.unwrap().unwrap();
    assert_eq!(stored.progress, 100);

    let member = db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(member.total_points, 40);
    assert_eq!(member.quests_completed, 1);

    let removed = db.delete_quest_cascade(&quest.id).await.unwrap();
    assert_eq!(removed, 2);
    assert!(db.get_completion(&quest.id, &user.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_quest_points_credited_once() {
    require_emulator!();

    let db = test_db().await;
    let user = test_user();
    db.upsert_user(&user).await.unwrap();
    let quest = test_quest(25);
    db.upsert_quest(&quest).await.unwrap();
    db.upsert_completion(&QuestCompletion::start(&quest.id, &user.id, now_utc()))
        .await
        .unwrap();

    let attempts = (0..4).map(|_| {
        let activity = completed_activity(&user.id, &quest);
        let db = db.clone();
        let quest = quest.clone();
        let user_id = user.id.clone();
        async move {
            db.complete_quest_atomic(&user_id, &quest, &activity, now_utc())
                .await
        }
    });
    let credited = join_all(attempts)
        .await
        .into_iter()
        .filter(Result::is_ok)
        .count();
    assert!(credited <= 1);

    // Whether or not a concurrent attempt committed, a later retry settles on
    // exactly one credit.
    let again = db
        .complete_quest_atomic(&user.id, &quest, &completed_activity(&user.id, &quest), now_utc())
        .await;
    if credited == 1 {
        assert!(matches!(again, Err(AppError::BadRequest(_))));
    } else {
        assert!(again.is_ok());
    }

    let member = db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(member.quests_completed, 1);
    assert_eq!(member.total_points, 25);
}

#[tokio::test]
async fn test_unstarted_quest_is_not_credited() {
    require_emulator!();

    let db = test_db().await;
    let user = test_user();
    db.upsert_user(&user).await.unwrap();
    let quest = test_quest(10);

    let result = db
        .complete_quest_atomic(&user.id, &quest, &completed_activity(&user.id, &quest), now_utc())
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(db.get_user(&user.id).await.unwrap().unwrap().total_points, 0);
}

#[tokio::test]
async fn test_complete_checks_start_before_quest() {
    require_emulator!();

    let (app, state) = create_test_app_with_db(test_db().await);
    let token = create_test_jwt(&unique_id("user"), &state.config.jwt_signing_key);
    let missing = uuid::Uuid::new_v4();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/quests/{missing}/complete"))
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert!(body["details"].as_str().unwrap().contains("not started"));
}

#[tokio::test]
async fn test_concurrent_replies_count_every_commit() {
    require_emulator!();

    let db = test_db().await;
    let category = test_category();
    db.upsert_category(&category).await.unwrap();
    let topic = test_topic(&category.id, "u1");
    db.create_topic_atomic(&topic, &topic_activity(&topic))
        .await
        .unwrap();

    let writes = (0..5).map(|i| {
        let db = db.clone();
        let topic = topic.clone();
        async move {
            let reply = ForumReply {
                id: uuid::Uuid::new_v4().to_string(),
                topic_id: topic.id.clone(),
                content: format!("reply {i}"),
                author_id: "u2".to_string(),
                created_at: now_utc(),
                parent_reply_id: None,
            };
            let activity = Activity::new(
                "u2",
                ActivityEvent::NewReply {
                    reply_id: reply.id.clone(),
                    topic_id: topic.id.clone(),
                    topic_title: topic.title.clone(),
                },
                reply.created_at,
            );
            db.create_reply_atomic(&topic, &reply, &activity).await
        }
    });
    let committed = join_all(writes)
        .await
        .into_iter()
        .filter(Result::is_ok)
        .count();

    let stored = db.get_topic(&topic.id).await.unwrap().unwrap();
    assert_eq!(stored.reply_count as usize, committed);
    assert_eq!(
        db.list_replies_for_topic(&topic.id).await.unwrap().len(),
        committed
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// WALLET TESTS
// ═══════════════════════════════════════════════════════════════════════════

async fn connect(app: axum::Router, address: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/connect")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(format!(r#"{{"walletAddress":"{address}"}}"#)))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

#[tokio::test]
async fn test_wallet_connect_creates_member_once() {
    require_emulator!();

    let db = test_db().await;
    let hex = uuid::Uuid::new_v4().simple().to_string();
    let address = format!("0x{}{}", hex, &hex[..8]).to_uppercase().replacen("0X", "0x", 1);
    let (app, _) = create_test_app_with_db(db.clone());

    let (status, first) = connect(app.clone(), &address).await;
    assert_eq!(status, StatusCode::OK);
    let lower = address.to_lowercase();
    assert_eq!(first["user"]["walletAddress"], lower.as_str());
    assert_eq!(first["user"]["username"], format!("user_{}", &lower[2..8]));
    assert_eq!(first["user"]["referralCode"], format!("REF_{}", &address[2..10]));

    let (status, second) = connect(app, &lower).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["user"]["id"], first["user"]["id"]);

    let stored = db.get_user_by_wallet(&lower).await.unwrap().unwrap();
    assert_eq!(stored.id, first["user"]["id"].as_str().unwrap());
    assert!(stored.password_hash.is_empty());
}

#[tokio::test]
async fn test_activity_round_trip_keeps_typed_metadata() {
    require_emulator!();

    let db = test_db().await;
    let activity = Activity::new(
        unique_id("user"),
        ActivityEvent::TierUp {
            new_tier: "ambassador".to_string(),
            topic_id: None,
            content_preview: None,
            image_url: None,
        },
        now_utc(),
    );
    db.create_activity(&activity).await.unwrap();

    let recent = db.list_recent_activities(200).await.unwrap();
    let found = recent
        .into_iter()
        .find(|a| a.id == activity.id)
        .expect("activity should be listed");
    assert_eq!(found, activity);
}
