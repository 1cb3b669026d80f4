// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity feed grouping tests over real activity models.

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc, Weekday};
use contributor_hub::models::{Activity, ActivityEvent, ActivityRecord, ActivityView, UserSummary};
use contributor_hub::services::feed::FeedEntry;
use contributor_hub::services::{FeedBuilder, FeedItem, Importance, ImportancePolicy, TimeBucket};

/// Saturday 2024-06-15 12:00 UTC; the Sunday week began on the 9th.
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
}

fn event(tag: &str, n: usize) -> ActivityEvent {
    match tag {
        "tier_up" => ActivityEvent::TierUp {
            new_tier: "ambassador".to_string(),
            topic_id: None,
            content_preview: None,
            image_url: None,
        },
        "quest_completed" => ActivityEvent::QuestCompleted {
            quest_id: format!("q{n}"),
            quest_title: "Host a meetup".to_string(),
            points: 50,
        },
        "new_topic" => ActivityEvent::NewTopic {
            topic_id: format!("t{n}"),
            topic_title: "Hello".to_string(),
        },
        "new_reply" => ActivityEvent::NewReply {
            reply_id: format!("r{n}"),
            topic_id: "t0".to_string(),
            topic_title: "Hello".to_string(),
        },
        "new_contributor" => ActivityEvent::NewContributor {
            username: Some(format!("member{n}")),
            tier: None,
            wallet_address: None,
        },
        other => ActivityEvent::from_parts(other, serde_json::Map::new()),
    }
}

fn activity(tag: &str, n: usize, age: Duration) -> Activity {
    Activity::new(format!("u{n}"), event(tag, n), now() - age)
}

/// Newest-first activities mixing types and buckets, from a fixed seed.
fn generated(seed: u64, len: usize) -> Vec<Activity> {
    // Ambient tags repeat so runs form
    const TAGS: [&str; 9] = [
        "tier_up",
        "quest_completed",
        "new_topic",
        "new_topic",
        "new_reply",
        "new_reply",
        "new_contributor",
        "new_topic",
        "mystery_event",
    ];
    let mut state = seed;
    let mut age = Duration::minutes(1);
    (0..len)
        .map(|n| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            let tag = TAGS[((state >> 33) % 9) as usize];
            age = age + Duration::hours(((state >> 20) % 20) as i64);
            activity(tag, n, age)
        })
        .collect()
}

fn flatten<T: Clone>(items: &[FeedItem<T>]) -> Vec<T> {
    items
        .iter()
        .flat_map(|item| item.activities().into_iter().cloned())
        .collect()
}

#[test]
fn test_sections_partition_input_exactly_once() {
    let builder = FeedBuilder::default();
    for seed in 0..50 {
        let input = generated(seed, 40);
        let sections = builder.build(input.clone(), &now());

        let mut ids: Vec<String> = sections
            .iter()
            .flat_map(|s| flatten(&s.items))
            .map(|a| a.id)
            .collect();
        let mut expected: Vec<String> = input.iter().map(|a| a.id.clone()).collect();
        ids.sort();
        expected.sort();
        assert_eq!(ids, expected, "seed {seed}");
    }
}

#[test]
fn test_flattened_sections_preserve_bucket_order() {
    let builder = FeedBuilder::default();
    for seed in 0..50 {
        let input = generated(seed, 40);
        let sections = builder.build(input.clone(), &now());

        for section in &sections {
            let expected: Vec<Activity> = input
                .iter()
                .filter(|a| {
                    contributor_hub::services::feed::time_bucket(a.created_at, &now(), Weekday::Sun)
                        == section.bucket
                })
                .cloned()
                .collect();
            assert_eq!(flatten(&section.items), expected, "seed {seed}");
        }
    }
}

#[test]
fn test_ambient_groups_are_homogeneous_and_never_hold_big() {
    let builder = FeedBuilder::default();
    for seed in 0..50 {
        for section in builder.build(generated(seed, 40), &now()) {
            for item in &section.items {
                if let FeedItem::AmbientGroup {
                    type_tag,
                    activities,
                } = item
                {
                    assert!(!activities.is_empty());
                    assert!(activities.iter().all(|a| a.type_tag() == type_tag.as_str()));
                    assert!(activities.iter().all(|a| a.type_tag() != "tier_up"));
                }
            }
        }
    }
}

#[test]
fn test_adjacent_groups_never_share_a_type() {
    let builder = FeedBuilder::default();
    for seed in 0..50 {
        for section in builder.build(generated(seed, 40), &now()) {
            for pair in section.items.windows(2) {
                if let (
                    FeedItem::AmbientGroup { type_tag: a, .. },
                    FeedItem::AmbientGroup { type_tag: b, .. },
                ) = (&pair[0], &pair[1])
                {
                    assert_ne!(a, b, "contiguous run split, seed {seed}");
                }
            }
        }
    }
}

#[test]
fn test_three_buckets_one_item_each() {
    let input = vec![
        activity("tier_up", 1, Duration::minutes(2)),
        activity("quest_completed", 2, Duration::days(3)),
        activity("new_topic", 3, Duration::days(40)),
    ];

    let sections = FeedBuilder::default().build(input, &now());

    let labels: Vec<&str> = sections.iter().map(|s| s.label).collect();
    assert_eq!(labels, vec!["Today", "This Week", "Earlier"]);
    assert!(sections.iter().all(|s| s.items.len() == 1));
    assert!(matches!(sections[0].items[0], FeedItem::Big { .. }));
    assert!(matches!(sections[1].items[0], FeedItem::Notable { .. }));
    assert!(matches!(sections[2].items[0], FeedItem::AmbientGroup { .. }));
}

#[test]
fn test_non_contiguous_runs_form_separate_groups() {
    let input = vec![
        activity("new_topic", 1, Duration::minutes(1)),
        activity("new_topic", 2, Duration::minutes(2)),
        activity("new_reply", 3, Duration::minutes(3)),
        activity("new_topic", 4, Duration::minutes(4)),
    ];

    let sections = FeedBuilder::default().build(input, &now());
    assert_eq!(sections.len(), 1);

    let shape: Vec<(&str, usize)> = sections[0]
        .items
        .iter()
        .map(|item| match item {
            FeedItem::AmbientGroup { type_tag, .. } => (type_tag.as_str(), item.len()),
            _ => ("other", item.len()),
        })
        .collect();
    assert_eq!(
        shape,
        vec![("new_topic", 2), ("new_reply", 1), ("new_topic", 1)]
    );
}

#[test]
fn test_unknown_type_shown_as_notable() {
    let input = vec![activity("mystery_event", 1, Duration::minutes(5))];

    let sections = FeedBuilder::default().build(input, &now());

    assert!(matches!(
        &sections[0].items[0],
        FeedItem::Notable { activity } if activity.event.type_tag() == "mystery_event"
    ));
}

#[test]
fn test_feed_returns_stored_metadata_unchanged() {
    let stored = serde_json::json!({
        "username": "admin",
        "eventName": "Community Call",
        "topicId": "t42",
        "contentPreview": "Monthly sync for all contributors",
        "imageUrl": "https://cdn.example.org/call.png"
    });
    let record = ActivityRecord {
        id: "a1".to_string(),
        activity_type: "event_organized".to_string(),
        user_id: "u1".to_string(),
        metadata: stored.as_object().cloned().unwrap(),
        created_at: now() - Duration::minutes(10),
    };
    let author = UserSummary {
        id: "u1".to_string(),
        username: "admin".to_string(),
        tier: "explorer".to_string(),
        avatar_url: String::new(),
    };
    let view = ActivityView::new(&Activity::from(record), author);

    let sections = FeedBuilder::default().build(vec![view], &now());
    let json = serde_json::to_value(&sections).unwrap();

    assert_eq!(json[0]["items"][0]["kind"], "notable");
    assert_eq!(json[0]["items"][0]["activity"]["metadata"], stored);
}

#[test]
fn test_policy_override_promotes_type() {
    let policy = ImportancePolicy::default().with("new_contributor", Importance::Big);
    let builder = FeedBuilder::new(policy, Weekday::Sun);
    let input = vec![
        activity("new_contributor", 1, Duration::minutes(1)),
        activity("new_contributor", 2, Duration::minutes(2)),
    ];

    let sections = builder.build(input, &now());

    assert_eq!(sections[0].items.len(), 2);
    assert!(sections[0]
        .items
        .iter()
        .all(|item| matches!(item, FeedItem::Big { .. })));
}

#[test]
fn test_viewer_timezone_moves_day_boundary() {
    // 00:30 UTC is today in UTC but yesterday evening at UTC-5.
    let input = vec![activity("tier_up", 1, Duration::hours(11) + Duration::minutes(30))];
    let builder = FeedBuilder::default();

    let utc = builder.build(input.clone(), &now());
    assert_eq!(utc[0].bucket, TimeBucket::Today);

    let viewer = FixedOffset::west_opt(5 * 3600).unwrap();
    let local = builder.build(input, &now().with_timezone(&viewer));
    assert_eq!(local[0].bucket, TimeBucket::ThisWeek);
}

#[test]
fn test_monday_week_start() {
    // Sunday the 9th is this week with a Sunday start but not with Monday.
    let sunday = Utc.with_ymd_and_hms(2024, 6, 9, 10, 0, 0).unwrap();
    let input = vec![Activity::new("u1", event("tier_up", 1), sunday)];

    let sunday_start = FeedBuilder::new(ImportancePolicy::default(), Weekday::Sun);
    let monday_start = FeedBuilder::new(ImportancePolicy::default(), Weekday::Mon);

    assert_eq!(
        sunday_start.build(input.clone(), &now())[0].bucket,
        TimeBucket::ThisWeek
    );
    assert_eq!(
        monday_start.build(input, &now())[0].bucket,
        TimeBucket::Earlier
    );
}

#[test]
fn test_build_is_idempotent() {
    let builder = FeedBuilder::default();
    let input = generated(7, 60);

    assert_eq!(
        builder.build(input.clone(), &now()),
        builder.build(input, &now())
    );
}

#[test]
fn test_empty_input_yields_no_sections() {
    let sections = FeedBuilder::default().build(Vec::<Activity>::new(), &now());
    assert!(sections.is_empty());
}
