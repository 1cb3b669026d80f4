// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity feed builder.
//!
//! Turns a flat, newest-first list of activities into time sections
//! ("Today", "This Week", "Earlier"). Inside each section, big and notable
//! activities stand alone while runs of the same ambient activity type are
//! collapsed into one group.
//!
//! Everything here is a pure transform: the reference instant and the
//! importance policy are passed in, nothing is read from the environment.

use chrono::{DateTime, Datelike, Duration, NaiveDateTime, TimeZone, Utc, Weekday};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Anything that can be placed in the feed.
pub trait FeedEntry {
    /// Activity type tag (e.g. `"new_topic"`).
    fn type_tag(&self) -> &str;
    /// When the activity happened.
    fn created_at(&self) -> DateTime<Utc>;
}

impl<T: FeedEntry + ?Sized> FeedEntry for &T {
    fn type_tag(&self) -> &str {
        (**self).type_tag()
    }

    fn created_at(&self) -> DateTime<Utc> {
        (**self).created_at()
    }
}

// ─── Time Buckets ────────────────────────────────────────────

/// Recency window an activity falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBucket {
    Today,
    ThisWeek,
    Earlier,
}

impl TimeBucket {
    /// Section order, most recent first.
    pub const ORDER: [TimeBucket; 3] = [TimeBucket::Today, TimeBucket::ThisWeek, TimeBucket::Earlier];

    pub fn label(self) -> &'static str {
        match self {
            TimeBucket::Today => "Today",
            TimeBucket::ThisWeek => "This Week",
            TimeBucket::Earlier => "Earlier",
        }
    }

    fn index(self) -> usize {
        match self {
            TimeBucket::Today => 0,
            TimeBucket::ThisWeek => 1,
            TimeBucket::Earlier => 2,
        }
    }
}

/// Classify `timestamp` relative to `now`.
///
/// Day and week boundaries are local midnights in `now`'s timezone. The
/// comparison happens on local wall-clock time so a midnight skipped by a
/// DST transition cannot make a boundary disappear.
pub fn time_bucket<Tz: TimeZone>(
    timestamp: DateTime<Utc>,
    now: &DateTime<Tz>,
    week_start: Weekday,
) -> TimeBucket {
    let local_now = now.naive_local();
    let local_ts = timestamp.with_timezone(&now.timezone()).naive_local();

    let start_of_today: NaiveDateTime = local_now.date().and_time(chrono::NaiveTime::MIN);
    let days_into_week = days_since(local_now.weekday(), week_start);
    let start_of_week = start_of_today - Duration::days(days_into_week);

    if local_ts >= start_of_today {
        TimeBucket::Today
    } else if local_ts >= start_of_week {
        TimeBucket::ThisWeek
    } else {
        TimeBucket::Earlier
    }
}

/// Number of days from `start` forward to `day` (0..=6).
fn days_since(day: Weekday, start: Weekday) -> i64 {
    let day = i64::from(day.num_days_from_sunday());
    let start = i64::from(start.num_days_from_sunday());
    (day - start).rem_euclid(7)
}

// ─── Importance ──────────────────────────────────────────────

/// How prominently an activity is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    /// Shown on its own with maximum prominence.
    Big,
    /// Always shown individually.
    Notable,
    /// Folded into a count with neighbours of the same type.
    Ambient,
}

impl fmt::Display for Importance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Importance::Big => "big",
            Importance::Notable => "notable",
            Importance::Ambient => "ambient",
        };
        f.write_str(name)
    }
}

impl FromStr for Importance {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "big" => Ok(Importance::Big),
            "notable" => Ok(Importance::Notable),
            "ambient" => Ok(Importance::Ambient),
            other => Err(PolicyError::UnknownImportance(other.to_string())),
        }
    }
}

const BIG_TYPES: &[&str] = &["tier_up"];
const NOTABLE_TYPES: &[&str] = &["quest_completed", "referral_milestone", "event_organized"];
const AMBIENT_TYPES: &[&str] = &["new_contributor", "new_topic", "new_reply", "profile_update"];

/// Mapping from activity type tag to importance.
///
/// Tags missing from the mapping classify as [`Importance::Notable`], so an
/// unrecognized activity is always shown on its own rather than hidden in a
/// group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportancePolicy {
    classes: HashMap<String, Importance>,
}

impl Default for ImportancePolicy {
    fn default() -> Self {
        let mut classes = HashMap::new();
        for (tags, importance) in [
            (BIG_TYPES, Importance::Big),
            (NOTABLE_TYPES, Importance::Notable),
            (AMBIENT_TYPES, Importance::Ambient),
        ] {
            for tag in tags {
                classes.insert((*tag).to_string(), importance);
            }
        }
        Self { classes }
    }
}

impl ImportancePolicy {
    /// A policy with no entries: every tag is notable.
    pub fn empty() -> Self {
        Self {
            classes: HashMap::new(),
        }
    }

    /// Set the importance of a type tag, replacing any previous entry.
    pub fn with(mut self, tag: impl Into<String>, importance: Importance) -> Self {
        self.classes.insert(tag.into(), importance);
        self
    }

    /// Apply overrides written as `tag=importance` pairs separated by commas,
    /// e.g. `"event_organized=big, profile_update=notable"`.
    pub fn with_overrides(mut self, spec: &str) -> Result<Self, PolicyError> {
        for pair in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (tag, importance) = pair
                .split_once('=')
                .ok_or_else(|| PolicyError::MalformedOverride(pair.to_string()))?;
            let tag = tag.trim();
            if tag.is_empty() {
                return Err(PolicyError::MalformedOverride(pair.to_string()));
            }
            self.classes.insert(tag.to_string(), importance.parse()?);
        }
        Ok(self)
    }

    pub fn classify(&self, type_tag: &str) -> Importance {
        self.classes
            .get(type_tag)
            .copied()
            .unwrap_or(Importance::Notable)
    }
}

/// Errors from parsing importance overrides.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Unknown importance class: {0}")]
    UnknownImportance(String),

    #[error("Malformed importance override (expected tag=class): {0}")]
    MalformedOverride(String),
}

// ─── Feed Items ──────────────────────────────────────────────

/// One renderable entry of a time section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedItem<T> {
    Big {
        activity: T,
    },
    Notable {
        activity: T,
    },
    /// A contiguous run of ambient activities sharing one type. Never empty.
    AmbientGroup {
        #[serde(rename = "type")]
        type_tag: String,
        activities: Vec<T>,
    },
}

impl<T> FeedItem<T> {
    /// Number of activities wrapped by this item.
    pub fn len(&self) -> usize {
        match self {
            FeedItem::Big { .. } | FeedItem::Notable { .. } => 1,
            FeedItem::AmbientGroup { activities, .. } => activities.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The wrapped activities in feed order.
    pub fn activities(&self) -> Vec<&T> {
        match self {
            FeedItem::Big { activity } | FeedItem::Notable { activity } => vec![activity],
            FeedItem::AmbientGroup { activities, .. } => activities.iter().collect(),
        }
    }
}

/// A labelled block of feed items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSection<T> {
    pub label: &'static str,
    pub bucket: TimeBucket,
    pub items: Vec<FeedItem<T>>,
}

// ─── Builder ─────────────────────────────────────────────────

/// Builds time sections from activities.
#[derive(Debug, Clone)]
pub struct FeedBuilder {
    policy: ImportancePolicy,
    week_start: Weekday,
}

impl Default for FeedBuilder {
    fn default() -> Self {
        Self::new(ImportancePolicy::default(), Weekday::Sun)
    }
}

impl FeedBuilder {
    pub fn new(policy: ImportancePolicy, week_start: Weekday) -> Self {
        Self { policy, week_start }
    }

    pub fn policy(&self) -> &ImportancePolicy {
        &self.policy
    }

    pub fn week_start(&self) -> Weekday {
        self.week_start
    }

    /// Partition `activities` into time buckets and group each bucket.
    ///
    /// Input order is preserved inside every bucket; nothing is re-sorted.
    /// Buckets with no activities produce no section.
    pub fn build<T, Tz>(&self, activities: Vec<T>, now: &DateTime<Tz>) -> Vec<TimeSection<T>>
    where
        T: FeedEntry,
        Tz: TimeZone,
    {
        let mut buckets: [Vec<T>; 3] = [Vec::new(), Vec::new(), Vec::new()];
        for activity in activities {
            let bucket = time_bucket(activity.created_at(), now, self.week_start);
            buckets[bucket.index()].push(activity);
        }

        TimeBucket::ORDER
            .into_iter()
            .zip(buckets)
            .filter(|(_, list)| !list.is_empty())
            .map(|(bucket, list)| TimeSection {
                label: bucket.label(),
                bucket,
                items: self.group(list),
            })
            .collect()
    }

    /// Single left-to-right scan turning one bucket into feed items.
    ///
    /// Ambient activities join the group in progress only when the group's
    /// type matches exactly; any other activity closes it.
    pub fn group<T: FeedEntry>(&self, activities: Vec<T>) -> Vec<FeedItem<T>> {
        let mut items: Vec<FeedItem<T>> = Vec::new();

        for activity in activities {
            match self.policy.classify(activity.type_tag()) {
                Importance::Big => items.push(FeedItem::Big { activity }),
                Importance::Notable => items.push(FeedItem::Notable { activity }),
                Importance::Ambient => match items.last_mut() {
                    Some(FeedItem::AmbientGroup {
                        type_tag,
                        activities,
                    }) if type_tag.as_str() == activity.type_tag() => activities.push(activity),
                    _ => items.push(FeedItem::AmbientGroup {
                        type_tag: activity.type_tag().to_string(),
                        activities: vec![activity],
                    }),
                },
            }
        }

        items
    }
}
