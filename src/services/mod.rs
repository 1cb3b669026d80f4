// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod feed;
pub mod password;
pub mod reply_tree;
pub mod tiers;

pub use feed::{FeedBuilder, FeedItem, Importance, ImportancePolicy, TimeBucket, TimeSection};
pub use reply_tree::{build_reply_tree, ReplyNode};
