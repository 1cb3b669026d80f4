// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Contributor tier ladder and progress toward the next tier.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// One rung of the ladder and the counts that qualify for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierRung {
    pub tier: &'static str,
    pub label: &'static str,
    pub required_referrals: u32,
    pub required_events: u32,
}

/// Ladder from lowest to highest.
pub const LADDER: [TierRung; 3] = [
    TierRung {
        tier: "contributor",
        label: "Contributor",
        required_referrals: 150,
        required_events: 1,
    },
    TierRung {
        tier: "ambassador",
        label: "Ambassador",
        required_referrals: 700,
        required_events: 6,
    },
    TierRung {
        tier: "fellow",
        label: "Fellow",
        required_referrals: 1000,
        required_events: 10,
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct TierProgress {
    pub current_tier: String,
    /// `None` at the top of the ladder.
    pub next_tier: Option<String>,
    pub referrals_count: u32,
    pub events_count: u32,
    pub required_referrals: Option<u32>,
    pub required_events: Option<u32>,
    pub referral_progress: f64,
    pub event_progress: f64,
}

fn percent(count: u32, required: u32) -> f64 {
    if required == 0 {
        return 100.0;
    }
    (f64::from(count) / f64::from(required) * 100.0).min(100.0)
}

/// Next rung above `tier`. Tiers not on the ladder sit below its first rung.
pub fn next_rung(tier: &str) -> Option<&'static TierRung> {
    match LADDER.iter().position(|rung| rung.tier == tier) {
        Some(i) => LADDER.get(i + 1),
        None => LADDER.first(),
    }
}

pub fn progress(tier: &str, referrals_count: u32, events_count: u32) -> TierProgress {
    let next = next_rung(tier);
    TierProgress {
        current_tier: tier.to_string(),
        next_tier: next.map(|r| r.tier.to_string()),
        referrals_count,
        events_count,
        required_referrals: next.map(|r| r.required_referrals),
        required_events: next.map(|r| r.required_events),
        referral_progress: next.map_or(100.0, |r| percent(referrals_count, r.required_referrals)),
        event_progress: next.map_or(100.0, |r| percent(events_count, r.required_events)),
    }
}
