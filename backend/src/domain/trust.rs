//! Trust scoring.
//!
//! The trust score is a derived 0–100 confidence value computed from the
//! verification counter and the record's recency. It is recomputed on every
//! read and never persisted, so it always reflects the latest counters and
//! the current time without a background job.

use chrono::{DateTime, Utc};

/// Verification volume contributes up to this much.
const BASE_CAP: i64 = 70;
/// Each verification is worth this many points.
const POINTS_PER_VERIFY: i64 = 12;
/// Freshness bonus for a record updated right now.
const FRESHNESS_CAP: i64 = 30;
/// Flat bonus applied when the stored timestamp cannot be parsed.
const UNPARSEABLE_TIMESTAMP_BONUS: i64 = 10;

/// Compute the trust score for a record at the given instant.
///
/// `base = min(verify_count * 12, 70)`; the freshness bonus decays from 30
/// to 0 over 30 days of inactivity. An unparseable `updated_at` yields a
/// fixed bonus of 10 instead of an age-based one. The result is capped at
/// 100.
pub fn trust_score_at(verify_count: i32, updated_at: &str, now: DateTime<Utc>) -> i32 {
    let base = (i64::from(verify_count.max(0)) * POINTS_PER_VERIFY).min(BASE_CAP);

    let freshness = match parse_stored_timestamp(updated_at) {
        Some(updated) => {
            let age_days = (now - updated).num_days().max(0);
            (FRESHNESS_CAP - age_days.min(FRESHNESS_CAP)).max(0)
        }
        None => UNPARSEABLE_TIMESTAMP_BONUS,
    };

    i32::try_from((base + freshness).min(100)).unwrap_or(100)
}

/// Parse a stored ISO-8601 timestamp, accepting both `Z` and numeric
/// offsets. Returns `None` for anything malformed.
pub fn parse_stored_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|parsed| parsed.with_timezone(&Utc))
        .ok()
}
