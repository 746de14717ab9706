//! Expiry sweeper: purges records older than the retention window.
//!
//! Records are ephemeral. Before any read or write the store deletes every
//! record whose creation time is at or before `now - 24h`, removing its
//! votes and moderation requests first so no orphaned rows remain. The
//! sweep is opportunistic: failures are logged and swallowed so they never
//! block the operation the caller actually requested.

use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use tracing::{debug, warn};

use crate::domain::parse_stored_timestamp;

use super::schema::{moderation_requests, records, votes};

/// How long a record lives after creation.
pub const RETENTION_HOURS: i64 = 24;

/// Delete all expired records and their dependents.
///
/// The boundary is a strict `<=` on the parsed creation time: a record aged
/// exactly 24 hours is removed, one a minute younger is kept. Rows whose
/// `created_at` cannot be parsed are left alone.
pub fn sweep_expired(conn: &mut SqliteConnection, now: DateTime<Utc>) -> QueryResult<usize> {
    let threshold = now - Duration::hours(RETENTION_HOURS);

    let rows: Vec<(String, String)> = records::table
        .select((records::id, records::created_at))
        .load(conn)?;

    let expired: Vec<String> = rows
        .into_iter()
        .filter_map(|(id, created_at)| {
            parse_stored_timestamp(&created_at)
                .filter(|created| *created <= threshold)
                .map(|_| id)
        })
        .collect();

    if expired.is_empty() {
        return Ok(0);
    }

    diesel::delete(votes::table.filter(votes::record_id.eq_any(&expired))).execute(conn)?;
    diesel::delete(
        moderation_requests::table.filter(moderation_requests::record_id.eq_any(&expired)),
    )
    .execute(conn)?;
    diesel::delete(records::table.filter(records::id.eq_any(&expired))).execute(conn)?;

    debug!(count = expired.len(), "swept expired records");
    Ok(expired.len())
}

/// Run the sweep, logging and swallowing any failure.
pub fn sweep_best_effort(conn: &mut SqliteConnection, now: DateTime<Utc>) {
    if let Err(error) = sweep_expired(conn, now) {
        warn!(error = %error, "skipping expiry sweep after storage error");
    }
}
