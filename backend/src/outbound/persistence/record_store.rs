//! Diesel-backed [`RecordStore`] adapter.
//!
//! All SQLite work runs on the blocking thread pool. Each `create`/`vote`
//! call executes inside an immediate transaction so the existence check,
//! duplicate check, vote insert, and counter update apply as one atomic
//! unit; the UNIQUE `(record_id, client_id)` constraint backstops the
//! duplicate check against concurrent voters. Every operation starts with a
//! best-effort expiry sweep.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use diesel::define_sql_function;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use diesel::sql_types::Text;
use mockable::Clock;
use tracing::{error, warn};
use uuid::Uuid;

use crate::domain::ports::RecordStore;
use crate::domain::{Error, Record, RecordDraft, RecordFilter, VoteKind};

use super::models::{NewVoteRow, RecordRow};
use super::pool::DbPool;
use super::schema::{records, votes};
use super::sweeper;

define_sql_function! {
    /// SQLite `lower()` for case-insensitive name matching.
    fn lower(value: Text) -> Text;
}

/// Adapter-internal error: either an already-classified domain failure or a
/// raw Diesel error awaiting classification.
enum StoreError {
    Domain(Error),
    Diesel(diesel::result::Error),
}

impl From<diesel::result::Error> for StoreError {
    fn from(error: diesel::result::Error) -> Self {
        Self::Diesel(error)
    }
}

/// Classify a Diesel failure into the domain taxonomy.
///
/// Lock contention surfaces as a retryable busy error; everything else is
/// logged here and reduced to a generic message so no storage detail leaks
/// to the caller.
fn classify_diesel_error(operation: &'static str, error: diesel::result::Error) -> Error {
    if let diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) = &error {
        // Concurrent voter won the race on (record_id, client_id).
        return Error::conflict("You already voted");
    }

    let text = error.to_string().to_lowercase();
    error!(error = %error, operation, "database operation failed");
    if text.contains("locked") || text.contains("busy") {
        Error::store_busy("Database busy, please try again")
    } else if text.contains("readonly") || text.contains("read-only") {
        Error::internal("Database is read-only on server")
    } else {
        Error::internal(format!("Database {operation} failed"))
    }
}

fn resolve_store_error(operation: &'static str, error: StoreError) -> Error {
    match error {
        StoreError::Domain(domain) => domain,
        StoreError::Diesel(diesel) => classify_diesel_error(operation, diesel),
    }
}

/// SQLite-backed record store.
#[derive(Clone)]
pub struct DieselRecordStore {
    pool: DbPool,
    clock: Arc<dyn Clock>,
}

impl DieselRecordStore {
    /// Create a store over the given pool, timestamping with the given
    /// clock.
    pub fn new(pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// Check out a connection, sweep, and run `op` on the blocking pool.
    async fn with_conn<T, F>(&self, operation: &'static str, op: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection, DateTime<Utc>) -> Result<T, StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        let now = self.clock.utc();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|err| {
                // Pool detail stays in the logs; clients get the generic
                // retryable message.
                warn!(error = %err, operation, "pool checkout failed");
                Error::store_busy("Database busy, please try again")
            })?;
            sweeper::sweep_best_effort(&mut conn, now);
            op(&mut conn, now).map_err(|err| resolve_store_error(operation, err))
        })
        .await
        .map_err(|err| Error::internal(format!("blocking task failed: {err}")))?
    }
}

fn stamp(now: DateTime<Utc>) -> String {
    // Fixed sub-second precision keeps text ordering chronological.
    now.to_rfc3339_opts(SecondsFormat::Micros, false)
}

fn list_query(
    conn: &mut SqliteConnection,
    filter: RecordFilter,
) -> Result<Vec<Record>, StoreError> {
    let mut query = records::table
        .filter(records::status.eq("approved"))
        .into_boxed();

    if let Some(event_date) = filter.event_date {
        query = query.filter(records::event_date.eq(event_date));
    }
    if let Some(food_type) = filter.food_type {
        query = query.filter(records::food_type.eq(food_type.as_str()));
    }
    if let Some(name_query) = filter.name_query {
        let pattern = format!("%{}%", name_query.to_lowercase());
        query = query.filter(lower(records::name).like(pattern));
    }

    let rows: Vec<RecordRow> = query
        .order(records::updated_at.desc())
        .select(RecordRow::as_select())
        .load(conn)?;
    Ok(rows.into_iter().map(Record::from).collect())
}

fn insert_record(
    conn: &mut SqliteConnection,
    draft: RecordDraft,
    now: DateTime<Utc>,
) -> Result<Record, StoreError> {
    let stamp = stamp(now);
    let row = RecordRow {
        id: Uuid::new_v4().simple().to_string(),
        name: draft.name,
        lat: draft.lat,
        lng: draft.lng,
        food_type: draft.food_type.as_str().to_owned(),
        prayer_slot: Some(draft.prayer_slot.as_str().to_owned()),
        verify_count: 0,
        disagree_count: 0,
        created_at: stamp.clone(),
        updated_at: stamp,
        event_date: draft.event_date,
        start_time: draft.start_time,
        end_time: draft.end_time,
        proof_image: draft.proof_image,
        status: "approved".to_owned(),
    };

    conn.immediate_transaction(|conn| {
        diesel::insert_into(records::table).values(&row).execute(conn)
    })?;

    Ok(Record::from(row))
}

fn apply_vote(
    conn: &mut SqliteConnection,
    record_id: String,
    client_id: String,
    kind: VoteKind,
    now: DateTime<Utc>,
) -> Result<Record, StoreError> {
    conn.immediate_transaction(|conn| {
        let exists: Option<String> = records::table
            .filter(records::id.eq(&record_id))
            .filter(records::status.eq("approved"))
            .select(records::id)
            .first(conn)
            .optional()?;
        if exists.is_none() {
            return Err(StoreError::Domain(Error::not_found("Record not found")));
        }

        let duplicate: Option<String> = votes::table
            .filter(votes::record_id.eq(&record_id))
            .filter(votes::client_id.eq(&client_id))
            .select(votes::id)
            .first(conn)
            .optional()?;
        if duplicate.is_some() {
            return Err(StoreError::Domain(Error::conflict("You already voted")));
        }

        let stamp = stamp(now);
        diesel::insert_into(votes::table)
            .values(NewVoteRow {
                id: Uuid::new_v4().simple().to_string(),
                record_id: record_id.clone(),
                client_id,
                vote_type: kind.as_str().to_owned(),
                created_at: stamp.clone(),
            })
            .execute(conn)?;

        // Counter increments happen in SQL so concurrent votes from
        // different clients cannot lose an update.
        let target = records::table.filter(records::id.eq(&record_id));
        match kind {
            VoteKind::Agree => diesel::update(target)
                .set((
                    records::verify_count.eq(records::verify_count + 1),
                    records::updated_at.eq(&stamp),
                ))
                .execute(conn)?,
            VoteKind::Disagree => diesel::update(target)
                .set((
                    records::disagree_count.eq(records::disagree_count + 1),
                    records::updated_at.eq(&stamp),
                ))
                .execute(conn)?,
        };

        let row: RecordRow = records::table
            .filter(records::id.eq(&record_id))
            .select(RecordRow::as_select())
            .first(conn)?;
        Ok(Record::from(row))
    })
}

#[async_trait]
impl RecordStore for DieselRecordStore {
    async fn list_approved(&self, filter: RecordFilter) -> Result<Vec<Record>, Error> {
        self.with_conn("read", move |conn, _now| list_query(conn, filter))
            .await
    }

    async fn create(&self, draft: RecordDraft) -> Result<Record, Error> {
        self.with_conn("write", move |conn, now| insert_record(conn, draft, now))
            .await
    }

    async fn vote(
        &self,
        record_id: &str,
        client_id: &str,
        kind: VoteKind,
    ) -> Result<Record, Error> {
        let record_id = record_id.to_owned();
        let client_id = client_id.to_owned();
        self.with_conn("vote", move |conn, now| {
            apply_vote(conn, record_id, client_id, kind, now)
        })
        .await
    }
}
