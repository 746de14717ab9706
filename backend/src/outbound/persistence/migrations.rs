//! Schema manager: startup migrations and backfills.
//!
//! On process start the persistent store is brought to the current schema
//! shape by a versioned list of idempotent steps, applied sequentially
//! inside a single transaction. Each step introspects the current shape
//! before acting, so repeated restarts are no-ops. If any step fails the
//! transaction rolls back and the pre-existing tables survive untouched.

use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{Nullable, Text};
use tracing::{debug, info};

/// Failure while migrating the schema.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// A migration statement failed; the transaction was rolled back.
    #[error("schema migration failed: {0}")]
    Query(#[from] diesel::result::Error),
}

/// The food-type CHECK fragment that marks the current schema generation.
/// An existing records table without it triggers a rebuild migration.
const FOOD_TYPE_CHECK: &str = "food_type in ('biryani', 'muri', 'jilapi', 'none')";

/// Column list of the current records table, in DDL order, paired with the
/// SQL literal used when a legacy table lacks the column during a rebuild.
const RECORD_COLUMNS: [(&str, &str); 15] = [
    ("id", "''"),
    ("name", "''"),
    ("lat", "0"),
    ("lng", "0"),
    ("food_type", "'none'"),
    ("prayer_slot", "NULL"),
    ("verify_count", "0"),
    ("disagree_count", "0"),
    ("created_at", "''"),
    ("updated_at", "''"),
    ("event_date", "''"),
    ("start_time", "NULL"),
    ("end_time", "NULL"),
    ("proof_image", "NULL"),
    ("status", "'approved'"),
];

fn records_ddl(table_name: &str) -> String {
    format!(
        "CREATE TABLE {table_name} (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            lat REAL NOT NULL,
            lng REAL NOT NULL,
            food_type TEXT NOT NULL CHECK(food_type IN ('biryani', 'muri', 'jilapi', 'none')),
            prayer_slot TEXT,
            verify_count INTEGER NOT NULL DEFAULT 0,
            disagree_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            event_date TEXT NOT NULL,
            start_time TEXT,
            end_time TEXT,
            proof_image TEXT,
            status TEXT NOT NULL DEFAULT 'pending'
        )"
    )
}

#[derive(QueryableByName)]
struct MasterRow {
    #[diesel(sql_type = Nullable<Text>)]
    sql: Option<String>,
}

#[derive(QueryableByName)]
struct ColumnRow {
    #[diesel(sql_type = Text)]
    name: String,
}

/// Return the stored `CREATE TABLE` statement for a table, if it exists.
fn table_ddl(conn: &mut SqliteConnection, table: &str) -> QueryResult<Option<String>> {
    let rows: Vec<MasterRow> = sql_query(format!(
        "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = '{table}'"
    ))
    .load(conn)?;
    Ok(rows.into_iter().next().and_then(|row| row.sql))
}

/// Return the column names of a table.
fn table_columns(conn: &mut SqliteConnection, table: &str) -> QueryResult<Vec<String>> {
    let rows: Vec<ColumnRow> =
        sql_query(format!("SELECT name FROM pragma_table_info('{table}')")).load(conn)?;
    Ok(rows.into_iter().map(|row| row.name).collect())
}

fn create_tables(conn: &mut SqliteConnection) -> QueryResult<()> {
    if table_ddl(conn, "records")?.is_none() {
        sql_query(records_ddl("records")).execute(conn)?;
    }

    sql_query(
        "CREATE TABLE IF NOT EXISTS votes (
            id TEXT PRIMARY KEY,
            record_id TEXT NOT NULL,
            client_id TEXT NOT NULL,
            vote_type TEXT NOT NULL DEFAULT 'agree' CHECK(vote_type IN ('agree', 'disagree')),
            created_at TEXT NOT NULL,
            UNIQUE(record_id, client_id)
        )",
    )
    .execute(conn)?;

    sql_query(
        "CREATE TABLE IF NOT EXISTS moderation_requests (
            id TEXT PRIMARY KEY,
            record_id TEXT NOT NULL,
            request_type TEXT NOT NULL CHECK(request_type IN ('edit', 'delete')),
            message TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL
        )",
    )
    .execute(conn)?;

    Ok(())
}

/// Rebuild the records table when it predates the food-type CHECK.
///
/// SQLite cannot add a CHECK constraint in place, so the table is rebuilt:
/// create a shadow table with the current DDL, copy every row across
/// (columns missing from the legacy shape take their documented defaults),
/// drop the old table, and rename the shadow into place. Runs inside the
/// migration transaction, so a failure leaves the original table intact.
fn rebuild_records_if_legacy(conn: &mut SqliteConnection) -> QueryResult<()> {
    let Some(ddl) = table_ddl(conn, "records")? else {
        return Ok(());
    };
    if ddl.to_lowercase().contains(FOOD_TYPE_CHECK) {
        return Ok(());
    }

    info!("records table predates the food-type constraint; rebuilding");
    let existing = table_columns(conn, "records")?;

    let target_columns: Vec<&str> = RECORD_COLUMNS.iter().map(|(name, _)| *name).collect();
    let source_exprs: Vec<&str> = RECORD_COLUMNS
        .iter()
        .map(|(name, default)| {
            if existing.iter().any(|column| column == name) {
                *name
            } else {
                *default
            }
        })
        .collect();

    sql_query(records_ddl("records_new")).execute(conn)?;
    sql_query(format!(
        "INSERT INTO records_new ({}) SELECT {} FROM records",
        target_columns.join(", "),
        source_exprs.join(", ")
    ))
    .execute(conn)?;
    sql_query("DROP TABLE records").execute(conn)?;
    sql_query("ALTER TABLE records_new RENAME TO records").execute(conn)?;

    Ok(())
}

/// Apply additive column migrations, each gated on the column being absent.
fn add_missing_columns(conn: &mut SqliteConnection) -> QueryResult<()> {
    const RECORD_ADDITIONS: [(&str, &str); 8] = [
        (
            "updated_at",
            "ALTER TABLE records ADD COLUMN updated_at TEXT NOT NULL DEFAULT ''",
        ),
        (
            "event_date",
            "ALTER TABLE records ADD COLUMN event_date TEXT NOT NULL DEFAULT ''",
        ),
        (
            "prayer_slot",
            "ALTER TABLE records ADD COLUMN prayer_slot TEXT",
        ),
        (
            "disagree_count",
            "ALTER TABLE records ADD COLUMN disagree_count INTEGER NOT NULL DEFAULT 0",
        ),
        (
            "start_time",
            "ALTER TABLE records ADD COLUMN start_time TEXT",
        ),
        ("end_time", "ALTER TABLE records ADD COLUMN end_time TEXT"),
        (
            "proof_image",
            "ALTER TABLE records ADD COLUMN proof_image TEXT",
        ),
        (
            "status",
            "ALTER TABLE records ADD COLUMN status TEXT NOT NULL DEFAULT 'approved'",
        ),
    ];

    let record_columns = table_columns(conn, "records")?;
    for (column, statement) in RECORD_ADDITIONS {
        if !record_columns.iter().any(|name| name == column) {
            debug!(column, "adding missing records column");
            sql_query(statement).execute(conn)?;
        }
    }

    let vote_columns = table_columns(conn, "votes")?;
    if !vote_columns.iter().any(|name| name == "vote_type") {
        debug!("adding missing votes.vote_type column");
        sql_query("ALTER TABLE votes ADD COLUMN vote_type TEXT NOT NULL DEFAULT 'agree'")
            .execute(conn)?;
    }

    Ok(())
}

/// Backfill rows that predate defaulted columns. Safe to re-run: populated
/// rows are left alone.
fn backfill_defaults(conn: &mut SqliteConnection) -> QueryResult<()> {
    sql_query(
        "UPDATE records SET event_date = substr(created_at, 1, 10)
         WHERE event_date = '' OR event_date IS NULL",
    )
    .execute(conn)?;

    sql_query(
        "UPDATE records SET updated_at = created_at
         WHERE updated_at = '' OR updated_at IS NULL",
    )
    .execute(conn)?;

    sql_query(
        "UPDATE records SET status = 'approved'
         WHERE status = '' OR status IS NULL",
    )
    .execute(conn)?;

    Ok(())
}

/// The versioned migration list, applied in order.
const MIGRATIONS: [(&str, fn(&mut SqliteConnection) -> QueryResult<()>); 4] = [
    ("create_tables", create_tables),
    ("rebuild_records_food_type_check", rebuild_records_if_legacy),
    ("add_missing_columns", add_missing_columns),
    ("backfill_defaults", backfill_defaults),
];

/// Bring the database to the current schema shape.
///
/// Runs once per process start, before the server accepts requests. All
/// steps execute inside one exclusive transaction, so a partial failure
/// never drops data.
pub fn run(conn: &mut SqliteConnection) -> Result<(), MigrationError> {
    conn.exclusive_transaction(|conn| {
        for (name, step) in MIGRATIONS {
            debug!(migration = name, "applying schema migration step");
            step(conn)?;
        }
        Ok(())
    })
    .map_err(MigrationError::Query)?;
    info!("schema is current");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound::persistence::models::RecordRow;
    use crate::outbound::persistence::schema::records;
    use diesel::connection::SimpleConnection;
    use rstest::rstest;

    fn memory_conn() -> SqliteConnection {
        SqliteConnection::establish(":memory:").expect("in-memory database")
    }

    fn load_rows(conn: &mut SqliteConnection) -> Vec<RecordRow> {
        records::table
            .select(RecordRow::as_select())
            .load(conn)
            .expect("load records")
    }

    #[rstest]
    fn fresh_database_gets_current_schema() {
        let mut conn = memory_conn();
        run(&mut conn).expect("migrate");

        let columns = table_columns(&mut conn, "records").expect("introspect");
        for (name, _) in RECORD_COLUMNS {
            assert!(columns.iter().any(|column| column == name), "missing {name}");
        }
        assert!(table_ddl(&mut conn, "votes").expect("votes ddl").is_some());
        assert!(
            table_ddl(&mut conn, "moderation_requests")
                .expect("moderation ddl")
                .is_some()
        );
    }

    #[rstest]
    fn migrations_are_idempotent_across_restarts() {
        let mut conn = memory_conn();
        run(&mut conn).expect("first run");
        conn.batch_execute(
            "INSERT INTO records (id, name, lat, lng, food_type, created_at, updated_at, \
             event_date, status) VALUES ('r1', 'Test', 1.0, 2.0, 'muri', \
             '2026-08-30T10:00:00+00:00', '2026-08-30T10:00:00+00:00', '2026-08-30', 'approved')",
        )
        .expect("seed row");

        run(&mut conn).expect("second run");
        run(&mut conn).expect("third run");

        let rows = load_rows(&mut conn);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, "approved");
    }

    #[rstest]
    fn food_type_check_is_enforced_after_migration() {
        let mut conn = memory_conn();
        run(&mut conn).expect("migrate");

        let result = conn.batch_execute(
            "INSERT INTO records (id, name, lat, lng, food_type, created_at, updated_at, \
             event_date, status) VALUES ('bad', 'Test', 1.0, 2.0, 'khichuri', 'x', 'x', 'x', \
             'approved')",
        );
        assert!(result.is_err(), "CHECK constraint must reject unknown food");
    }

    #[rstest]
    fn duplicate_votes_are_rejected_by_unique_constraint() {
        let mut conn = memory_conn();
        run(&mut conn).expect("migrate");

        conn.batch_execute(
            "INSERT INTO votes (id, record_id, client_id, vote_type, created_at) \
             VALUES ('v1', 'r1', 'abc', 'agree', 'now')",
        )
        .expect("first vote");
        let duplicate = conn.batch_execute(
            "INSERT INTO votes (id, record_id, client_id, vote_type, created_at) \
             VALUES ('v2', 'r1', 'abc', 'disagree', 'now')",
        );
        assert!(duplicate.is_err(), "unique (record, client) must hold");
    }

    #[rstest]
    fn legacy_table_is_rebuilt_without_losing_rows() {
        let mut conn = memory_conn();
        // First-generation shape: no CHECK, no disagree_count, no status,
        // no event timing columns.
        conn.batch_execute(
            "CREATE TABLE records (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                lat REAL NOT NULL,
                lng REAL NOT NULL,
                food_type TEXT NOT NULL,
                verify_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            INSERT INTO records (id, name, lat, lng, food_type, verify_count, created_at)
            VALUES ('legacy1', 'Old Spot', 23.7, 90.4, 'biryani', 4, '2026-08-29T09:30:00+00:00');",
        )
        .expect("seed legacy schema");

        run(&mut conn).expect("migrate");

        let rows = load_rows(&mut conn);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.id, "legacy1");
        assert_eq!(row.verify_count, 4);
        assert_eq!(row.disagree_count, 0, "missing column defaults to zero");
        assert_eq!(row.status, "approved", "status backfilled");
        assert_eq!(row.event_date, "2026-08-29", "event date from created_at");
        assert_eq!(row.updated_at, row.created_at, "updated_at backfilled");

        let ddl = table_ddl(&mut conn, "records")
            .expect("introspect")
            .expect("table present");
        assert!(ddl.to_lowercase().contains(FOOD_TYPE_CHECK));
    }

    #[rstest]
    fn rebuild_aborts_cleanly_when_legacy_rows_violate_the_check() {
        let mut conn = memory_conn();
        conn.batch_execute(
            "CREATE TABLE records (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                lat REAL NOT NULL,
                lng REAL NOT NULL,
                food_type TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            INSERT INTO records (id, name, lat, lng, food_type, created_at)
            VALUES ('odd', 'Odd Spot', 1.0, 2.0, 'khichuri', '2026-08-29T09:30:00+00:00');",
        )
        .expect("seed violating row");

        run(&mut conn).expect_err("migration must abort");

        // The original table and its row survive the rollback.
        let ddl = table_ddl(&mut conn, "records")
            .expect("introspect")
            .expect("table present");
        assert!(!ddl.to_lowercase().contains(FOOD_TYPE_CHECK));
        let columns = table_columns(&mut conn, "records").expect("introspect");
        assert!(!columns.iter().any(|column| column == "disagree_count"));
    }

    #[rstest]
    fn backfills_do_not_touch_populated_rows() {
        let mut conn = memory_conn();
        run(&mut conn).expect("migrate");
        conn.batch_execute(
            "INSERT INTO records (id, name, lat, lng, food_type, created_at, updated_at, \
             event_date, status) VALUES ('r1', 'Test', 1.0, 2.0, 'muri', \
             '2026-08-30T10:00:00+00:00', '2026-08-30T12:00:00+00:00', '2026-09-02', 'pending')",
        )
        .expect("seed row");

        run(&mut conn).expect("re-run");

        let rows = load_rows(&mut conn);
        assert_eq!(rows[0].event_date, "2026-09-02");
        assert_eq!(rows[0].updated_at, "2026-08-30T12:00:00+00:00");
        assert_eq!(rows[0].status, "pending");
    }
}
