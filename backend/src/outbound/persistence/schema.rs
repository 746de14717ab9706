//! Diesel table definitions for the SQLite schema.
//!
//! These definitions must match the DDL applied by the schema manager in
//! `migrations.rs` exactly; Diesel uses them for type-safe SQL generation.
//! Timestamps are stored as ISO-8601 text, the storage-native form for this
//! schema generation.

diesel::table! {
    /// Iftar spot records.
    records (id) {
        /// Primary key: UUID v4 as simple hex.
        id -> Text,
        name -> Text,
        lat -> Double,
        lng -> Double,
        /// Constrained by CHECK to the food-type enum.
        food_type -> Text,
        /// Canonical prayer slot; nullable for legacy rows.
        prayer_slot -> Nullable<Text>,
        verify_count -> Integer,
        disagree_count -> Integer,
        created_at -> Text,
        updated_at -> Text,
        /// Event calendar date, `YYYY-MM-DD`.
        event_date -> Text,
        start_time -> Nullable<Text>,
        end_time -> Nullable<Text>,
        proof_image -> Nullable<Text>,
        status -> Text,
    }
}

diesel::table! {
    /// Crowd-verification votes, unique per `(record_id, client_id)`.
    votes (id) {
        id -> Text,
        record_id -> Text,
        /// Opaque caller-supplied client token.
        client_id -> Text,
        /// `agree` or `disagree`, constrained by CHECK.
        vote_type -> Text,
        created_at -> Text,
    }
}

diesel::table! {
    /// Moderation requests; schema-only placeholder with no public mutation
    /// path in the current flow.
    moderation_requests (id) {
        id -> Text,
        record_id -> Text,
        request_type -> Text,
        message -> Text,
        status -> Text,
        created_at -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(records, votes, moderation_requests);
