//! Diesel row models and their domain conversions.

use diesel::prelude::*;

use crate::domain::{FoodType, PrayerSlot, Record, RecordStatus};

use super::schema::{records, votes};

/// A full row of the `records` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = records)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RecordRow {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub food_type: String,
    pub prayer_slot: Option<String>,
    pub verify_count: i32,
    pub disagree_count: i32,
    pub created_at: String,
    pub updated_at: String,
    pub event_date: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub proof_image: Option<String>,
    pub status: String,
}

impl From<RecordRow> for Record {
    fn from(row: RecordRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            lat: row.lat,
            lng: row.lng,
            // The CHECK constraint keeps stored values canonical; anything
            // else is a legacy oddity and degrades to the neutral variant.
            food_type: FoodType::parse(&row.food_type).unwrap_or(FoodType::None),
            prayer_slot: row.prayer_slot.as_deref().and_then(PrayerSlot::parse),
            verify_count: row.verify_count,
            disagree_count: row.disagree_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
            event_date: row.event_date,
            start_time: row.start_time,
            end_time: row.end_time,
            proof_image: row.proof_image,
            status: RecordStatus::parse(&row.status).unwrap_or(RecordStatus::Approved),
        }
    }
}

/// Insertable row of the `votes` table.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = votes)]
pub struct NewVoteRow {
    pub id: String,
    pub record_id: String,
    pub client_id: String,
    pub vote_type: String,
    pub created_at: String,
}
