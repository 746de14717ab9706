//! Record data model.
//!
//! A record is a single event-location entry: an iftar spot with geo
//! coordinates, the food on offer, the prayer slot it is tied to, and an
//! event date/time window. Records are ephemeral; anything older than the
//! retention window is purged by the expiry sweeper.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Food served at the spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FoodType {
    Biryani,
    Muri,
    Jilapi,
    /// The spot is announced without food.
    None,
}

impl FoodType {
    /// Canonical lowercase storage form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Biryani => "biryani",
            Self::Muri => "muri",
            Self::Jilapi => "jilapi",
            Self::None => "none",
        }
    }

    /// Parse a canonical lowercase value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "biryani" => Some(Self::Biryani),
            "muri" => Some(Self::Muri),
            "jilapi" => Some(Self::Jilapi),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

impl fmt::Display for FoodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical prayer slot a record is tied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PrayerSlot {
    Juma,
    Johor,
    Asor,
    Magrib,
    Esha,
}

impl PrayerSlot {
    /// Canonical lowercase storage form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Juma => "juma",
            Self::Johor => "johor",
            Self::Asor => "asor",
            Self::Magrib => "magrib",
            Self::Esha => "esha",
        }
    }

    /// Parse a canonical lowercase value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "juma" => Some(Self::Juma),
            "johor" => Some(Self::Johor),
            "asor" => Some(Self::Asor),
            "magrib" => Some(Self::Magrib),
            "esha" => Some(Self::Esha),
            _ => None,
        }
    }

    /// Resolve a free-text alias (already trimmed and lowercased) to a
    /// canonical slot.
    ///
    /// Submitters use several spellings for the same slot; the alias table
    /// mirrors what the community actually types. Unknown spellings resolve
    /// to `None` and are rejected by the validator.
    pub fn resolve_alias(value: &str) -> Option<Self> {
        match value {
            "juma" | "jumuah" | "jumu'ah" | "zuhr" | "johor" => Some(Self::Juma),
            "asr" | "asor" => Some(Self::Asor),
            "maghrib" | "magrib" => Some(Self::Magrib),
            "isha" | "esha" => Some(Self::Esha),
            _ => None,
        }
    }
}

impl fmt::Display for PrayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Moderation status of a record.
///
/// `Pending` exists for a future moderation gate; every record created via
/// the public API is `Approved` immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Pending,
    Approved,
}

impl RecordStatus {
    /// Canonical lowercase storage form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
        }
    }

    /// Parse a canonical lowercase value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            _ => None,
        }
    }
}

/// Direction of a crowd-verification vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteKind {
    Agree,
    Disagree,
}

impl VoteKind {
    /// Canonical lowercase storage form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Agree => "agree",
            Self::Disagree => "disagree",
        }
    }
}

/// A persisted record.
///
/// Timestamps are carried as the stored ISO-8601 text. Rows written by this
/// service always hold well-formed UTC timestamps, but older rows may not;
/// consumers that need a parsed time (trust scoring, expiry) parse leniently
/// and fall back per their own contract.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Server-generated opaque identifier, immutable.
    pub id: String,
    /// Display name of the spot.
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub food_type: FoodType,
    /// `None` only for legacy rows that predate slot normalisation.
    pub prayer_slot: Option<PrayerSlot>,
    pub verify_count: i32,
    pub disagree_count: i32,
    /// ISO-8601 creation timestamp; immutable.
    pub created_at: String,
    /// ISO-8601 timestamp bumped on every vote.
    pub updated_at: String,
    /// Calendar date of the event, `YYYY-MM-DD`.
    pub event_date: String,
    /// Optional `HH:MM` start of the serving window.
    pub start_time: Option<String>,
    /// Optional `HH:MM` end of the serving window.
    pub end_time: Option<String>,
    /// Reference to an externally stored proof image, if any.
    pub proof_image: Option<String>,
    pub status: RecordStatus,
}

/// Filters applied by the approved-record listing.
///
/// All supplied filters must match; absent filters match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Exact `YYYY-MM-DD` event-date match.
    pub event_date: Option<String>,
    /// Exact food-type match.
    pub food_type: Option<FoodType>,
    /// Case-insensitive substring match on the record name.
    pub name_query: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("juma", Some(PrayerSlot::Juma))]
    #[case("jumuah", Some(PrayerSlot::Juma))]
    #[case("jumu'ah", Some(PrayerSlot::Juma))]
    #[case("zuhr", Some(PrayerSlot::Juma))]
    #[case("johor", Some(PrayerSlot::Juma))]
    #[case("asr", Some(PrayerSlot::Asor))]
    #[case("asor", Some(PrayerSlot::Asor))]
    #[case("maghrib", Some(PrayerSlot::Magrib))]
    #[case("magrib", Some(PrayerSlot::Magrib))]
    #[case("isha", Some(PrayerSlot::Esha))]
    #[case("esha", Some(PrayerSlot::Esha))]
    #[case("fajr", None)]
    #[case("", None)]
    fn prayer_slot_alias_resolution(#[case] input: &str, #[case] expected: Option<PrayerSlot>) {
        assert_eq!(PrayerSlot::resolve_alias(input), expected);
    }

    #[rstest]
    #[case("biryani", Some(FoodType::Biryani))]
    #[case("muri", Some(FoodType::Muri))]
    #[case("jilapi", Some(FoodType::Jilapi))]
    #[case("none", Some(FoodType::None))]
    #[case("Biryani", None)]
    #[case("pizza", None)]
    fn food_type_parsing(#[case] input: &str, #[case] expected: Option<FoodType>) {
        assert_eq!(FoodType::parse(input), expected);
    }

    #[rstest]
    fn enums_round_trip_through_storage_form() {
        for slot in [
            PrayerSlot::Juma,
            PrayerSlot::Johor,
            PrayerSlot::Asor,
            PrayerSlot::Magrib,
            PrayerSlot::Esha,
        ] {
            assert_eq!(PrayerSlot::parse(slot.as_str()), Some(slot));
        }
        for status in [RecordStatus::Pending, RecordStatus::Approved] {
            assert_eq!(RecordStatus::parse(status.as_str()), Some(status));
        }
    }
}
