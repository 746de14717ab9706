//! Domain types and pure logic.
//!
//! Purpose: define the strongly typed record model, payload validation,
//! trust scoring, and the error taxonomy shared by adapters. Everything here
//! is transport and storage agnostic; inbound adapters map [`Error`] to HTTP
//! responses and outbound adapters implement the [`ports`] traits.

pub mod error;
pub mod ports;
pub mod record;
pub mod submission;
pub mod trust;

pub use self::error::{Error, ErrorCode};
pub use self::record::{FoodType, PrayerSlot, Record, RecordFilter, RecordStatus, VoteKind};
pub use self::submission::{
    AcceptedImage, ImageAttachment, RawSubmission, RecordDraft, ValidatedSubmission, validate,
};
pub use self::trust::{parse_stored_timestamp, trust_score_at};
