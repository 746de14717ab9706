//! Submission payload normalisation and validation.
//!
//! Inbound creation payloads are loosely typed: JSON bodies, urlencoded
//! forms, and multipart forms all funnel into [`RawSubmission`], a typed
//! intermediate with explicit optional fields. [`validate`] is a pure total
//! function from that intermediate to a fully normalised [`RecordDraft`] or
//! a tagged [`Error`], checking fields in a fixed order and short-circuiting
//! on the first failure.

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::Value;

use super::error::Error;
use super::record::{FoodType, PrayerSlot};

/// Image extensions accepted for proof uploads, lowercase without the dot.
pub const ALLOWED_IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// An uploaded image attachment, as received by the HTTP adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    /// Client-supplied file name; only its extension matters.
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// An attachment that passed extension validation and awaits persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedImage {
    /// Validated lowercase extension without the dot.
    pub extension: String,
    pub bytes: Vec<u8>,
}

/// Raw, untyped record-creation payload.
///
/// `lat`/`lng` stay as JSON values because clients send them as numbers or
/// as strings depending on the body encoding.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSubmission {
    pub name: Option<String>,
    pub lat: Option<Value>,
    pub lng: Option<Value>,
    pub food_type: Option<String>,
    pub prayer_slot: Option<String>,
    pub event_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    #[serde(skip)]
    pub image: Option<ImageAttachment>,
}

impl RawSubmission {
    /// Assign a text field by its wire name. Unknown names are ignored,
    /// matching serde's behaviour for unknown JSON keys.
    pub fn set_text_field(&mut self, name: &str, value: String) {
        match name {
            "name" => self.name = Some(value),
            "lat" => self.lat = Some(Value::String(value)),
            "lng" => self.lng = Some(Value::String(value)),
            "foodType" => self.food_type = Some(value),
            "prayerSlot" => self.prayer_slot = Some(value),
            "eventDate" => self.event_date = Some(value),
            "startTime" => self.start_time = Some(value),
            "endTime" => self.end_time = Some(value),
            _ => {}
        }
    }

    /// Build a submission from decoded form key/value pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut submission = Self::default();
        for (name, value) in pairs {
            submission.set_text_field(&name, value);
        }
        submission
    }
}

/// A fully validated, normalised record draft awaiting persistence.
///
/// Every optional field is resolved to either a valid value or an explicit
/// absence; `proof_image` is filled in by the caller once the accepted
/// attachment has been written to the blob store.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDraft {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub food_type: FoodType,
    pub prayer_slot: PrayerSlot,
    pub event_date: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub proof_image: Option<String>,
}

/// Output of [`validate`]: the draft plus the accepted attachment, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSubmission {
    pub draft: RecordDraft,
    pub image: Option<AcceptedImage>,
}

fn coerce_coordinate(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

fn is_valid_date(value: &str) -> bool {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

fn is_valid_time(value: &str) -> bool {
    NaiveTime::parse_from_str(value, "%H:%M").is_ok()
}

/// Validate an optional `HH:MM` field; absent or blank is valid.
fn validate_time(value: Option<&String>, failure: &str) -> Result<Option<String>, Error> {
    match non_empty(value) {
        None => Ok(None),
        Some(text) if is_valid_time(&text) => Ok(Some(text)),
        Some(_) => Err(Error::invalid_request(failure)),
    }
}

/// Check an attachment's extension against the allow-list.
///
/// A blank filename is treated as "no image"; a real filename with an
/// unsupported (or missing) extension is rejected as unsupported media.
fn validate_image(image: Option<ImageAttachment>) -> Result<Option<AcceptedImage>, Error> {
    let Some(image) = image else {
        return Ok(None);
    };
    let filename = image.filename.trim();
    if filename.is_empty() {
        return Ok(None);
    }

    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase);

    match extension {
        Some(ext) if ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str()) => Ok(Some(AcceptedImage {
            extension: ext,
            bytes: image.bytes,
        })),
        _ => Err(Error::unsupported_media("Invalid image format")),
    }
}

/// Normalise and validate a raw submission against the current calendar
/// date, short-circuiting on the first failure.
pub fn validate(raw: RawSubmission, today: NaiveDate) -> Result<ValidatedSubmission, Error> {
    let lat = coerce_coordinate(raw.lat.as_ref())
        .ok_or_else(|| Error::invalid_request("Invalid latitude/longitude"))?;
    let lng = coerce_coordinate(raw.lng.as_ref())
        .ok_or_else(|| Error::invalid_request("Invalid latitude/longitude"))?;

    let name =
        non_empty(raw.name.as_ref()).ok_or_else(|| Error::invalid_request("Name is required"))?;

    let food_type = raw
        .food_type
        .as_deref()
        .map(|value| value.trim().to_lowercase())
        .and_then(|value| FoodType::parse(&value))
        .ok_or_else(|| Error::invalid_request("Invalid food type"))?;

    let prayer_slot = match non_empty(raw.prayer_slot.as_ref()) {
        None => PrayerSlot::Juma,
        Some(text) => PrayerSlot::resolve_alias(&text.to_lowercase())
            .ok_or_else(|| Error::invalid_request("Invalid prayer slot"))?,
    };

    let event_date = match non_empty(raw.event_date.as_ref()) {
        None => today.format("%Y-%m-%d").to_string(),
        Some(text) if is_valid_date(&text) => text,
        Some(_) => return Err(Error::invalid_request("Invalid event date")),
    };

    let start_time = validate_time(raw.start_time.as_ref(), "Invalid start time")?;
    let end_time = validate_time(raw.end_time.as_ref(), "Invalid end time")?;

    // HH:MM strings compare correctly as text.
    if let (Some(start), Some(end)) = (&start_time, &end_time) {
        if start > end {
            return Err(Error::invalid_request(
                "Start time cannot be after end time",
            ));
        }
    }

    let image = validate_image(raw.image)?;

    Ok(ValidatedSubmission {
        draft: RecordDraft {
            name,
            lat,
            lng,
            food_type,
            prayer_slot,
            event_date,
            start_time,
            end_time,
            proof_image: None,
        },
        image,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorCode;
    use rstest::rstest;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 30).expect("valid test date")
    }

    fn base_submission() -> RawSubmission {
        RawSubmission {
            name: Some("Baitul Mukarram".into()),
            lat: Some(json!(23.8)),
            lng: Some(json!(90.4)),
            food_type: Some("biryani".into()),
            ..RawSubmission::default()
        }
    }

    #[rstest]
    fn minimal_submission_resolves_defaults() {
        let validated = validate(base_submission(), today()).expect("valid submission");
        let draft = validated.draft;
        assert_eq!(draft.name, "Baitul Mukarram");
        assert_eq!(draft.food_type, FoodType::Biryani);
        assert_eq!(draft.prayer_slot, PrayerSlot::Juma);
        assert_eq!(draft.event_date, "2026-08-30");
        assert_eq!(draft.start_time, None);
        assert_eq!(draft.end_time, None);
        assert_eq!(draft.proof_image, None);
        assert!(validated.image.is_none());
    }

    #[rstest]
    #[case(json!("23.8"), json!("90.4"))] // stringy coordinates from forms
    #[case(json!(23.8), json!("90.4"))]
    #[case(json!(" 23.8 "), json!(90.4))]
    fn coordinates_accept_numbers_and_numeric_strings(#[case] lat: Value, #[case] lng: Value) {
        let mut raw = base_submission();
        raw.lat = Some(lat);
        raw.lng = Some(lng);
        let draft = validate(raw, today()).expect("valid submission").draft;
        assert!((draft.lat - 23.8).abs() < f64::EPSILON);
        assert!((draft.lng - 90.4).abs() < f64::EPSILON);
    }

    #[rstest]
    #[case(None, Some(json!(90.4)))]
    #[case(Some(json!("x")), Some(json!(90.4)))]
    #[case(Some(json!(23.8)), None)]
    #[case(Some(json!(true)), Some(json!(90.4)))]
    fn bad_coordinates_are_rejected_first(
        #[case] lat: Option<Value>,
        #[case] lng: Option<Value>,
    ) {
        let mut raw = base_submission();
        raw.lat = lat;
        raw.lng = lng;
        raw.name = Some(String::new()); // would fail later; lat/lng wins
        let error = validate(raw, today()).expect_err("must reject");
        assert_eq!(error.code(), ErrorCode::InvalidRequest);
        assert_eq!(error.message(), "Invalid latitude/longitude");
    }

    #[rstest]
    #[case(None)]
    #[case(Some("".into()))]
    #[case(Some("   ".into()))]
    fn blank_name_is_rejected(#[case] name: Option<String>) {
        let mut raw = base_submission();
        raw.name = name;
        let error = validate(raw, today()).expect_err("must reject");
        assert_eq!(error.message(), "Name is required");
    }

    #[rstest]
    #[case(Some(" BIRYANI ".into()), FoodType::Biryani)]
    #[case(Some("muri".into()), FoodType::Muri)]
    #[case(Some("none".into()), FoodType::None)]
    fn food_type_is_trimmed_and_lowercased(#[case] input: Option<String>, #[case] expected: FoodType) {
        let mut raw = base_submission();
        raw.food_type = input;
        let draft = validate(raw, today()).expect("valid submission").draft;
        assert_eq!(draft.food_type, expected);
    }

    #[rstest]
    #[case(None)]
    #[case(Some("pizza".into()))]
    #[case(Some("".into()))]
    fn unknown_food_type_is_rejected(#[case] input: Option<String>) {
        let mut raw = base_submission();
        raw.food_type = input;
        let error = validate(raw, today()).expect_err("must reject");
        assert_eq!(error.message(), "Invalid food type");
    }

    #[rstest]
    #[case(Some("Jumuah".into()), PrayerSlot::Juma)]
    #[case(Some(" zuhr ".into()), PrayerSlot::Juma)]
    #[case(Some("ISHA".into()), PrayerSlot::Esha)]
    #[case(Some("maghrib".into()), PrayerSlot::Magrib)]
    #[case(None, PrayerSlot::Juma)]
    #[case(Some("".into()), PrayerSlot::Juma)]
    fn prayer_slot_aliases_normalise(#[case] input: Option<String>, #[case] expected: PrayerSlot) {
        let mut raw = base_submission();
        raw.prayer_slot = input;
        let draft = validate(raw, today()).expect("valid submission").draft;
        assert_eq!(draft.prayer_slot, expected);
    }

    #[rstest]
    fn unresolvable_prayer_slot_is_rejected() {
        let mut raw = base_submission();
        raw.prayer_slot = Some("fajr".into());
        let error = validate(raw, today()).expect_err("must reject");
        assert_eq!(error.message(), "Invalid prayer slot");
    }

    #[rstest]
    #[case("2026-09-01", Ok(()))]
    #[case("2026-9-1", Ok(()))] // chrono accepts unpadded components
    #[case("01-09-2026", Err(()))]
    #[case("tomorrow", Err(()))]
    fn event_date_format_is_enforced(#[case] input: &str, #[case] outcome: Result<(), ()>) {
        let mut raw = base_submission();
        raw.event_date = Some(input.into());
        let result = validate(raw, today());
        match outcome {
            Ok(()) => {
                assert!(result.is_ok());
            }
            Err(()) => {
                assert_eq!(result.expect_err("must reject").message(), "Invalid event date");
            }
        }
    }

    #[rstest]
    #[case(Some("18:30".into()), Some("19:15".into()), Ok(()))]
    #[case(Some("18:30".into()), None, Ok(()))]
    #[case(Some("".into()), Some("".into()), Ok(()))]
    #[case(Some("half past six".into()), None, Err("Invalid start time"))]
    #[case(None, Some("25:99".into()), Err("Invalid end time"))]
    #[case(Some("19:15".into()), Some("18:30".into()), Err("Start time cannot be after end time"))]
    fn time_window_rules(
        #[case] start: Option<String>,
        #[case] end: Option<String>,
        #[case] outcome: Result<(), &str>,
    ) {
        let mut raw = base_submission();
        raw.start_time = start;
        raw.end_time = end;
        let result = validate(raw, today());
        match outcome {
            Ok(()) => {
                assert!(result.is_ok());
            }
            Err(message) => {
                assert_eq!(result.expect_err("must reject").message(), message);
            }
        }
    }

    #[rstest]
    #[case("proof.JPG", "jpg")]
    #[case("spread.jpeg", "jpeg")]
    #[case("banner.png", "png")]
    #[case("photo.WebP", "webp")]
    fn allowed_image_extensions_are_accepted(#[case] filename: &str, #[case] extension: &str) {
        let mut raw = base_submission();
        raw.image = Some(ImageAttachment {
            filename: filename.into(),
            bytes: vec![1, 2, 3],
        });
        let validated = validate(raw, today()).expect("valid submission");
        let image = validated.image.expect("accepted image");
        assert_eq!(image.extension, extension);
        assert_eq!(image.bytes, vec![1, 2, 3]);
    }

    #[rstest]
    #[case("malware.exe")]
    #[case("document.pdf")]
    #[case("noextension")]
    fn disallowed_image_extensions_are_unsupported_media(#[case] filename: &str) {
        let mut raw = base_submission();
        raw.image = Some(ImageAttachment {
            filename: filename.into(),
            bytes: vec![],
        });
        let error = validate(raw, today()).expect_err("must reject");
        assert_eq!(error.code(), ErrorCode::UnsupportedMedia);
        assert_eq!(error.message(), "Invalid image format");
    }

    #[rstest]
    fn blank_image_filename_counts_as_no_image() {
        let mut raw = base_submission();
        raw.image = Some(ImageAttachment {
            filename: "  ".into(),
            bytes: vec![9],
        });
        let validated = validate(raw, today()).expect("valid submission");
        assert!(validated.image.is_none());
    }

    #[rstest]
    fn from_pairs_maps_wire_names() {
        let raw = RawSubmission::from_pairs([
            ("name".to_owned(), "Star Mosque".to_owned()),
            ("lat".to_owned(), "23.7".to_owned()),
            ("lng".to_owned(), "90.39".to_owned()),
            ("foodType".to_owned(), "jilapi".to_owned()),
            ("prayerSlot".to_owned(), "asr".to_owned()),
            ("ignoredField".to_owned(), "whatever".to_owned()),
        ]);
        let draft = validate(raw, today()).expect("valid submission").draft;
        assert_eq!(draft.name, "Star Mosque");
        assert_eq!(draft.food_type, FoodType::Jilapi);
        assert_eq!(draft.prayer_slot, PrayerSlot::Asor);
    }
}
