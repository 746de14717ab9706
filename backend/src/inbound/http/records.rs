//! Record API handlers.
//!
//! ```text
//! GET  /records                 List approved records with optional filters
//! POST /records                 Submit a new record (JSON, form, or multipart)
//! POST /records/{id}/agree      Crowd-verify a record
//! POST /records/{id}/disagree   Dispute a record
//! ```
//!
//! Creation payloads arrive as JSON bodies, urlencoded forms, or multipart
//! forms with an optional `proofImage` attachment; all three funnel into the
//! domain's [`RawSubmission`] before validation. Vote routes require an
//! opaque client token via the `X-Client-Id` header, the `clientId` query
//! parameter, or a JSON body field.

use actix_multipart::Multipart;
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use chrono::NaiveDate;
use futures_util::StreamExt as _;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    trust_score_at, validate, Error, FoodType, ImageAttachment, PrayerSlot, RawSubmission, Record,
    RecordFilter, RecordStatus, VoteKind,
};

use super::error::ApiResult;
use super::state::HttpState;

/// Header carrying the caller's opaque client token.
pub const CLIENT_ID_HEADER: &str = "X-Client-Id";

/// Request bodies are capped at 5 MiB, images included.
const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Record representation returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordView {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub food_type: FoodType,
    pub prayer_slot: Option<PrayerSlot>,
    pub verify_count: i32,
    pub disagree_count: i32,
    pub created_at: String,
    pub updated_at: String,
    pub event_date: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub proof_image: Option<String>,
    pub status: RecordStatus,
    /// Derived 0-100 confidence score; recomputed on every read.
    pub trust_score: i32,
}

impl RecordView {
    fn from_record(record: Record, now: chrono::DateTime<chrono::Utc>) -> Self {
        let trust_score = trust_score_at(record.verify_count, &record.updated_at, now);
        Self {
            id: record.id,
            name: record.name,
            lat: record.lat,
            lng: record.lng,
            food_type: record.food_type,
            prayer_slot: record.prayer_slot,
            verify_count: record.verify_count,
            disagree_count: record.disagree_count,
            created_at: record.created_at,
            updated_at: record.updated_at,
            event_date: record.event_date,
            start_time: record.start_time,
            end_time: record.end_time,
            proof_image: record.proof_image,
            status: record.status,
            trust_score,
        }
    }
}

/// Query parameters accepted by the record listing.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// Exact `YYYY-MM-DD` event-date filter.
    pub date: Option<String>,
    /// Case-insensitive substring filter on the record name.
    pub q: Option<String>,
    /// Food-type filter; `all` or an unknown value matches everything.
    pub quick_food: Option<String>,
}

/// Query parameters accepted by the vote routes.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct VoteQuery {
    /// Opaque client token, when not supplied via header or body.
    pub client_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
struct VoteBody {
    client_id: Option<String>,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

fn build_filter(query: &ListQuery) -> Result<RecordFilter, Error> {
    let event_date = match non_blank(query.date.as_deref()) {
        None => None,
        Some(date) => {
            if NaiveDate::parse_from_str(&date, "%Y-%m-%d").is_err() {
                return Err(Error::invalid_request("Invalid date format"));
            }
            Some(date)
        }
    };

    // Unknown quick-food values collapse to "all" rather than failing.
    let food_type = non_blank(query.quick_food.as_deref())
        .map(|value| value.to_lowercase())
        .filter(|value| value != "all")
        .and_then(|value| FoodType::parse(&value));

    Ok(RecordFilter {
        event_date,
        food_type,
        name_query: non_blank(query.q.as_deref()).map(|value| value.to_lowercase()),
    })
}

/// List approved records, most recently active first.
#[utoipa::path(
    get,
    path = "/records",
    params(ListQuery),
    responses(
        (status = 200, description = "Matching records", body = [RecordView]),
        (status = 400, description = "Malformed date filter", body = Error),
        (status = 500, description = "Storage failure", body = Error)
    ),
    tag = "records"
)]
#[get("/records")]
pub async fn list_records(
    state: web::Data<HttpState>,
    query: web::Query<ListQuery>,
) -> ApiResult<HttpResponse> {
    let filter = build_filter(&query)?;
    let listed = state.records.list_approved(filter).await?;

    let now = state.clock.utc();
    let views: Vec<RecordView> = listed
        .into_iter()
        .map(|record| RecordView::from_record(record, now))
        .collect();
    Ok(HttpResponse::Ok().json(views))
}

async fn read_capped_body(mut payload: web::Payload) -> Result<web::BytesMut, Error> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|_| Error::invalid_request("Malformed request body"))?;
        if body.len() + chunk.len() > MAX_BODY_BYTES {
            return Err(Error::invalid_request("Payload too large"));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

async fn parse_multipart(
    req: &HttpRequest,
    payload: web::Payload,
) -> Result<RawSubmission, Error> {
    let mut multipart = Multipart::new(req.headers(), payload);
    let mut submission = RawSubmission::default();

    while let Some(field) = multipart.next().await {
        let mut field = field.map_err(|_| Error::invalid_request("Malformed multipart body"))?;
        let name = field.name().to_owned();
        let filename = field
            .content_disposition()
            .get_filename()
            .map(str::to_owned);

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|_| Error::invalid_request("Malformed multipart body"))?;
            if bytes.len() + chunk.len() > MAX_BODY_BYTES {
                return Err(Error::invalid_request("Payload too large"));
            }
            bytes.extend_from_slice(&chunk);
        }

        if name == "proofImage" {
            if let Some(filename) = filename {
                submission.image = Some(ImageAttachment { filename, bytes });
            }
        } else {
            submission.set_text_field(&name, String::from_utf8_lossy(&bytes).into_owned());
        }
    }

    Ok(submission)
}

/// Decode the creation payload from whichever body encoding the client
/// chose. An unreadable JSON body degrades to an empty submission, which
/// then fails validation with a field-level message.
async fn parse_submission(req: &HttpRequest, payload: web::Payload) -> Result<RawSubmission, Error> {
    let content_type = req
        .headers()
        .get(actix_web::http::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_lowercase();

    if content_type.contains("multipart/form-data") {
        return parse_multipart(req, payload).await;
    }

    let body = read_capped_body(payload).await?;
    if content_type.contains("application/x-www-form-urlencoded") {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(&body)
            .map_err(|_| Error::invalid_request("Malformed form body"))?;
        return Ok(RawSubmission::from_pairs(pairs));
    }

    Ok(serde_json::from_slice(&body).unwrap_or_default())
}

/// Submit a new record.
///
/// The record is approved immediately and expires 24 hours after creation.
#[utoipa::path(
    post,
    path = "/records",
    responses(
        (status = 201, description = "Record created", body = RecordView),
        (status = 400, description = "Invalid payload", body = Error),
        (status = 415, description = "Unsupported image format", body = Error),
        (status = 503, description = "Store busy", body = Error),
        (status = 500, description = "Storage failure", body = Error)
    ),
    tag = "records"
)]
#[post("/records")]
pub async fn create_record(
    state: web::Data<HttpState>,
    req: HttpRequest,
    payload: web::Payload,
) -> ApiResult<HttpResponse> {
    let submission = parse_submission(&req, payload).await?;

    let today = state.clock.utc().date_naive();
    let validated = validate(submission, today)?;

    let mut draft = validated.draft;
    if let Some(image) = validated.image {
        draft.proof_image = Some(state.images.save(&image.extension, image.bytes).await?);
    }

    let created = state.records.create(draft).await?;
    let now = state.clock.utc();
    Ok(HttpResponse::Created().json(RecordView::from_record(created, now)))
}

fn client_token(req: &HttpRequest, query: &VoteQuery, body: &web::Bytes) -> Option<String> {
    let from_header = req
        .headers()
        .get(CLIENT_ID_HEADER)
        .and_then(|value| value.to_str().ok());
    if let Some(token) = non_blank(from_header) {
        return Some(token);
    }
    if let Some(token) = non_blank(query.client_id.as_deref()) {
        return Some(token);
    }
    let parsed: VoteBody = serde_json::from_slice(body).unwrap_or_default();
    non_blank(parsed.client_id.as_deref())
}

async fn handle_vote(
    state: web::Data<HttpState>,
    record_id: String,
    req: HttpRequest,
    query: web::Query<VoteQuery>,
    body: web::Bytes,
    kind: VoteKind,
) -> ApiResult<HttpResponse> {
    let client_id = client_token(&req, &query, &body)
        .ok_or_else(|| Error::invalid_request("Missing client id"))?;

    let updated = state.records.vote(&record_id, &client_id, kind).await?;
    let now = state.clock.utc();
    Ok(HttpResponse::Ok().json(RecordView::from_record(updated, now)))
}

/// Crowd-verify a record.
#[utoipa::path(
    post,
    path = "/records/{id}/agree",
    params(
        ("id" = String, Path, description = "Record identifier"),
        VoteQuery
    ),
    request_body(
        content = Option<VoteBody>,
        content_type = "application/json",
        description = "Optional JSON body carrying the client token"
    ),
    responses(
        (status = 200, description = "Updated record", body = RecordView),
        (status = 400, description = "Missing client token", body = Error),
        (status = 404, description = "Record absent or not approved", body = Error),
        (status = 409, description = "Client already voted", body = Error),
        (status = 503, description = "Store busy", body = Error)
    ),
    tag = "records"
)]
#[post("/records/{id}/agree")]
pub async fn agree_record(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    req: HttpRequest,
    query: web::Query<VoteQuery>,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    handle_vote(state, path.into_inner(), req, query, body, VoteKind::Agree).await
}

/// Dispute a record.
#[utoipa::path(
    post,
    path = "/records/{id}/disagree",
    params(
        ("id" = String, Path, description = "Record identifier"),
        VoteQuery
    ),
    request_body(
        content = Option<VoteBody>,
        content_type = "application/json",
        description = "Optional JSON body carrying the client token"
    ),
    responses(
        (status = 200, description = "Updated record", body = RecordView),
        (status = 400, description = "Missing client token", body = Error),
        (status = 404, description = "Record absent or not approved", body = Error),
        (status = 409, description = "Client already voted", body = Error),
        (status = 503, description = "Store busy", body = Error)
    ),
    tag = "records"
)]
#[post("/records/{id}/disagree")]
pub async fn disagree_record(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    req: HttpRequest,
    query: web::Query<VoteQuery>,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    handle_vote(
        state,
        path.into_inner(),
        req,
        query,
        body,
        VoteKind::Disagree,
    )
    .await
}
