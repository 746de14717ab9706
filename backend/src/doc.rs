//! OpenAPI document assembly.
//!
//! Aggregates the record and health endpoint annotations plus the shared
//! response schemas into a single specification for tooling consumers.

use utoipa::OpenApi;

use crate::domain::{Error, ErrorCode, FoodType, PrayerSlot, RecordStatus};
use crate::inbound::http::records::RecordView;

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Iftar Radar API",
        description = "Community-sourced directory of iftar and mosque events with crowd verification."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::records::list_records,
        crate::inbound::http::records::create_record,
        crate::inbound::http::records::agree_record,
        crate::inbound::http::records::disagree_record,
        crate::inbound::http::health::healthz,
    ),
    components(schemas(RecordView, Error, ErrorCode, FoodType, PrayerSlot, RecordStatus)),
    tags(
        (name = "records", description = "Record listing, submission, and voting"),
        (name = "health", description = "Service health probes")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_references_all_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for expected in [
            "/records",
            "/records/{id}/agree",
            "/records/{id}/disagree",
            "/healthz",
        ] {
            assert!(paths.contains(&expected), "missing path: {expected}");
        }
    }

    #[test]
    fn document_registers_record_schema() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components present");
        assert!(components.schemas.contains_key("RecordView"));
        assert!(components.schemas.contains_key("Error"));
    }
}
