//! HTTP adapters exposing the record directory over actix-web.

pub mod error;
pub mod health;
pub mod records;
pub mod state;

pub use error::ApiResult;
pub use health::{healthz, HealthState};
pub use records::{agree_record, create_record, disagree_record, list_records};
pub use state::HttpState;
