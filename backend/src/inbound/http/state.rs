//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports and remain testable without real I/O.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::ports::{ImageStore, RecordStore};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Record persistence port.
    pub records: Arc<dyn RecordStore>,
    /// Proof-image blob storage port.
    pub images: Arc<dyn ImageStore>,
    /// Clock used for trust scoring and event-date defaulting.
    pub clock: Arc<dyn Clock>,
}

impl HttpState {
    /// Bundle the ports into handler state.
    pub fn new(
        records: Arc<dyn RecordStore>,
        images: Arc<dyn ImageStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            records,
            images,
            clock,
        }
    }
}
