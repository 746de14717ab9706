//! Domain ports defining the edges of the hexagon.
//!
//! Ports describe how the domain expects to interact with driven adapters
//! (the record store and the image blob store). HTTP handlers depend only on
//! these traits so they remain testable without real I/O.

use async_trait::async_trait;

use super::error::Error;
use super::record::{Record, RecordFilter, VoteKind};
use super::submission::RecordDraft;

/// Persistence operations over records and their votes.
///
/// Implementations must run a best-effort expiry sweep before every
/// operation and apply each `create`/`vote` call as one atomic unit.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// List approved records matching all supplied filters, most recently
    /// active first.
    async fn list_approved(&self, filter: RecordFilter) -> Result<Vec<Record>, Error>;

    /// Persist a draft as a new approved record with zeroed counters.
    async fn create(&self, draft: RecordDraft) -> Result<Record, Error>;

    /// Record one client's vote on a record and return the updated record.
    ///
    /// Fails with `NotFound` when no approved record matches, and with
    /// `Conflict` when this client already voted on it.
    async fn vote(&self, record_id: &str, client_id: &str, kind: VoteKind)
        -> Result<Record, Error>;
}

/// Opaque blob storage for proof images.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist the bytes under a freshly generated unique name and return
    /// an opaque reference path.
    async fn save(&self, extension: &str, bytes: Vec<u8>) -> Result<String, Error>;
}
