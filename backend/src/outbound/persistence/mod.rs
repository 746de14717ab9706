//! SQLite persistence adapters.
//!
//! The schema manager brings the database to the current shape on startup;
//! the record store implements the domain's [`RecordStore`] port on top of
//! the pooled connections, sweeping expired rows before every operation.
//!
//! [`RecordStore`]: crate::domain::ports::RecordStore

pub mod migrations;
pub mod models;
pub mod pool;
pub mod record_store;
pub mod schema;
pub mod sweeper;

pub use migrations::MigrationError;
pub use pool::{DbPool, PoolConfig, PoolError};
pub use record_store::DieselRecordStore;
