//! Community-sourced directory of iftar and mosque events.
//!
//! The crate is split along hexagonal lines: `domain` holds the record
//! model, validation, trust scoring, and storage ports; `inbound` exposes
//! the REST surface; `outbound` carries the SQLite persistence and image
//! storage adapters; `server` wires everything into an actix application.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod server;

/// Public OpenAPI surface used by tooling.
pub use doc::ApiDoc;
