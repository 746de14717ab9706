//! Driven adapters: persistence and blob storage.

pub mod images;
pub mod persistence;
