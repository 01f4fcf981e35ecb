//! faceset-store — durable person document store on SQLite.
//!
//! Implements the [`faceset_core::ReferenceStore`] seam with one row
//! per person and JSON-encoded metadata and face-set columns.

pub mod sqlite;

pub use sqlite::SqliteStore;
