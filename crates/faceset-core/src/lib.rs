//! faceset-core — reference-set management for face enrollment.
//!
//! Keeps each enrolled person's stored reference images and their
//! derived embeddings mutually consistent under insertion, removal,
//! bulk import, and re-derivation, and answers recognition-readiness
//! queries against a minimum-sample policy.
//!
//! The persistent store and the embedding extractor are injected
//! through the [`ReferenceStore`] and [`EmbeddingExtractor`] traits;
//! this crate owns only the consistency logic between them.

pub mod config;
pub mod datauri;
pub mod directory;
pub mod error;
pub mod extractor;
pub mod import;
pub mod manager;
pub mod policy;
pub mod store;
pub mod types;

pub use config::Config;
pub use directory::PersonDirectory;
pub use error::Error;
pub use extractor::EmbeddingExtractor;
pub use import::BulkImporter;
pub use manager::FaceSetManager;
pub use policy::{EnrollmentPolicy, MIN_REFERENCE_IMAGES};
pub use store::{MemoryStore, PersonFilter, PersonUpdate, ReferenceStore, StoreError};
pub use types::{Embedding, FaceSample, PersonDoc};
