//! Storage seam for person documents.
//!
//! The store is an external collaborator with per-document atomic
//! updates. Every mutating operation in this crate maps to exactly one
//! [`ReferenceStore::update_one`] call, so the store's atomicity — not
//! application-level locking — is the sole concurrency-safety
//! mechanism. Concurrent writers to the same person are
//! last-writer-wins on whole-sequence replacement; [`PersonUpdate::PushFace`]
//! is append-only and safe under that race.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::{Embedding, FaceSample, PersonDoc, PersonPatch};

/// Backing-store failure, surfaced to callers as a generic fault.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend: {0}")]
    Backend(String),
    #[error("document serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Typed single-document update.
///
/// Replaces the document database's dynamic `$set`/`$push` documents
/// with a closed set of mutations. Every variant carries the new
/// `updated_at` so the timestamp bump rides the same atomic write.
#[derive(Debug, Clone)]
pub enum PersonUpdate {
    /// Apply a partial field patch.
    Fields {
        patch: PersonPatch,
        updated_at: DateTime<Utc>,
    },
    /// Append one face sample (image plus its embedding slot).
    PushFace {
        face: FaceSample,
        updated_at: DateTime<Utc>,
    },
    /// Replace every embedding slot, preserving the stored images.
    ReplaceEmbeddings {
        embeddings: Vec<Embedding>,
        updated_at: DateTime<Utc>,
    },
    /// Replace the whole face set.
    ReplaceFaces {
        faces: Vec<FaceSample>,
        updated_at: DateTime<Utc>,
    },
    /// Soft-delete: clear the active flag.
    Deactivate { updated_at: DateTime<Utc> },
}

impl PersonUpdate {
    /// Apply this update to a loaded document.
    ///
    /// Shared by store implementations that realize per-document
    /// atomicity as a read-modify-write inside a single transaction.
    pub fn apply(self, doc: &mut PersonDoc) {
        match self {
            PersonUpdate::Fields { patch, updated_at } => {
                if let Some(name) = patch.name {
                    doc.name = name;
                }
                if let Some(description) = patch.description {
                    doc.description = Some(description);
                }
                if let Some(department) = patch.department {
                    doc.department = Some(department);
                }
                if let Some(employee_id) = patch.employee_id {
                    doc.employee_id = Some(employee_id);
                }
                if let Some(position) = patch.position {
                    doc.position = Some(position);
                }
                if let Some(access_level) = patch.access_level {
                    doc.access_level = Some(access_level);
                }
                if let Some(metadata) = patch.metadata {
                    doc.metadata = metadata;
                }
                if let Some(active) = patch.active {
                    doc.active = active;
                }
                doc.updated_at = updated_at;
            }
            PersonUpdate::PushFace { face, updated_at } => {
                doc.faces.push(face);
                doc.updated_at = updated_at;
            }
            PersonUpdate::ReplaceEmbeddings {
                embeddings,
                updated_at,
            } => {
                // Slot count always tracks the stored images: shorter
                // input pads with the empty marker, longer input is
                // truncated. Callers build the sequence from the same
                // document, so a mismatch only appears under a
                // concurrent-writer race.
                for (i, slot) in doc.faces.iter_mut().enumerate() {
                    slot.embedding = embeddings.get(i).cloned().unwrap_or_default();
                }
                doc.updated_at = updated_at;
            }
            PersonUpdate::ReplaceFaces { faces, updated_at } => {
                doc.faces = faces;
                doc.updated_at = updated_at;
            }
            PersonUpdate::Deactivate { updated_at } => {
                doc.active = false;
                doc.updated_at = updated_at;
            }
        }
    }
}

/// Owner-scoped filter for counting queries.
#[derive(Debug, Clone, Default)]
pub struct PersonFilter {
    pub active: Option<bool>,
    pub created_after: Option<DateTime<Utc>>,
}

/// Document store for person records.
///
/// Every method is scoped by `(person_id, owner_id)`; an owner
/// mismatch behaves exactly like a missing document. Each mutating
/// call must apply as one atomic per-document update.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    async fn insert_one(&self, doc: PersonDoc) -> Result<(), StoreError>;

    async fn find_one(
        &self,
        person_id: &str,
        owner_id: &str,
    ) -> Result<Option<PersonDoc>, StoreError>;

    /// Returns `false` when no matching document exists.
    async fn update_one(
        &self,
        person_id: &str,
        owner_id: &str,
        update: PersonUpdate,
    ) -> Result<bool, StoreError>;

    async fn delete_one(&self, person_id: &str, owner_id: &str) -> Result<bool, StoreError>;

    async fn count_documents(
        &self,
        owner_id: &str,
        filter: PersonFilter,
    ) -> Result<u64, StoreError>;

    /// All documents for an owner, newest first.
    async fn find_sorted(
        &self,
        owner_id: &str,
        include_inactive: bool,
    ) -> Result<Vec<PersonDoc>, StoreError>;
}
