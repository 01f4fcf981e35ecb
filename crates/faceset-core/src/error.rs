use thiserror::Error;

use crate::store::StoreError;

/// Failure modes of the enrollment core.
///
/// Embedding-extraction failure is deliberately absent: a missing
/// embedding is recorded as the empty-vector marker on the stored
/// sample, not raised to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// No person matches the `(person_id, owner_id)` pair. An owner
    /// mismatch reports this same variant, indistinguishable from
    /// nonexistence.
    #[error("person not found")]
    NotFound,

    /// Malformed base64 payload or data-URI header.
    #[error("invalid base64 payload: {0}")]
    Decode(String),

    /// Payload bytes do not decode to a real image.
    #[error("invalid image data: {0}")]
    InvalidImage(String),

    /// The person has no stored face images to operate on.
    #[error("person has no stored face images")]
    NoImages,

    /// A required field is missing or malformed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The backing store is unreachable or a write failed.
    #[error("store: {0}")]
    Store(#[from] StoreError),
}
