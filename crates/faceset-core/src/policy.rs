//! Minimum-sample enrollment policy.
//!
//! A person is recognition-ready once enough reference images are
//! stored. Readiness is derived from the current image count on every
//! query, never stored.

use std::sync::Arc;

use crate::error::Error;
use crate::store::ReferenceStore;
use crate::types::ReadinessReport;

/// Minimum stored reference images before a person is
/// recognition-ready.
pub const MIN_REFERENCE_IMAGES: usize = 8;

/// Readiness gate over the person store. Pure reads, no mutation.
#[derive(Clone)]
pub struct EnrollmentPolicy {
    store: Arc<dyn ReferenceStore>,
    required: usize,
}

impl EnrollmentPolicy {
    pub fn new(store: Arc<dyn ReferenceStore>) -> Self {
        Self::with_required(store, MIN_REFERENCE_IMAGES)
    }

    /// Override the required count (configuration hook); the default
    /// policy is [`MIN_REFERENCE_IMAGES`].
    pub fn with_required(store: Arc<dyn ReferenceStore>, required: usize) -> Self {
        Self { store, required }
    }

    pub fn required(&self) -> usize {
        self.required
    }

    /// Report whether the person has enough reference images.
    pub async fn check_minimum(
        &self,
        person_id: &str,
        owner_id: &str,
    ) -> Result<ReadinessReport, Error> {
        let person = self
            .store
            .find_one(person_id, owner_id)
            .await?
            .ok_or(Error::NotFound)?;

        let current = person.faces.len();
        Ok(ReadinessReport {
            ready: current >= self.required,
            current,
            required: self.required,
            remaining: self.required.saturating_sub(current),
        })
    }
}
