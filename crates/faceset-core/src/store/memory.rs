//! In-memory [`ReferenceStore`] used by tests and embedders.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{PersonFilter, PersonUpdate, ReferenceStore, StoreError};
use crate::types::PersonDoc;

/// HashMap-backed store.
///
/// Mutations hold the write lock across the whole read-modify-write,
/// which gives the same per-document atomicity the durable store
/// provides.
#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<HashMap<String, PersonDoc>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReferenceStore for MemoryStore {
    async fn insert_one(&self, doc: PersonDoc) -> Result<(), StoreError> {
        self.docs.write().await.insert(doc.id.clone(), doc);
        Ok(())
    }

    async fn find_one(
        &self,
        person_id: &str,
        owner_id: &str,
    ) -> Result<Option<PersonDoc>, StoreError> {
        Ok(self
            .docs
            .read()
            .await
            .get(person_id)
            .filter(|d| d.owner_id == owner_id)
            .cloned())
    }

    async fn update_one(
        &self,
        person_id: &str,
        owner_id: &str,
        update: PersonUpdate,
    ) -> Result<bool, StoreError> {
        let mut docs = self.docs.write().await;
        match docs.get_mut(person_id).filter(|d| d.owner_id == owner_id) {
            Some(doc) => {
                update.apply(doc);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_one(&self, person_id: &str, owner_id: &str) -> Result<bool, StoreError> {
        let mut docs = self.docs.write().await;
        match docs.get(person_id) {
            Some(doc) if doc.owner_id == owner_id => {
                docs.remove(person_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn count_documents(
        &self,
        owner_id: &str,
        filter: PersonFilter,
    ) -> Result<u64, StoreError> {
        let docs = self.docs.read().await;
        let count = docs
            .values()
            .filter(|d| d.owner_id == owner_id)
            .filter(|d| filter.active.map_or(true, |a| d.active == a))
            .filter(|d| filter.created_after.map_or(true, |t| d.created_at >= t))
            .count();
        Ok(count as u64)
    }

    async fn find_sorted(
        &self,
        owner_id: &str,
        include_inactive: bool,
    ) -> Result<Vec<PersonDoc>, StoreError> {
        let docs = self.docs.read().await;
        let mut out: Vec<PersonDoc> = docs
            .values()
            .filter(|d| d.owner_id == owner_id)
            .filter(|d| include_inactive || d.active)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }
}
