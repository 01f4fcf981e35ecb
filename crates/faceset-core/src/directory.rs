//! Person directory: create/read/update/delete and reporting.
//!
//! Everything is scoped by owner; a person belonging to another owner
//! is reported as absent, never as a distinct error.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::datauri;
use crate::error::Error;
use crate::store::{PersonFilter, PersonUpdate, ReferenceStore};
use crate::types::{
    FaceImageView, OwnerStats, PersonCreate, PersonDetail, PersonDoc, PersonPatch, PersonSummary,
};

const RECENT_WINDOW_DAYS: i64 = 7;

#[derive(Clone)]
pub struct PersonDirectory {
    store: Arc<dyn ReferenceStore>,
}

impl PersonDirectory {
    pub fn new(store: Arc<dyn ReferenceStore>) -> Self {
        Self { store }
    }

    /// Create a person with an empty face set.
    pub async fn create(
        &self,
        owner_id: &str,
        input: PersonCreate,
    ) -> Result<PersonSummary, Error> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::Validation("person name is required".to_string()));
        }

        let now = Utc::now();
        let doc = PersonDoc {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            name,
            description: input.description,
            department: input.department,
            employee_id: input.employee_id,
            position: input.position,
            access_level: input.access_level,
            metadata: input.metadata,
            active: true,
            created_at: now,
            updated_at: now,
            faces: Vec::new(),
        };
        self.store.insert_one(doc.clone()).await?;

        tracing::info!(person = %doc.id, owner = %owner_id, "person created");
        Ok(PersonSummary::from_doc(&doc))
    }

    pub async fn get(
        &self,
        person_id: &str,
        owner_id: &str,
    ) -> Result<Option<PersonSummary>, Error> {
        Ok(self
            .store
            .find_one(person_id, owner_id)
            .await?
            .map(|doc| PersonSummary::from_doc(&doc)))
    }

    /// All persons for an owner, newest first. Inactive records are
    /// hidden unless requested.
    pub async fn list(
        &self,
        owner_id: &str,
        include_inactive: bool,
    ) -> Result<Vec<PersonSummary>, Error> {
        Ok(self
            .store
            .find_sorted(owner_id, include_inactive)
            .await?
            .iter()
            .map(PersonSummary::from_doc)
            .collect())
    }

    /// Apply a partial update and return the refreshed record, or
    /// `None` if the person does not exist for this owner.
    pub async fn update(
        &self,
        person_id: &str,
        owner_id: &str,
        mut patch: PersonPatch,
    ) -> Result<Option<PersonSummary>, Error> {
        if let Some(name) = patch.name.take() {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(Error::Validation("person name is required".to_string()));
            }
            patch.name = Some(name);
        }

        if patch.is_empty() {
            // Nothing to change; mirror the current record back.
            return self.get(person_id, owner_id).await;
        }

        let updated = self
            .store
            .update_one(
                person_id,
                owner_id,
                PersonUpdate::Fields {
                    patch,
                    updated_at: Utc::now(),
                },
            )
            .await?;
        if !updated {
            return Ok(None);
        }

        tracing::info!(person = %person_id, "person updated");
        self.get(person_id, owner_id).await
    }

    /// Soft-delete (default) retains the record with `active=false`;
    /// hard delete erases it from the store.
    pub async fn delete(
        &self,
        person_id: &str,
        owner_id: &str,
        hard: bool,
    ) -> Result<bool, Error> {
        let removed = if hard {
            self.store.delete_one(person_id, owner_id).await?
        } else {
            self.store
                .update_one(
                    person_id,
                    owner_id,
                    PersonUpdate::Deactivate {
                        updated_at: Utc::now(),
                    },
                )
                .await?
        };
        if removed {
            tracing::info!(person = %person_id, hard, "person deleted");
        }
        Ok(removed)
    }

    /// Full detail view. Stored images are always served as data URIs;
    /// bare base64 payloads are re-wrapped as JPEG.
    pub async fn detail(
        &self,
        person_id: &str,
        owner_id: &str,
    ) -> Result<Option<PersonDetail>, Error> {
        let Some(doc) = self.store.find_one(person_id, owner_id).await? else {
            return Ok(None);
        };

        let face_images = doc
            .faces
            .iter()
            .map(|f| FaceImageView {
                image_url: datauri::wrap_jpeg(&f.image),
                uploaded_at: doc.created_at,
            })
            .collect();

        Ok(Some(PersonDetail {
            id: doc.id,
            name: doc.name,
            description: doc.description,
            metadata: doc.metadata,
            active: doc.active,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
            face_images,
        }))
    }

    /// Aggregate enrollment statistics for one owner.
    pub async fn statistics(&self, owner_id: &str) -> Result<OwnerStats, Error> {
        let total_persons = self
            .store
            .count_documents(
                owner_id,
                PersonFilter {
                    active: Some(true),
                    ..Default::default()
                },
            )
            .await?;
        let inactive_persons = self
            .store
            .count_documents(
                owner_id,
                PersonFilter {
                    active: Some(false),
                    ..Default::default()
                },
            )
            .await?;

        let mut total_face_images = 0u64;
        for doc in self.store.find_sorted(owner_id, false).await? {
            total_face_images += doc.faces.len() as u64;
        }

        let recent_persons = self
            .store
            .count_documents(
                owner_id,
                PersonFilter {
                    created_after: Some(Utc::now() - Duration::days(RECENT_WINDOW_DAYS)),
                    ..Default::default()
                },
            )
            .await?;

        let average_images_per_person = if total_persons > 0 {
            total_face_images as f64 / total_persons as f64
        } else {
            0.0
        };

        Ok(OwnerStats {
            total_persons,
            inactive_persons,
            total_face_images,
            average_images_per_person,
            recent_persons,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{Embedding, FaceSample, Metadata};

    fn directory() -> (Arc<MemoryStore>, PersonDirectory) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), PersonDirectory::new(store))
    }

    fn named(name: &str) -> PersonCreate {
        PersonCreate {
            name: name.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_trims_name_and_rejects_empty() {
        let (_, dir) = directory();

        let person = dir.create("u1", named("  Alice  ")).await.unwrap();
        assert_eq!(person.name, "Alice");
        assert!(person.active);
        assert_eq!(person.face_image_count, 0);

        let err = dir.create("u1", named("   ")).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn get_is_owner_scoped() {
        let (_, dir) = directory();
        let person = dir.create("u1", named("Alice")).await.unwrap();

        assert!(dir.get(&person.id, "u1").await.unwrap().is_some());
        assert!(dir.get(&person.id, "u2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_applies_patch_and_returns_fresh_record() {
        let (_, dir) = directory();
        let person = dir.create("u1", named("Alice")).await.unwrap();

        let updated = dir
            .update(
                &person.id,
                "u1",
                PersonPatch {
                    description: Some("front desk".into()),
                    department: Some("reception".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.description.as_deref(), Some("front desk"));
        assert_eq!(updated.department.as_deref(), Some("reception"));
        assert_eq!(updated.name, "Alice");

        // unknown person
        assert!(dir
            .update("ghost", "u1", PersonPatch::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn empty_patch_reads_back_without_mutating() {
        let (store, dir) = directory();
        let person = dir.create("u1", named("Alice")).await.unwrap();
        let before = store.find_one(&person.id, "u1").await.unwrap().unwrap().updated_at;

        let echoed = dir
            .update(&person.id, "u1", PersonPatch::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(echoed.id, person.id);

        let after = store.find_one(&person.id, "u1").await.unwrap().unwrap().updated_at;
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn soft_delete_hides_hard_delete_erases() {
        let (store, dir) = directory();
        let a = dir.create("u1", named("Alice")).await.unwrap();
        let b = dir.create("u1", named("Bob")).await.unwrap();

        assert!(dir.delete(&a.id, "u1", false).await.unwrap());
        let visible = dir.list("u1", false).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, b.id);
        // record retained
        assert_eq!(dir.list("u1", true).await.unwrap().len(), 2);

        assert!(dir.delete(&b.id, "u1", true).await.unwrap());
        assert!(store.find_one(&b.id, "u1").await.unwrap().is_none());

        // deleting someone else's person fails quietly
        assert!(!dir.delete(&a.id, "u2", true).await.unwrap());
    }

    #[tokio::test]
    async fn detail_wraps_bare_base64_as_jpeg_uri() {
        let (store, dir) = directory();
        let person = dir.create("u1", named("Alice")).await.unwrap();

        let mut doc = store.find_one(&person.id, "u1").await.unwrap().unwrap();
        doc.faces = vec![
            FaceSample { image: "AAAA".into(), embedding: Embedding::empty() },
            FaceSample {
                image: "data:image/png;base64,BBBB".into(),
                embedding: Embedding::empty(),
            },
        ];
        store.insert_one(doc).await.unwrap();

        let detail = dir.detail(&person.id, "u1").await.unwrap().unwrap();
        assert_eq!(detail.face_images[0].image_url, "data:image/jpeg;base64,AAAA");
        assert_eq!(detail.face_images[1].image_url, "data:image/png;base64,BBBB");
    }

    #[tokio::test]
    async fn statistics_aggregate_per_owner() {
        let (store, dir) = directory();
        let a = dir.create("u1", named("Alice")).await.unwrap();
        let b = dir.create("u1", named("Bob")).await.unwrap();
        dir.create("u2", named("Mallory")).await.unwrap();
        dir.delete(&b.id, "u1", false).await.unwrap();

        let mut doc = store.find_one(&a.id, "u1").await.unwrap().unwrap();
        doc.faces = (0..3)
            .map(|i| FaceSample {
                image: format!("img{i}"),
                embedding: Embedding::empty(),
            })
            .collect();
        store.insert_one(doc).await.unwrap();

        let stats = dir.statistics("u1").await.unwrap();
        assert_eq!(stats.total_persons, 1);
        assert_eq!(stats.inactive_persons, 1);
        assert_eq!(stats.total_face_images, 3);
        assert!((stats.average_images_per_person - 3.0).abs() < f64::EPSILON);
        assert_eq!(stats.recent_persons, 2);

        let empty = dir.statistics("u3").await.unwrap();
        assert_eq!(empty.total_persons, 0);
        assert_eq!(empty.average_images_per_person, 0.0);
    }

    #[tokio::test]
    async fn metadata_round_trips_through_create() {
        let (_, dir) = directory();
        let mut metadata = Metadata::new();
        metadata.insert("badge".into(), serde_json::json!("A-113"));

        let person = dir
            .create(
                "u1",
                PersonCreate {
                    name: "Alice".into(),
                    description: Some("night shift".into()),
                    department: Some("security".into()),
                    metadata,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(person.metadata.get("badge"), Some(&serde_json::json!("A-113")));
        assert_eq!(person.department.as_deref(), Some("security"));
    }
}
