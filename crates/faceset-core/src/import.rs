//! Bulk enrollment import with per-item failure isolation.
//!
//! Each record is processed independently: a person that fails to
//! create, or an image that fails to add, becomes an error entry and
//! processing continues with the next image/record. Nothing inside an
//! import can abort a sibling.

use crate::directory::PersonDirectory;
use crate::manager::FaceSetManager;
use crate::types::{BulkOutcome, Metadata, PersonCreate, PersonImportRecord};

pub struct BulkImporter {
    directory: PersonDirectory,
    faces: FaceSetManager,
}

impl BulkImporter {
    pub fn new(directory: PersonDirectory, faces: FaceSetManager) -> Self {
        Self { directory, faces }
    }

    /// Import records in input order; images within a record are added
    /// in input order, so their indices equal their positions in the
    /// record (for a freshly created person).
    pub async fn import(
        &self,
        records: Vec<PersonImportRecord>,
        owner_id: &str,
    ) -> BulkOutcome {
        let total = records.len();
        let mut imported = 0usize;
        let mut failed = 0usize;
        let mut errors = Vec::new();

        for record in records {
            let PersonImportRecord {
                name,
                description,
                metadata,
                face_images,
            } = record;
            tracing::debug!(name = %name, "importing person");

            let create = PersonCreate {
                name: name.clone(),
                description,
                department: meta_str(&metadata, "department"),
                employee_id: meta_str(&metadata, "employee_id"),
                position: meta_str(&metadata, "position"),
                access_level: meta_str(&metadata, "access_level"),
                metadata,
            };

            let person = match self.directory.create(owner_id, create).await {
                Ok(person) => person,
                Err(err) => {
                    failed += 1;
                    errors.push(format!("failed to import {name}: {err}"));
                    continue;
                }
            };

            for image in &face_images {
                if let Err(err) = self.faces.add_image(&person.id, owner_id, image).await {
                    // The person stays imported; only the bad image is reported.
                    errors.push(format!("failed to add face image for {name}: {err}"));
                }
            }

            imported += 1;
        }

        tracing::info!(imported, failed, total, "bulk import finished");

        BulkOutcome {
            success: failed == 0,
            imported_count: imported,
            failed_count: failed,
            errors,
        }
    }
}

/// Lift a string-valued classification field out of the free-form metadata.
fn meta_str(metadata: &Metadata, key: &str) -> Option<String> {
    metadata.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::EmbeddingExtractor;
    use crate::store::{MemoryStore, ReferenceStore};
    use crate::types::Embedding;
    use async_trait::async_trait;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use std::io::Cursor;
    use std::sync::Arc;

    struct StubExtractor;

    #[async_trait]
    impl EmbeddingExtractor for StubExtractor {
        async fn extract(&self, _image: &[u8]) -> Option<Embedding> {
            Some(Embedding(vec![0.5; 4]))
        }
    }

    fn png_base64() -> String {
        let img = image::RgbImage::from_pixel(1, 1, image::Rgb([0u8, 0, 0]));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        STANDARD.encode(buf)
    }

    fn importer() -> (Arc<MemoryStore>, PersonDirectory, BulkImporter) {
        let store = Arc::new(MemoryStore::new());
        let directory = PersonDirectory::new(store.clone());
        let faces = FaceSetManager::new(store.clone(), Arc::new(StubExtractor));
        let importer = BulkImporter::new(directory.clone(), faces);
        (store, directory, importer)
    }

    fn record(name: &str, images: Vec<String>) -> PersonImportRecord {
        PersonImportRecord {
            name: name.into(),
            description: None,
            metadata: Metadata::new(),
            face_images: images,
        }
    }

    #[tokio::test]
    async fn clean_import_counts_everyone() {
        let (_, directory, importer) = importer();
        let records = vec![
            record("Alice", vec![png_base64(), png_base64()]),
            record("Bob", vec![png_base64()]),
        ];

        let outcome = importer.import(records, "u1").await;
        assert!(outcome.success);
        assert_eq!(outcome.imported_count, 2);
        assert_eq!(outcome.failed_count, 0);
        assert!(outcome.errors.is_empty());

        let people = directory.list("u1", false).await.unwrap();
        assert_eq!(people.len(), 2);
        let counts: Vec<usize> = {
            let mut p = people.clone();
            p.sort_by(|a, b| a.name.cmp(&b.name));
            p.iter().map(|s| s.face_image_count).collect()
        };
        assert_eq!(counts, vec![2, 1]);
    }

    #[tokio::test]
    async fn one_bad_image_does_not_block_its_person_or_siblings() {
        let (_, directory, importer) = importer();
        let records = vec![
            record("Alice", vec![png_base64()]),
            record("Bob", vec!["%%not-base64%%".into(), png_base64()]),
            record("Carol", vec![png_base64()]),
        ];

        let outcome = importer.import(records, "u1").await;
        // person creation still succeeds for every record
        assert_eq!(outcome.imported_count, 3);
        assert_eq!(outcome.failed_count, 0);
        assert!(outcome.success);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("Bob"));

        let mut people = directory.list("u1", false).await.unwrap();
        people.sort_by(|a, b| a.name.cmp(&b.name));
        let counts: Vec<usize> = people.iter().map(|s| s.face_image_count).collect();
        assert_eq!(counts, vec![1, 1, 1]);
    }

    #[tokio::test]
    async fn person_creation_failure_is_isolated_and_counted() {
        let (_, directory, importer) = importer();
        let records = vec![
            record("Alice", vec![]),
            record("   ", vec![png_base64()]),
            record("Carol", vec![]),
        ];

        let outcome = importer.import(records, "u1").await;
        assert!(!outcome.success);
        assert_eq!(outcome.imported_count, 2);
        assert_eq!(outcome.failed_count, 1);
        assert_eq!(outcome.errors.len(), 1);

        assert_eq!(directory.list("u1", false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn images_land_at_their_input_positions() {
        let (store, directory, importer) = importer();
        // three distinct valid images
        let images: Vec<String> = (0..3u8)
            .map(|v| {
                let img = image::RgbImage::from_pixel(1, 1, image::Rgb([v, v, v]));
                let mut buf = Vec::new();
                img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
                    .unwrap();
                STANDARD.encode(buf)
            })
            .collect();

        let outcome = importer.import(vec![record("Alice", images.clone())], "u1").await;
        assert!(outcome.success);

        let person = &directory.list("u1", false).await.unwrap()[0];
        let doc = store.find_one(&person.id, "u1").await.unwrap().unwrap();
        let stored: Vec<String> = doc.images().map(str::to_string).collect();
        assert_eq!(stored, images);
    }

    #[tokio::test]
    async fn classification_fields_are_lifted_from_metadata() {
        let (_, directory, importer) = importer();
        let mut metadata = Metadata::new();
        metadata.insert("department".into(), serde_json::json!("security"));
        metadata.insert("employee_id".into(), serde_json::json!("E-42"));

        let records = vec![PersonImportRecord {
            name: "Alice".into(),
            description: Some("imported".into()),
            metadata,
            face_images: Vec::new(),
        }];

        importer.import(records, "u1").await;
        let person = &directory.list("u1", false).await.unwrap()[0];
        assert_eq!(person.department.as_deref(), Some("security"));
        assert_eq!(person.employee_id.as_deref(), Some("E-42"));
        // the original metadata is retained verbatim as well
        assert_eq!(person.metadata.get("department"), Some(&serde_json::json!("security")));
    }
}
