//! Face-reference-set manager.
//!
//! Owns the consistency between each person's stored images and their
//! embedding slots under insertion, removal, re-derivation, and
//! validation. Every mutation is persisted through a single atomic
//! store update; the image/embedding pairing is structural (see
//! [`FaceSample`]), so the sequences can never be observed misaligned.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;

use crate::datauri;
use crate::error::Error;
use crate::extractor::EmbeddingExtractor;
use crate::policy::MIN_REFERENCE_IMAGES;
use crate::store::{PersonUpdate, ReferenceStore};
use crate::types::{AddImageOutcome, Embedding, FaceSample, RegenOutcome, ValidationOutcome};

/// Strip any data-URI header and decode the base64 payload.
///
/// Returns the bare payload (as stored) together with the decoded
/// bytes. Empty payloads and payloads decoding to zero bytes are
/// rejected alongside malformed base64.
fn decode_payload(input: &str) -> Result<(String, Vec<u8>), Error> {
    let payload = datauri::strip(input)?;
    if payload.trim().is_empty() {
        return Err(Error::Decode("empty base64 payload".to_string()));
    }
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| Error::Decode(e.to_string()))?;
    if bytes.is_empty() {
        return Err(Error::Decode("payload decoded to zero bytes".to_string()));
    }
    Ok((payload.to_string(), bytes))
}

/// Codec gate: the bytes must decode to a real image before they are
/// accepted as a reference sample.
fn validate_image_bytes(bytes: &[u8]) -> Result<(), Error> {
    image::load_from_memory(bytes)
        .map(|_| ())
        .map_err(|e| Error::InvalidImage(e.to_string()))
}

/// Manager for a person's reference face set.
///
/// Holds injected store and extractor handles; construct one per
/// process (or per request) — there is no global instance.
#[derive(Clone)]
pub struct FaceSetManager {
    store: Arc<dyn ReferenceStore>,
    extractor: Arc<dyn EmbeddingExtractor>,
}

impl FaceSetManager {
    pub fn new(store: Arc<dyn ReferenceStore>, extractor: Arc<dyn EmbeddingExtractor>) -> Self {
        Self { store, extractor }
    }

    /// Validate and append one reference image.
    ///
    /// The payload is stripped of any data-URI header, decoded, and
    /// gated through the image codec. Extraction failure is not fatal:
    /// the image is stored with an empty embedding slot. The append is
    /// one atomic store update.
    pub async fn add_image(
        &self,
        person_id: &str,
        owner_id: &str,
        image_base64: &str,
    ) -> Result<AddImageOutcome, Error> {
        let (payload, bytes) = decode_payload(image_base64)?;
        validate_image_bytes(&bytes)?;

        let person = self
            .store
            .find_one(person_id, owner_id)
            .await?
            .ok_or(Error::NotFound)?;
        let prior_count = person.faces.len();

        let embedding = self.extractor.extract(&bytes).await.unwrap_or_default();
        let extracted = !embedding.is_empty();
        let dim = embedding.dim();
        if !extracted {
            tracing::warn!(
                person = %person_id,
                "no embedding extracted; storing image with empty slot"
            );
        }

        let updated = self
            .store
            .update_one(
                person_id,
                owner_id,
                PersonUpdate::PushFace {
                    face: FaceSample { image: payload, embedding },
                    updated_at: Utc::now(),
                },
            )
            .await?;
        if !updated {
            // Person vanished between the read and the write.
            return Err(Error::NotFound);
        }

        tracing::info!(
            person = %person_id,
            index = prior_count,
            total = prior_count + 1,
            embedding = extracted,
            "face image added"
        );

        Ok(AddImageOutcome {
            image_index: prior_count,
            total_images: prior_count + 1,
            embedding_extracted: extracted,
            embedding_dim: dim,
        })
    }

    /// Remove the image (and its embedding slot) at `index`.
    ///
    /// A missing person or out-of-range index returns `Ok(false)`.
    /// Removal always takes the image/embedding pair at the same
    /// index; the pairing is structural so there is no separate
    /// embedding sequence to fall out of step.
    pub async fn remove_image(
        &self,
        person_id: &str,
        owner_id: &str,
        index: usize,
    ) -> Result<bool, Error> {
        let Some(mut person) = self.store.find_one(person_id, owner_id).await? else {
            return Ok(false);
        };
        if index >= person.faces.len() {
            return Ok(false);
        }

        person.faces.remove(index);
        let updated = self
            .store
            .update_one(
                person_id,
                owner_id,
                PersonUpdate::ReplaceFaces {
                    faces: person.faces,
                    updated_at: Utc::now(),
                },
            )
            .await?;
        if updated {
            tracing::info!(person = %person_id, index, "face image removed");
        }
        Ok(updated)
    }

    /// Re-derive the embedding for every stored image from scratch.
    ///
    /// Each image is processed independently: a bad sample or a failed
    /// extraction records an empty slot and never aborts the batch.
    /// The replacement sequence always has exactly one entry per
    /// stored image, in order, and is persisted in one atomic update.
    pub async fn regenerate_embeddings(
        &self,
        person_id: &str,
        owner_id: &str,
    ) -> Result<RegenOutcome, Error> {
        let person = self
            .store
            .find_one(person_id, owner_id)
            .await?
            .ok_or(Error::NotFound)?;
        if person.faces.is_empty() {
            return Err(Error::NoImages);
        }

        let total = person.faces.len();
        let mut embeddings = Vec::with_capacity(total);
        let mut successful = 0usize;
        let mut failed = 0usize;

        for (i, face) in person.faces.iter().enumerate() {
            let bytes = match decode_payload(&face.image) {
                Ok((_, bytes)) => bytes,
                Err(err) => {
                    tracing::warn!(
                        person = %person_id,
                        index = i,
                        error = %err,
                        "stored image not decodable; recording empty slot"
                    );
                    embeddings.push(Embedding::empty());
                    failed += 1;
                    continue;
                }
            };

            match self.extractor.extract(&bytes).await {
                Some(embedding) if !embedding.is_empty() => {
                    successful += 1;
                    embeddings.push(embedding);
                }
                _ => {
                    tracing::warn!(
                        person = %person_id,
                        index = i,
                        "extraction failed; recording empty slot"
                    );
                    embeddings.push(Embedding::empty());
                    failed += 1;
                }
            }
            tracing::debug!(person = %person_id, index = i, total, "regenerate: image processed");
        }

        let updated = self
            .store
            .update_one(
                person_id,
                owner_id,
                PersonUpdate::ReplaceEmbeddings {
                    embeddings,
                    updated_at: Utc::now(),
                },
            )
            .await?;
        if !updated {
            return Err(Error::NotFound);
        }

        tracing::info!(
            person = %person_id,
            successful,
            failed,
            total,
            "embeddings regenerated"
        );

        Ok(RegenOutcome {
            total_images: total,
            successful,
            failed,
        })
    }

    /// Scan all stored images and drop the ones that no longer decode.
    ///
    /// Invalid samples are removed at their original indices (image
    /// and embedding slot together). The filtered set is persisted
    /// only when something was actually dropped.
    pub async fn validate_images(
        &self,
        person_id: &str,
        owner_id: &str,
    ) -> Result<ValidationOutcome, Error> {
        let person = self
            .store
            .find_one(person_id, owner_id)
            .await?
            .ok_or(Error::NotFound)?;

        let mut kept = Vec::with_capacity(person.faces.len());
        let mut invalid_indices = Vec::new();

        for (i, face) in person.faces.into_iter().enumerate() {
            let ok = match decode_payload(&face.image) {
                Ok((_, bytes)) => validate_image_bytes(&bytes).is_ok(),
                Err(_) => false,
            };
            if ok {
                kept.push(face);
            } else {
                invalid_indices.push(i);
            }
        }

        let valid = kept.len();
        let invalid = invalid_indices.len();

        if invalid > 0 {
            let updated = self
                .store
                .update_one(
                    person_id,
                    owner_id,
                    PersonUpdate::ReplaceFaces {
                        faces: kept,
                        updated_at: Utc::now(),
                    },
                )
                .await?;
            if !updated {
                return Err(Error::NotFound);
            }
            tracing::info!(
                person = %person_id,
                dropped = invalid,
                remaining = valid,
                "invalid face images removed"
            );
        }

        Ok(ValidationOutcome {
            valid_images: valid,
            invalid_images: invalid,
            invalid_indices,
            meets_minimum: valid >= MIN_REFERENCE_IMAGES,
        })
    }
}
