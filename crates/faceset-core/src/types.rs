use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-form key/value metadata attached to a person.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Face embedding vector.
///
/// An empty vector is the placeholder for "image stored, no valid
/// embedding extracted" — distinct from a missing image, which cannot
/// occur because images and embedding slots live in the same record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    /// The "extraction failed / not yet attempted" marker.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }
}

/// One stored reference image and its derived embedding slot.
///
/// Pairing the two in a single record makes the images/embeddings
/// alignment invariant structural: the sequences cannot drift apart
/// under insertion or removal, because removal always takes the pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceSample {
    /// Bare base64 payload; any data-URI header is stripped before storage.
    pub image: String,
    pub embedding: Embedding,
}

/// Person document as persisted by a [`ReferenceStore`](crate::ReferenceStore).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonDoc {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub department: Option<String>,
    pub employee_id: Option<String>,
    pub position: Option<String>,
    pub access_level: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    /// Soft-delete marker; inactive records are retained but hidden
    /// from default listings.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub faces: Vec<FaceSample>,
}

impl PersonDoc {
    pub fn image_count(&self) -> usize {
        self.faces.len()
    }

    /// Storage-boundary view: bare base64 images in index order.
    pub fn images(&self) -> impl Iterator<Item = &str> {
        self.faces.iter().map(|f| f.image.as_str())
    }

    /// Storage-boundary view: embedding slots in index order.
    pub fn embeddings(&self) -> impl Iterator<Item = &Embedding> {
        self.faces.iter().map(|f| &f.embedding)
    }
}

/// Fields accepted when creating a person.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonCreate {
    pub name: String,
    pub description: Option<String>,
    pub department: Option<String>,
    pub employee_id: Option<String>,
    pub position: Option<String>,
    pub access_level: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Partial person update. `Some` fields are applied, `None` fields
/// are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub department: Option<String>,
    pub employee_id: Option<String>,
    pub position: Option<String>,
    pub access_level: Option<String>,
    pub metadata: Option<Metadata>,
    pub active: Option<bool>,
}

impl PersonPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.department.is_none()
            && self.employee_id.is_none()
            && self.position.is_none()
            && self.access_level.is_none()
            && self.metadata.is_none()
            && self.active.is_none()
    }
}

/// Summary view returned by list/create/update operations.
#[derive(Debug, Clone, Serialize)]
pub struct PersonSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub department: Option<String>,
    pub employee_id: Option<String>,
    pub position: Option<String>,
    pub access_level: Option<String>,
    pub metadata: Metadata,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub face_image_count: usize,
}

impl PersonSummary {
    pub(crate) fn from_doc(doc: &PersonDoc) -> Self {
        Self {
            id: doc.id.clone(),
            name: doc.name.clone(),
            description: doc.description.clone(),
            department: doc.department.clone(),
            employee_id: doc.employee_id.clone(),
            position: doc.position.clone(),
            access_level: doc.access_level.clone(),
            metadata: doc.metadata.clone(),
            active: doc.active,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
            face_image_count: doc.faces.len(),
        }
    }
}

/// Presentation view of one stored face image.
#[derive(Debug, Clone, Serialize)]
pub struct FaceImageView {
    /// Always a `data:image/...` URI; bare base64 is re-wrapped as JPEG.
    pub image_url: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Full person view including face images, for detail pages.
#[derive(Debug, Clone, Serialize)]
pub struct PersonDetail {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub metadata: Metadata,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub face_images: Vec<FaceImageView>,
}

/// Outcome of a single add-image operation.
#[derive(Debug, Clone, Serialize)]
pub struct AddImageOutcome {
    /// Index of the new image (= image count before the append).
    pub image_index: usize,
    pub total_images: usize,
    pub embedding_extracted: bool,
    /// Dimensionality of the attached embedding, 0 if none.
    pub embedding_dim: usize,
}

/// Outcome of re-deriving every embedding for a person.
#[derive(Debug, Clone, Serialize)]
pub struct RegenOutcome {
    pub total_images: usize,
    pub successful: usize,
    pub failed: usize,
}

/// Outcome of scanning a person's stored images for corruption.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationOutcome {
    pub valid_images: usize,
    pub invalid_images: usize,
    /// Original indices of the dropped images.
    pub invalid_indices: Vec<usize>,
    /// Whether the surviving count still meets the readiness threshold.
    pub meets_minimum: bool,
}

/// Recognition-readiness report for one person.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessReport {
    pub ready: bool,
    pub current: usize,
    pub required: usize,
    pub remaining: usize,
}

/// One record of a bulk import payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PersonImportRecord {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub face_images: Vec<String>,
}

/// Aggregate result of a bulk import.
#[derive(Debug, Clone, Serialize)]
pub struct BulkOutcome {
    /// True iff no person record failed to import. Image-level errors
    /// are reported in `errors` but do not clear this flag.
    pub success: bool,
    pub imported_count: usize,
    pub failed_count: usize,
    pub errors: Vec<String>,
}

/// Per-owner enrollment statistics.
#[derive(Debug, Clone, Serialize)]
pub struct OwnerStats {
    pub total_persons: u64,
    pub inactive_persons: u64,
    pub total_face_images: u64,
    pub average_images_per_person: f64,
    /// Persons created within the last 7 days.
    pub recent_persons: u64,
}
