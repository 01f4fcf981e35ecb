use async_trait::async_trait;

use crate::types::Embedding;

/// Best-effort embedding extraction from raw image bytes.
///
/// Side-effect-free. All failure modes (no face found, model error)
/// are represented uniformly as `None`; the caller records the
/// empty-vector marker against the stored image.
#[async_trait]
pub trait EmbeddingExtractor: Send + Sync {
    async fn extract(&self, image: &[u8]) -> Option<Embedding>;
}
