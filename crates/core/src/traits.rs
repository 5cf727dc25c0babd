use crate::error::ServiceError;
use crate::models::{ArticleChunk, ScoredChunk};
use async_trait::async_trait;

/// The narrow contract the pipeline owes the hosted vector index: persist
/// chunk/vector pairs, retrieve nearest neighbours. Upserts are idempotent
/// because vector ids are deterministic chunk ids.
#[async_trait]
pub trait VectorIndex {
    async fn upsert_chunks(
        &self,
        chunks: &[ArticleChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), ServiceError>;

    async fn similarity_search(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, ServiceError>;
}
