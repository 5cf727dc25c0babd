use crate::chunking::chunk_articles;
use crate::embeddings::Embedder;
use crate::error::IngestError;
use crate::loader::{load_articles, SkippedFile};
use crate::models::{ArticleChunk, IngestionOptions};
use crate::provenance::ProvenanceRewriter;
use crate::traits::VectorIndex;
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::info;

pub struct IngestionReport {
    pub records_loaded: usize,
    pub chunks_indexed: usize,
    pub skipped_files: Vec<SkippedFile>,
    pub finished_at: DateTime<Utc>,
}

/// The offline ingestion pass: load the corpus, chunk it, rewrite provenance
/// to public URLs, embed in batches, and upsert everything into the index.
/// Per-file decode failures are reported, collaborator failures are fatal.
pub async fn ingest_corpus<E, V>(
    folder: &Path,
    options: &IngestionOptions,
    rewriter: &ProvenanceRewriter,
    embedder: &E,
    index: &V,
) -> Result<IngestionReport, IngestError>
where
    E: Embedder + Sync,
    V: VectorIndex + Sync,
{
    let corpus = load_articles(folder)?;
    let records_loaded = corpus.articles.len();

    let chunks = chunk_articles(&corpus.articles, options)?;
    let chunks: Vec<ArticleChunk> = chunks
        .into_iter()
        .map(|chunk| rewriter.rewrite_chunk(chunk))
        .collect();

    info!(
        records = records_loaded,
        chunks = chunks.len(),
        "corpus chunked"
    );

    let batch_size = options.embed_batch_size.max(1);
    let mut embeddings = Vec::with_capacity(chunks.len());

    for batch in chunks.chunks(batch_size) {
        let texts: Vec<String> = batch.iter().map(|chunk| chunk.content.clone()).collect();
        let vectors = embedder.embed_batch(&texts).await?;
        embeddings.extend(vectors);
    }

    index.upsert_chunks(&chunks, &embeddings).await?;

    Ok(IngestionReport {
        records_loaded,
        chunks_indexed: chunks.len(),
        skipped_files: corpus.skipped_files,
        finished_at: Utc::now(),
    })
}
