pub mod chunking;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod generation;
pub mod ingest;
pub mod loader;
pub mod models;
pub mod provenance;
pub mod stores;
pub mod traits;

pub use chunking::{chunk_articles, split_text, ChunkingConfig};
pub use embeddings::{Embedder, OllamaEmbedder};
pub use engine::{QueryEngine, DEFAULT_TOP_K};
pub use error::{IngestError, ServiceError};
pub use generation::{ChatModel, OllamaChatModel};
pub use ingest::{ingest_corpus, IngestionReport};
pub use loader::{discover_article_files, load_articles, CorpusReport, SkippedFile};
pub use models::{
    Answer, Article, ArticleChunk, ChatRole, ConversationTurn, IngestionOptions, ScoredChunk,
};
pub use provenance::ProvenanceRewriter;
pub use stores::PineconeStore;
pub use traits::VectorIndex;
