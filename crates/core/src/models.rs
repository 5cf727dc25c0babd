use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One successfully decoded corpus file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub content: String,
    pub origin: String,
}

/// A bounded-length slice of an article, the unit of indexing and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArticleChunk {
    pub chunk_id: String,
    pub content: String,
    pub origin: String,
    pub sequence_index: u64,
}

impl ArticleChunk {
    /// Chunk ids are a digest of origin, position, and content, so
    /// re-ingesting an unchanged corpus upserts the same ids.
    pub fn new(content: String, origin: String, sequence_index: u64) -> Self {
        let chunk_id = make_chunk_id(&origin, sequence_index, &content);
        Self {
            chunk_id,
            content,
            origin,
            sequence_index,
        }
    }
}

fn make_chunk_id(origin: &str, index: u64, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(origin.as_bytes());
    hasher.update(index.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    Human,
    Ai,
}

/// One turn of the caller-owned conversation. Callers append `Human` and
/// `Ai` turns; `System` turns are built internally for generation requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: ChatRole,
    pub text: String,
}

impl ConversationTurn {
    pub fn human(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Human,
            text: text.into(),
        }
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Ai,
            text: text.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            text: text.into(),
        }
    }
}

/// A retrieval hit, highest relevance first when returned in sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: ArticleChunk,
    pub score: f64,
}

/// The grounded answer to one query. `source_documents` holds one chunk per
/// distinct origin, in retrieval-relevance order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub source_documents: Vec<ArticleChunk>,
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub sentence_break_regex: &'static str,
    pub embed_batch_size: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_size: 600,
            chunk_overlap: 50,
            sentence_break_regex: r#"[.!?]["')\]]*\s"#,
            embed_batch_size: 32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_ids_are_stable_across_runs() {
        let first = ArticleChunk::new("Protein comes from eggs.".to_string(), "a.txt".to_string(), 0);
        let second = ArticleChunk::new("Protein comes from eggs.".to_string(), "a.txt".to_string(), 0);
        assert_eq!(first.chunk_id, second.chunk_id);
    }

    #[test]
    fn chunk_ids_differ_by_position() {
        let first = ArticleChunk::new("same text".to_string(), "a.txt".to_string(), 0);
        let second = ArticleChunk::new("same text".to_string(), "a.txt".to_string(), 1);
        assert_ne!(first.chunk_id, second.chunk_id);
    }
}
