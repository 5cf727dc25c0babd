use crate::error::ServiceError;
use crate::models::{ArticleChunk, ScoredChunk};
use crate::traits::VectorIndex;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

/// Client for a Pinecone index over its data-plane REST API. `host` is the
/// per-index endpoint from the Pinecone console.
pub struct PineconeStore {
    host: String,
    api_key: String,
    namespace: String,
    client: Client,
}

impl PineconeStore {
    pub fn new(
        host: impl Into<String>,
        api_key: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            api_key: api_key.into(),
            namespace: namespace.into(),
            client: Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.host.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl VectorIndex for PineconeStore {
    async fn upsert_chunks(
        &self,
        chunks: &[ArticleChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), ServiceError> {
        if chunks.len() != embeddings.len() {
            return Err(ServiceError::Request(format!(
                "embedding count {} doesn't match chunk count {}",
                embeddings.len(),
                chunks.len()
            )));
        }

        if chunks.is_empty() {
            return Ok(());
        }

        let vectors = chunks
            .iter()
            .zip(embeddings.iter())
            .map(|(chunk, embedding)| {
                json!({
                    "id": chunk.chunk_id,
                    "values": embedding,
                    "metadata": {
                        "text": chunk.content,
                        "source": chunk.origin,
                        "sequence_index": chunk.sequence_index,
                    },
                })
            })
            .collect::<Vec<_>>();

        let response = self
            .client
            .post(self.endpoint("vectors/upsert"))
            .header("Api-Key", &self.api_key)
            .json(&json!({
                "vectors": vectors,
                "namespace": self.namespace,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ServiceError::BackendResponse {
                backend: "pinecone".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(())
    }

    async fn similarity_search(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, ServiceError> {
        let response = self
            .client
            .post(self.endpoint("query"))
            .header("Api-Key", &self.api_key)
            .json(&json!({
                "vector": query_vector,
                "topK": top_k,
                "namespace": self.namespace,
                "includeMetadata": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ServiceError::BackendResponse {
                backend: "pinecone".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        Ok(parse_matches(&parsed))
    }
}

fn parse_matches(payload: &Value) -> Vec<ScoredChunk> {
    let matches = payload
        .pointer("/matches")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut hits = Vec::new();
    for hit in matches {
        let chunk_id = hit
            .pointer("/id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let score = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0);
        let content = hit
            .pointer("/metadata/text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let origin = hit
            .pointer("/metadata/source")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        // Pinecone stores metadata numbers as floats.
        let sequence_index = hit
            .pointer("/metadata/sequence_index")
            .and_then(Value::as_f64)
            .map(|value| value as u64)
            .unwrap_or_default();

        hits.push(ScoredChunk {
            chunk: ArticleChunk {
                chunk_id,
                content,
                origin,
                sequence_index,
            },
            score,
        });
    }

    hits
}
