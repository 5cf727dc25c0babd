use crate::error::ServiceError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

/// Capability assumed of the embedding collaborator: deterministic for a
/// fixed model, same dimensionality for every call within a deployment.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

/// Embedding client for an Ollama server (`POST {endpoint}/api/embed`).
pub struct OllamaEmbedder {
    endpoint: String,
    model: String,
    client: Client,
}

impl OllamaEmbedder {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            client: Client::new(),
        }
    }

    async fn request_embeddings(&self, input: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
        let response = self
            .client
            .post(format!("{}/api/embed", self.endpoint.trim_end_matches('/')))
            .json(&json!({
                "model": self.model,
                "input": input,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ServiceError::BackendResponse {
                backend: "ollama-embed".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        let vectors = parse_embeddings(&parsed);

        if vectors.len() != input.len() {
            return Err(ServiceError::BackendResponse {
                backend: "ollama-embed".to_string(),
                details: format!(
                    "returned {} embeddings for {} inputs",
                    vectors.len(),
                    input.len()
                ),
            });
        }

        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        let mut vectors = self.request_embeddings(&[text.to_string()]).await?;
        Ok(vectors.remove(0))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request_embeddings(texts).await
    }
}

fn parse_embeddings(payload: &Value) -> Vec<Vec<f32>> {
    payload
        .pointer("/embeddings")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    row.as_array()
                        .map(|values| {
                            values
                                .iter()
                                .filter_map(Value::as_f64)
                                .map(|value| value as f32)
                                .collect()
                        })
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::parse_embeddings;
    use serde_json::json;

    #[test]
    fn embeddings_payload_is_parsed_row_by_row() {
        let payload = json!({
            "model": "nomic-embed-text:v1.5",
            "embeddings": [[0.1, 0.2], [0.3, 0.4]],
        });

        let vectors = parse_embeddings(&payload);
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vec![0.1f32, 0.2f32]);
    }

    #[test]
    fn missing_embeddings_key_yields_no_vectors() {
        let payload = json!({ "error": "model not found" });
        assert!(parse_embeddings(&payload).is_empty());
    }
}
