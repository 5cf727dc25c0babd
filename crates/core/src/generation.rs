use crate::error::ServiceError;
use crate::models::{ChatRole, ConversationTurn};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Capability assumed of the generation collaborator: a full turn sequence
/// in, one completion out. No streaming.
#[async_trait]
pub trait ChatModel {
    async fn complete(&self, turns: &[ConversationTurn]) -> Result<String, ServiceError>;
}

/// Chat client for an Ollama server (`POST {endpoint}/api/chat`).
pub struct OllamaChatModel {
    endpoint: String,
    model: String,
    client: Client,
}

impl OllamaChatModel {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            client: Client::new(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<WireResponseMessage>,
}

#[derive(Deserialize)]
struct WireResponseMessage {
    content: String,
}

pub(crate) fn wire_role(role: ChatRole) -> &'static str {
    match role {
        ChatRole::System => "system",
        ChatRole::Human => "user",
        ChatRole::Ai => "assistant",
    }
}

#[async_trait]
impl ChatModel for OllamaChatModel {
    async fn complete(&self, turns: &[ConversationTurn]) -> Result<String, ServiceError> {
        let body = ChatRequest {
            model: &self.model,
            messages: turns
                .iter()
                .map(|turn| WireMessage {
                    role: wire_role(turn.role),
                    content: &turn.text,
                })
                .collect(),
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.endpoint.trim_end_matches('/')))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ServiceError::BackendResponse {
                backend: "ollama-chat".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let completion = parsed
            .message
            .map(|message| message.content)
            .unwrap_or_default();

        if completion.trim().is_empty() {
            return Err(ServiceError::EmptyCompletion {
                model: self.model.clone(),
            });
        }

        Ok(completion)
    }
}
