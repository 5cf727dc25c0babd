use crate::embeddings::Embedder;
use crate::error::ServiceError;
use crate::generation::ChatModel;
use crate::models::{Answer, ArticleChunk, ConversationTurn, ScoredChunk};
use crate::traits::VectorIndex;
use std::collections::HashSet;

pub const DEFAULT_TOP_K: usize = 4;

const GROUNDING_PROMPT: &str = "You are a nutrition assistant. Answer the question using only the \
context below. If the context does not contain enough information to answer, say so plainly \
instead of guessing.";

const CONDENSE_PROMPT: &str = "Given the conversation so far, rewrite the user's next question as \
a single standalone question that needs no prior context to understand. Return only the rewritten \
question.";

const NO_CONTEXT_MARKER: &str = "(no relevant articles were found for this question)";

/// Answers questions against the index: reformulates follow-ups using the
/// caller-owned history, retrieves the top-k chunks, and asks the chat model
/// for an answer grounded in them. Generic over the collaborator traits so
/// any conforming implementation (hosted API or test double) slots in.
pub struct QueryEngine<E, V, C>
where
    E: Embedder,
    V: VectorIndex,
    C: ChatModel,
{
    embedder: E,
    index: V,
    chat: C,
    top_k: usize,
}

impl<E, V, C> QueryEngine<E, V, C>
where
    E: Embedder + Send + Sync,
    V: VectorIndex + Send + Sync,
    C: ChatModel + Send + Sync,
{
    pub fn new(embedder: E, index: V, chat: C) -> Self {
        Self {
            embedder,
            index,
            chat,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// One full query: reformulate, retrieve, generate, cite. The history is
    /// an immutable input; it is never mutated or persisted here. Any
    /// collaborator error ends the query; retries are caller policy.
    pub async fn answer(
        &self,
        question: &str,
        chat_history: &[ConversationTurn],
    ) -> Result<Answer, ServiceError> {
        if question.trim().is_empty() {
            return Err(ServiceError::Request("question is empty".to_string()));
        }

        let retrieval_query = if chat_history.is_empty() {
            question.to_string()
        } else {
            self.reformulate(question, chat_history).await?
        };

        let query_vector = self.embedder.embed(&retrieval_query).await?;
        let hits = self.index.similarity_search(&query_vector, self.top_k).await?;

        let turns = build_generation_turns(question, chat_history, &hits);
        let text = self.chat.complete(&turns).await?;

        if text.trim().is_empty() {
            return Err(ServiceError::EmptyCompletion {
                model: "generation".to_string(),
            });
        }

        Ok(Answer {
            text,
            source_documents: dedupe_by_origin(&hits),
        })
    }

    /// Resolves pronouns and ellipsis in follow-up questions against the
    /// prior turns. A blank rewrite falls back to the raw question.
    async fn reformulate(
        &self,
        question: &str,
        chat_history: &[ConversationTurn],
    ) -> Result<String, ServiceError> {
        let mut turns = vec![ConversationTurn::system(CONDENSE_PROMPT)];
        turns.extend_from_slice(chat_history);
        turns.push(ConversationTurn::human(question));

        let rewritten = self.chat.complete(&turns).await?;
        let rewritten = rewritten.trim();

        if rewritten.is_empty() {
            Ok(question.to_string())
        } else {
            Ok(rewritten.to_string())
        }
    }
}

fn build_generation_turns(
    question: &str,
    chat_history: &[ConversationTurn],
    hits: &[ScoredChunk],
) -> Vec<ConversationTurn> {
    let context = if hits.is_empty() {
        NO_CONTEXT_MARKER.to_string()
    } else {
        hits.iter()
            .map(|hit| hit.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
    };

    let mut turns = vec![ConversationTurn::system(format!(
        "{GROUNDING_PROMPT}\n\nContext:\n{context}"
    ))];
    turns.extend_from_slice(chat_history);
    turns.push(ConversationTurn::human(question));
    turns
}

/// Multiple retrieved chunks may cite one article; citations keep the first
/// hit per origin, in retrieval order.
fn dedupe_by_origin(hits: &[ScoredChunk]) -> Vec<ArticleChunk> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut documents = Vec::new();

    for hit in hits {
        if seen.insert(hit.chunk.origin.clone()) {
            documents.push(hit.chunk.clone());
        }
    }

    documents
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatRole;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct FakeEmbedder {
        embedded: Mutex<Vec<String>>,
    }

    impl FakeEmbedder {
        fn new() -> Self {
            Self {
                embedded: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Embedder for FakeEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
            self.embedded.lock().unwrap().push(text.to_string());
            Ok(vec![0.1, 0.2, 0.3])
        }
    }

    struct FakeIndex {
        hits: Vec<ScoredChunk>,
    }

    #[async_trait]
    impl VectorIndex for FakeIndex {
        async fn upsert_chunks(
            &self,
            _chunks: &[ArticleChunk],
            _embeddings: &[Vec<f32>],
        ) -> Result<(), ServiceError> {
            Ok(())
        }

        async fn similarity_search(
            &self,
            _query_vector: &[f32],
            _top_k: usize,
        ) -> Result<Vec<ScoredChunk>, ServiceError> {
            Ok(self.hits.clone())
        }
    }

    struct FakeChat {
        completions: Mutex<VecDeque<String>>,
        calls: Mutex<Vec<Vec<ConversationTurn>>>,
    }

    impl FakeChat {
        fn with_completions(completions: &[&str]) -> Self {
            Self {
                completions: Mutex::new(completions.iter().map(|s| s.to_string()).collect()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for FakeChat {
        async fn complete(&self, turns: &[ConversationTurn]) -> Result<String, ServiceError> {
            self.calls.lock().unwrap().push(turns.to_vec());
            Ok(self
                .completions
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_default())
        }
    }

    fn hit(content: &str, origin: &str, score: f64) -> ScoredChunk {
        ScoredChunk {
            chunk: ArticleChunk::new(content.to_string(), origin.to_string(), 0),
            score,
        }
    }

    #[tokio::test]
    async fn blank_questions_are_rejected() {
        let engine = QueryEngine::new(
            FakeEmbedder::new(),
            FakeIndex { hits: Vec::new() },
            FakeChat::with_completions(&["unused"]),
        );

        let result = engine.answer("   ", &[]).await;
        assert!(matches!(result, Err(ServiceError::Request(_))));
    }

    #[tokio::test]
    async fn source_documents_never_repeat_an_origin() {
        let protein = "https://example.com/nutrition/protein.txt";
        let beans = "https://example.com/nutrition/beans.txt";
        let engine = QueryEngine::new(
            FakeEmbedder::new(),
            FakeIndex {
                hits: vec![
                    hit("Eggs are protein.", protein, 0.9),
                    hit("Beans too.", beans, 0.8),
                    hit("Fish as well.", protein, 0.7),
                ],
            },
            FakeChat::with_completions(&["Eggs, beans, and fish."]),
        );

        let answer = engine.answer("What foods have protein?", &[]).await.unwrap();

        assert_eq!(answer.source_documents.len(), 2);
        assert_eq!(answer.source_documents[0].origin, protein);
        assert_eq!(answer.source_documents[0].content, "Eggs are protein.");
        assert_eq!(answer.source_documents[1].origin, beans);
    }

    #[tokio::test]
    async fn empty_retrieval_still_generates_a_decline() {
        let chat = FakeChat::with_completions(&["I don't have information on that."]);
        let engine = QueryEngine::new(FakeEmbedder::new(), FakeIndex { hits: Vec::new() }, chat);

        let answer = engine.answer("What about krill oil?", &[]).await.unwrap();

        assert_eq!(answer.text, "I don't have information on that.");
        assert!(answer.source_documents.is_empty());

        let calls = engine.chat.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let system = &calls[0][0];
        assert_eq!(system.role, ChatRole::System);
        assert!(system.text.contains(NO_CONTEXT_MARKER));
    }

    #[tokio::test]
    async fn empty_completion_is_a_query_failure() {
        let engine = QueryEngine::new(
            FakeEmbedder::new(),
            FakeIndex {
                hits: vec![hit("Eggs.", "https://example.com/nutrition/protein.txt", 0.9)],
            },
            FakeChat::with_completions(&["   "]),
        );

        let result = engine.answer("What foods have protein?", &[]).await;
        assert!(matches!(result, Err(ServiceError::EmptyCompletion { .. })));
    }

    #[tokio::test]
    async fn history_reformulates_the_retrieval_query() {
        let history = vec![
            ConversationTurn::human("What foods have protein?"),
            ConversationTurn::ai("Eggs, beans, and fish."),
        ];
        let engine = QueryEngine::new(
            FakeEmbedder::new(),
            FakeIndex {
                hits: vec![hit("Lentils.", "https://example.com/nutrition/vegan.txt", 0.9)],
            },
            FakeChat::with_completions(&[
                "What protein sources are suitable for vegans?",
                "Lentils and tofu.",
            ]),
        );

        let answer = engine.answer("what about for vegans", &history).await.unwrap();
        assert_eq!(answer.text, "Lentils and tofu.");

        let embedded = engine.embedder.embedded.lock().unwrap();
        assert_eq!(embedded.as_slice(), ["What protein sources are suitable for vegans?"]);

        let calls = engine.chat.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        // Generation sees the original question, not the rewrite.
        assert_eq!(calls[1].last().unwrap().text, "what about for vegans");
    }

    #[tokio::test]
    async fn empty_history_skips_reformulation() {
        let engine = QueryEngine::new(
            FakeEmbedder::new(),
            FakeIndex {
                hits: vec![hit("Eggs.", "https://example.com/nutrition/protein.txt", 0.9)],
            },
            FakeChat::with_completions(&["Eggs."]),
        );

        engine.answer("What foods have protein?", &[]).await.unwrap();

        let embedded = engine.embedder.embedded.lock().unwrap();
        assert_eq!(embedded.as_slice(), ["What foods have protein?"]);
        assert_eq!(engine.chat.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn blank_reformulation_falls_back_to_the_raw_question() {
        let history = vec![ConversationTurn::human("hi"), ConversationTurn::ai("hello")];
        let engine = QueryEngine::new(
            FakeEmbedder::new(),
            FakeIndex { hits: Vec::new() },
            FakeChat::with_completions(&["", "No relevant context."]),
        );

        engine.answer("what about magnesium", &history).await.unwrap();

        let embedded = engine.embedder.embedded.lock().unwrap();
        assert_eq!(embedded.as_slice(), ["what about magnesium"]);
    }
}
