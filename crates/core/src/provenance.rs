use crate::models::ArticleChunk;
use url::Url;

/// Rewrites chunk origins from local corpus paths into public article URLs.
/// Applied exactly once, after chunking and before persistence, so that
/// query-time citations are directly usable links.
#[derive(Debug, Clone)]
pub struct ProvenanceRewriter {
    corpus_root: String,
    base_url: String,
}

impl ProvenanceRewriter {
    pub fn new(corpus_root: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            corpus_root: corpus_root.into(),
            base_url: base_url.into(),
        }
    }

    /// Empty origins and origins that already are http(s) URLs pass through
    /// unchanged. Anything else has backslash artifacts stripped and, when
    /// it lives under the corpus root, that prefix swapped for the base URL.
    pub fn rewrite(&self, origin: &str) -> String {
        if origin.is_empty() || is_public_url(origin) {
            return origin.to_string();
        }

        let cleaned = origin.replace('\\', "/");
        let root = self.corpus_root.replace('\\', "/");

        match cleaned.strip_prefix(&root) {
            Some(remainder) if remainder.is_empty() || remainder.starts_with('/') || root.ends_with('/') => {
                format!(
                    "{}/{}",
                    self.base_url.trim_end_matches('/'),
                    remainder.trim_start_matches('/')
                )
            }
            _ => cleaned,
        }
    }

    pub fn rewrite_chunk(&self, chunk: ArticleChunk) -> ArticleChunk {
        let origin = self.rewrite(&chunk.origin);
        ArticleChunk::new(chunk.content, origin, chunk.sequence_index)
    }
}

fn is_public_url(origin: &str) -> bool {
    Url::parse(origin)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::ProvenanceRewriter;

    fn rewriter() -> ProvenanceRewriter {
        ProvenanceRewriter::new("articles", "https://example.com/nutrition/")
    }

    #[test]
    fn corpus_paths_become_public_urls() {
        assert_eq!(
            rewriter().rewrite("articles/protein.txt"),
            "https://example.com/nutrition/protein.txt"
        );
    }

    #[test]
    fn windows_separators_are_normalized() {
        assert_eq!(
            rewriter().rewrite("articles\\protein.txt"),
            "https://example.com/nutrition/protein.txt"
        );
    }

    #[test]
    fn public_urls_pass_through_unchanged() {
        let url = "https://example.com/nutrition/protein.txt";
        assert_eq!(rewriter().rewrite(url), url);
    }

    #[test]
    fn empty_origin_passes_through() {
        assert_eq!(rewriter().rewrite(""), "");
    }

    #[test]
    fn paths_outside_the_corpus_root_are_only_cleaned() {
        assert_eq!(rewriter().rewrite("elsewhere\\note.txt"), "elsewhere/note.txt");
    }

    #[test]
    fn rewriting_a_chunk_recomputes_its_id() {
        let chunk = crate::models::ArticleChunk::new(
            "Eggs and beans.".to_string(),
            "articles/protein.txt".to_string(),
            0,
        );
        let original_id = chunk.chunk_id.clone();

        let rewritten = rewriter().rewrite_chunk(chunk);
        assert_eq!(rewritten.origin, "https://example.com/nutrition/protein.txt");
        assert_ne!(rewritten.chunk_id, original_id);
    }
}
