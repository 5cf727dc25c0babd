use crate::error::IngestError;
use crate::models::{Article, ArticleChunk, IngestionOptions};
use regex::Regex;

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl ChunkingConfig {
    /// Invariant: `chunk_overlap < chunk_size`, otherwise the split window
    /// can never advance.
    pub fn validated(chunk_size: usize, chunk_overlap: usize) -> Result<Self, IngestError> {
        if chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "chunk_overlap {chunk_overlap} must be smaller than chunk_size {chunk_size}"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }
}

/// Splits `text` into chunks of at most `chunk_size` characters, each window
/// starting `chunk_overlap` characters before the previous one ended. Window
/// ends prefer a paragraph break, then a sentence break, then whitespace,
/// before falling back to a hard character cut.
pub fn split_text(text: &str, config: ChunkingConfig, sentence_re: &Regex) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();

    if chars.is_empty() {
        return Vec::new();
    }
    if chars.len() <= config.chunk_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;

    loop {
        let window_end = start + config.chunk_size;
        if window_end >= chars.len() {
            chunks.push(chars[start..].iter().collect());
            break;
        }

        // A break is usable only if the next window still advances.
        let min_end = start + config.chunk_overlap + 1;
        let window: String = chars[start..window_end].iter().collect();

        let end = last_paragraph_break(&chars, start, window_end)
            .filter(|&candidate| candidate >= min_end)
            .or_else(|| {
                last_sentence_break(&window, sentence_re)
                    .map(|relative| start + relative)
                    .filter(|&candidate| candidate >= min_end)
            })
            .or_else(|| {
                last_whitespace_break(&chars, start, window_end)
                    .filter(|&candidate| candidate >= min_end)
            })
            .unwrap_or(window_end);

        chunks.push(chars[start..end].iter().collect());
        start = end - config.chunk_overlap;
    }

    chunks
}

/// Char index just past the last `\n\n` inside the window.
fn last_paragraph_break(chars: &[char], start: usize, window_end: usize) -> Option<usize> {
    (start..window_end - 1)
        .rev()
        .find(|&index| chars[index] == '\n' && chars[index + 1] == '\n')
        .map(|index| index + 2)
}

/// Char index (relative to the window) just past the last sentence break.
fn last_sentence_break(window: &str, sentence_re: &Regex) -> Option<usize> {
    sentence_re
        .find_iter(window)
        .last()
        .map(|found| window[..found.end()].chars().count())
}

/// Char index just past the last whitespace character inside the window.
fn last_whitespace_break(chars: &[char], start: usize, window_end: usize) -> Option<usize> {
    (start..window_end)
        .rev()
        .find(|&index| chars[index].is_whitespace())
        .map(|index| index + 1)
}

/// Turns decoded articles into chunks with per-article sequence indices and
/// origins copied verbatim. Deterministic: identical input and options yield
/// byte-identical chunks.
pub fn chunk_articles(
    articles: &[Article],
    options: &IngestionOptions,
) -> Result<Vec<ArticleChunk>, IngestError> {
    let config = ChunkingConfig::validated(options.chunk_size, options.chunk_overlap)?;
    let sentence_re = Regex::new(options.sentence_break_regex)?;

    let mut chunks = Vec::new();

    for article in articles {
        let mut sequence_index = 0u64;
        for piece in split_text(&article.content, config, &sentence_re) {
            if piece.trim().is_empty() {
                continue;
            }
            chunks.push(ArticleChunk::new(
                piece,
                article.origin.clone(),
                sequence_index,
            ));
            sequence_index += 1;
        }
    }

    Ok(chunks)
}
