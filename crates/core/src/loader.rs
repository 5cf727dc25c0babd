use crate::error::IngestError;
use crate::models::Article;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

pub struct CorpusReport {
    pub articles: Vec<Article>,
    pub skipped_files: Vec<SkippedFile>,
}

pub fn discover_article_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .max_depth(1)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if entry.file_type().is_file() {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

/// Decodes `bytes` as strict UTF-8, falling back to Windows-1252. Exactly
/// two attempts. The fallback maps every byte to some char, so a decode
/// that yields control characters (other than tab, newline, carriage
/// return) is treated as a failed attempt: that is binary data, not text.
fn decode_article_bytes(bytes: &[u8]) -> Option<String> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Some(text.to_string());
    }

    let (decoded, _, had_errors) = encoding_rs::WINDOWS_1252.decode(bytes);
    if had_errors || decoded.chars().any(is_non_text_control) {
        None
    } else {
        Some(decoded.into_owned())
    }
}

fn is_non_text_control(character: char) -> bool {
    character.is_control() && !matches!(character, '\t' | '\n' | '\r')
}

/// Reads every regular file directly under `folder` (non-recursive) into an
/// [`Article`]. Files that fail both decode attempts are skipped with a
/// diagnostic; a partial corpus is an acceptable outcome.
pub fn load_articles(folder: &Path) -> Result<CorpusReport, IngestError> {
    let files = discover_article_files(folder);

    if files.is_empty() {
        return Err(IngestError::InvalidArgument(format!(
            "no article files found in {}",
            folder.display()
        )));
    }

    let mut articles = Vec::new();
    let mut skipped_files = Vec::new();

    for path in files {
        let bytes = fs::read(&path)?;

        match decode_article_bytes(&bytes) {
            Some(content) => articles.push(Article {
                content,
                origin: path.to_string_lossy().to_string(),
            }),
            None => {
                let error = IngestError::Decode {
                    path: path.clone(),
                    tried: "utf-8, windows-1252".to_string(),
                };
                warn!(path = %path.display(), reason = %error, "skipped article");
                skipped_files.push(SkippedFile {
                    path,
                    reason: error.to_string(),
                });
            }
        }
    }

    Ok(CorpusReport {
        articles,
        skipped_files,
    })
}

#[cfg(test)]
mod tests {
    use super::{discover_article_files, load_articles};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn discovery_ignores_nested_directories() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;

        fs::write(base.join("a.txt"), "top level")?;
        fs::write(nested.join("b.txt"), "nested")?;

        let files = discover_article_files(base);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name().and_then(|name| name.to_str()), Some("a.txt"));
        Ok(())
    }

    #[test]
    fn loading_fails_on_empty_folder() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let result = load_articles(dir.path());
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn undecodable_file_is_skipped_not_fatal() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("a.txt"), "Protein comes from eggs, beans, and fish.")?;
        // Invalid UTF-8, and the fallback decode yields control chars.
        fs::write(dir.path().join("blob.bin"), [0xff, 0x81, 0x00, 0x9d])?;

        let report = load_articles(dir.path())?;

        assert_eq!(report.articles.len(), 1);
        assert_eq!(report.skipped_files.len(), 1);
        assert_eq!(
            report.skipped_files[0]
                .path
                .file_name()
                .and_then(|name| name.to_str()),
            Some("blob.bin")
        );
        Ok(())
    }

    #[test]
    fn fallback_encoding_recovers_non_utf8_text() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        // "caf\xe9" is latin-1 for "café" and invalid UTF-8.
        fs::write(dir.path().join("latin.txt"), [b'c', b'a', b'f', 0xe9])?;

        let report = load_articles(dir.path())?;

        assert_eq!(report.articles.len(), 1);
        assert_eq!(report.articles[0].content, "café");
        assert!(report.skipped_files.is_empty());
        Ok(())
    }

    #[test]
    fn origins_are_file_paths() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("protein.txt"), "Eggs and beans.")?;

        let report = load_articles(dir.path())?;

        assert!(report.articles[0].origin.ends_with("protein.txt"));
        Ok(())
    }
}
