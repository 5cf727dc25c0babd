use clap::{Parser, Subcommand};
use chrono::Utc;
use nutrition_rag_core::{
    ingest_corpus, Answer, ConversationTurn, IngestionOptions, OllamaChatModel, OllamaEmbedder,
    PineconeStore, ProvenanceRewriter, QueryEngine, DEFAULT_TOP_K,
};
use std::io::{BufRead, Write};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "nutrition-rag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding the raw article files
    #[arg(long, env = "CORPUS_DIR", default_value = "articles")]
    corpus_dir: String,

    /// Base URL substituted for the corpus directory in citations
    #[arg(
        long,
        env = "ARTICLE_BASE_URL",
        default_value = "https://www.fitday.com/fitness-articles/nutrition/for-men"
    )]
    article_base_url: String,

    /// Ollama server URL
    #[arg(long, env = "OLLAMA_URL", default_value = "http://localhost:11434")]
    ollama_url: String,

    /// Embedding model served by Ollama
    #[arg(long, env = "EMBEDDING_MODEL", default_value = "nomic-embed-text:v1.5")]
    embedding_model: String,

    /// Chat model served by Ollama
    #[arg(long, env = "CHAT_MODEL", default_value = "llama3.1")]
    chat_model: String,

    /// Pinecone index host (the per-index data-plane endpoint)
    #[arg(long, env = "PINECONE_INDEX_HOST")]
    pinecone_index_host: String,

    /// Pinecone API key
    #[arg(long, env = "PINECONE_API_KEY", hide_env_values = true)]
    pinecone_api_key: String,

    /// Pinecone namespace
    #[arg(long, env = "PINECONE_NAMESPACE", default_value = "")]
    pinecone_namespace: String,

    /// Maximum characters per chunk
    #[arg(long, default_value = "600")]
    chunk_size: usize,

    /// Characters shared by consecutive chunks of one article
    #[arg(long, default_value = "50")]
    chunk_overlap: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Load, chunk, embed, and index the article corpus.
    Ingest,
    /// Ask a single question with no conversation history.
    Ask {
        /// The question to answer
        #[arg(long)]
        question: String,
        /// Number of chunks to retrieve
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
    /// Interactive chat; history accumulates across turns until EOF.
    Chat {
        /// Number of chunks to retrieve per question
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let embedder = OllamaEmbedder::new(&cli.ollama_url, &cli.embedding_model);
    let index = PineconeStore::new(
        &cli.pinecone_index_host,
        &cli.pinecone_api_key,
        &cli.pinecone_namespace,
    );

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "nutrition-rag boot"
    );

    match cli.command {
        Command::Ingest => {
            let options = IngestionOptions {
                chunk_size: cli.chunk_size,
                chunk_overlap: cli.chunk_overlap,
                ..IngestionOptions::default()
            };
            let rewriter = ProvenanceRewriter::new(&cli.corpus_dir, &cli.article_base_url);

            let report = ingest_corpus(
                std::path::Path::new(&cli.corpus_dir),
                &options,
                &rewriter,
                &embedder,
                &index,
            )
            .await
            .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            for skipped in &report.skipped_files {
                warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped article");
            }

            println!("{} records loaded", report.records_loaded);
            println!(
                "{} chunks indexed at {}",
                report.chunks_indexed,
                report.finished_at.to_rfc3339()
            );
            println!("ingestion complete");
        }
        Command::Ask { question, top_k } => {
            let chat = OllamaChatModel::new(&cli.ollama_url, &cli.chat_model);
            let engine = QueryEngine::new(embedder, index, chat).with_top_k(top_k);

            let answer = engine
                .answer(&question, &[])
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            print_answer(&answer);
        }
        Command::Chat { top_k } => {
            let chat = OllamaChatModel::new(&cli.ollama_url, &cli.chat_model);
            let engine = QueryEngine::new(embedder, index, chat).with_top_k(top_k);

            let mut history: Vec<ConversationTurn> = Vec::new();
            let stdin = std::io::stdin();

            loop {
                print!("you> ");
                std::io::stdout().flush()?;

                let mut line = String::new();
                if stdin.lock().read_line(&mut line)? == 0 {
                    break;
                }
                let question = line.trim();
                if question.is_empty() {
                    continue;
                }

                match engine.answer(question, &history).await {
                    Ok(answer) => {
                        print_answer(&answer);
                        history.push(ConversationTurn::human(question));
                        history.push(ConversationTurn::ai(answer.text));
                    }
                    Err(error) => {
                        warn!(%error, "query failed");
                        println!("query failed: {error}");
                    }
                }
            }
        }
    }

    Ok(())
}

fn print_answer(answer: &Answer) {
    println!("{}", answer.text);

    if !answer.source_documents.is_empty() {
        println!("sources:");
        for (index, document) in answer.source_documents.iter().enumerate() {
            println!("{}. {}", index + 1, document.origin);
        }
    }
}
