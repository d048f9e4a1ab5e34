//! NEL CLI - Command-line interface
//!
//! Usage:
//!   nel link --index <entities.json> [--config <nel.toml>] <document.json>...
//!   nel config [--config <nel.toml>]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use nel_core::{AnalysedText, AppConfig, LabelTokenizer, LoggingConfig};
use nel_index::{CachingSearcher, InMemoryEntityIndex, TimeoutSearcher};
use nel_linker::{DefaultLabelTokenizer, EntityAnnotation, EntityLinker, LinkingStats};

#[derive(Parser)]
#[command(name = "nel")]
#[command(about = "Named entity linking over annotated text")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Link entities in annotated documents
    Link {
        /// JSON array of knowledge base entities
        #[arg(long)]
        index: PathBuf,

        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Language of documents that do not declare one
        #[arg(long, default_value = "en")]
        language: String,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,

        /// Annotated documents (JSON)
        #[arg(required = true)]
        documents: Vec<PathBuf>,
    },
    /// Validate and print the effective configuration
    Config {
        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Annotated document as read from disk
#[derive(Debug, Deserialize)]
struct DocumentInput {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(flatten)]
    text: AnalysedText,
}

/// Linking output of one document
#[derive(Debug, Serialize)]
struct DocumentOutput {
    document: String,
    language: String,
    stats: LinkingStats,
    entities: Vec<EntityAnnotation>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Link {
            index,
            config,
            language,
            pretty,
            documents,
        } => {
            let config = load_config(config.as_deref())?;
            init_tracing(&config.logging);
            link(&config, &index, &language, pretty, &documents).await
        }
        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// Load configuration from file (if given) and environment, then validate
fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    config.validate()?;
    Ok(config)
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_document(path: &Path) -> anyhow::Result<DocumentInput> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read document {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse document {}", path.display()))
}

async fn link(
    config: &AppConfig,
    index: &Path,
    default_language: &str,
    pretty: bool,
    paths: &[PathBuf],
) -> anyhow::Result<()> {
    let (outputs, failed) = link_documents(config, index, default_language, paths).await?;

    let json = if pretty {
        serde_json::to_string_pretty(&outputs)?
    } else {
        serde_json::to_string(&outputs)?
    };
    println!("{json}");

    if failed > 0 {
        anyhow::bail!("{failed} of {} documents could not be linked", paths.len());
    }
    Ok(())
}

/// Link documents concurrently; returns the outputs and the number of
/// documents that failed
async fn link_documents(
    config: &AppConfig,
    index: &Path,
    default_language: &str,
    paths: &[PathBuf],
) -> anyhow::Result<(Vec<DocumentOutput>, usize)> {
    let tokenizer: Arc<dyn LabelTokenizer> = Arc::new(DefaultLabelTokenizer::new());
    let index = InMemoryEntityIndex::from_json_file(Arc::clone(&tokenizer), index)?;
    let cached = CachingSearcher::new(index, &config.search);
    let cache_stats = cached.stats();
    let searcher = Arc::new(TimeoutSearcher::from_config(cached, &config.search));
    let linker = EntityLinker::new(searcher, tokenizer, config.linker.clone())?;

    let documents = paths
        .iter()
        .map(|path| load_document(path))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let results = join_all(documents.iter().zip(paths).map(|(document, path)| {
        let name = document
            .id
            .clone()
            .unwrap_or_else(|| path.display().to_string());
        let language = document
            .language
            .clone()
            .unwrap_or_else(|| default_language.to_string());
        let linker = &linker;

        async move {
            let processing = config.processing.for_language(&language);
            let result = linker.process(&document.text, &language, processing).await;
            (name, language, result)
        }
    }))
    .await;

    let mut outputs = Vec::with_capacity(results.len());
    let mut failed = 0;
    for (document, language, result) in results {
        match result {
            Ok(result) => outputs.push(DocumentOutput {
                document,
                language,
                stats: result.stats,
                entities: result.to_annotations(),
            }),
            Err(e) => {
                tracing::error!("Failed to link {}: {}", document, e);
                failed += 1;
            }
        }
    }

    let report = cache_stats.report();
    tracing::info!(
        "Search cache: {} hits, {} misses ({:.1}% hit rate)",
        report.hits,
        report.misses,
        report.hit_rate * 100.0
    );

    Ok((outputs, failed))
}
