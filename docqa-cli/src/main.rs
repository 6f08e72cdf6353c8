//! # docqa CLI
//!
//! Ingestion and query entrypoints over a local document corpus.
//!
//! ```bash
//! # Build or extend the index from ./data
//! docqa ingest
//!
//! # Ask a question, printing {"answer": ..., "sources": [...]} as JSON
//! docqa ask "What is the capital of Francia?"
//! ```
//!
//! Configuration comes from the environment (and `.env`); see
//! [`docqa_rag::Settings`].

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use docqa_rag::{
    DocumentLoader, IngestReport, IngestionPipeline, QueryRequest, QueryResponse, RagPipeline,
    Settings,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Grounded question answering over your documents")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, chunk, embed, and index every supported file in the data directory
    Ingest {
        /// Directory to ingest (overrides DATA_DIR)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Index directory (overrides VECTORSTORE_DIR)
        #[arg(long)]
        vectorstore_dir: Option<PathBuf>,
    },

    /// Answer a question from the indexed documents
    Ask {
        /// The question to answer
        question: String,

        /// Index directory (overrides VECTORSTORE_DIR)
        #[arg(long)]
        vectorstore_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut settings = Settings::from_env().context("failed to load settings")?;

    match cli.command {
        Commands::Ingest { data_dir, vectorstore_dir } => {
            if let Some(dir) = data_dir {
                settings.data_dir = dir;
            }
            if let Some(dir) = vectorstore_dir {
                settings.vectorstore_dir = dir;
            }
            ingest(&settings).await
        }
        Commands::Ask { question, vectorstore_dir } => {
            if let Some(dir) = vectorstore_dir {
                settings.vectorstore_dir = dir;
            }
            ask(&settings, QueryRequest { question }).await
        }
    }
}

/// Logs go to stderr so `ask` output stays machine-readable.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn ingest(settings: &Settings) -> Result<()> {
    println!("Loading documents from {}", settings.data_dir.display());

    let pipeline = IngestionPipeline::from_settings(settings)
        .await
        .context("failed to initialize ingestion")?;
    let report = pipeline
        .ingest_directory(&DocumentLoader::new(), &settings.data_dir)
        .await
        .context("ingestion failed")?;

    println!("Loaded {} documents", report.documents_loaded);
    println!("Created {} chunks", report.chunks_created);
    println!("Wrote {} entries", report.entries_written);
    for failure in &report.failures {
        eprintln!("Skipped {}: {}", failure.source, failure.error);
    }
    info!(
        entries_written = report.entries_written,
        failures = report.failures.len(),
        "ingestion complete"
    );

    check_report(&report)?;
    println!("Vectorstore saved to {}", settings.vectorstore_dir.display());
    Ok(())
}

/// A run where every input failed is an error, not an empty success.
fn check_report(report: &IngestReport) -> Result<()> {
    if report.entries_written == 0 && !report.failures.is_empty() {
        bail!("nothing was indexed: all {} sources failed", report.failures.len());
    }
    Ok(())
}

async fn ask(settings: &Settings, request: QueryRequest) -> Result<()> {
    let pipeline =
        RagPipeline::from_settings(settings).await.context("failed to initialize query pipeline")?;
    let result = pipeline.answer(&request.question).await.context("failed to answer question")?;

    let response = QueryResponse::from(result);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
