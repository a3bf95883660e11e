mod config;
mod server;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use config::Settings;
use pdf_chat_core::{IngestionPipeline, QueryPipeline};
use server::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-chat", version, about = "Chat with an uploaded PDF")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    settings: Settings,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Replace the stored document with a local PDF.
    Ingest {
        /// Path to the PDF file.
        #[arg(long)]
        file: PathBuf,
    },
    /// Ask one question against the stored document.
    Ask {
        #[arg(long)]
        query: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let settings = cli.settings;
    settings.validate()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        embedder = ?settings.embedder,
        store = ?settings.store,
        "pdf-chat boot"
    );

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let state = build_state(&settings)?;
            server::serve(
                state,
                &settings.host,
                settings.port,
                settings.max_upload_bytes,
            )
            .await?;
        }
        Command::Ingest { file } => {
            let pipeline = build_ingestion(&settings)?;
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let filename = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload.pdf".to_string());

            let report = pipeline.ingest_pdf(&bytes, &filename).await?;
            for failure in &report.failures {
                warn!(chunk = failure.chunk_index, reason = %failure.reason, "chunk skipped");
            }
            println!(
                "{} of {} chunks embedded from {} at {}",
                report.successful_chunks,
                report.total_chunks,
                filename,
                Utc::now().to_rfc3339()
            );
        }
        Command::Ask { query } => {
            let pipeline = build_query(&settings)?;
            let result = pipeline.answer(&query, &[]).await?;
            println!("{}", result.answer);
        }
    }

    Ok(())
}

fn build_ingestion(settings: &Settings) -> anyhow::Result<IngestionPipeline> {
    let pipeline = IngestionPipeline::new(
        settings.build_embedder()?,
        settings.build_store()?,
        settings.ingestion_options(),
    )?;
    Ok(pipeline)
}

fn build_query(settings: &Settings) -> anyhow::Result<QueryPipeline> {
    Ok(QueryPipeline::new(
        settings.build_embedder()?,
        settings.build_store()?,
        settings.build_completion()?,
        settings.query_options(),
    ))
}

/// Both pipelines share one embedder and one store.
fn build_state(settings: &Settings) -> anyhow::Result<AppState> {
    let embedder = settings.build_embedder()?;
    let store = settings.build_store()?;
    let store_name = store.name().to_string();

    let ingestion = IngestionPipeline::new(
        Arc::clone(&embedder),
        Arc::clone(&store),
        settings.ingestion_options(),
    )?;
    let query = QueryPipeline::new(
        embedder,
        store,
        settings.build_completion()?,
        settings.query_options(),
    );

    Ok(AppState {
        ingestion: Arc::new(ingestion),
        query: Arc::new(query),
        store_name,
    })
}
