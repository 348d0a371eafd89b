//! podium-si command-line entry point
//!
//! Drives the ingest pipeline and the review state machine against a
//! local database. The upload orchestration layer uses the same library
//! surface; this binary exists for operators and local testing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::json;
use uuid::Uuid;

use podium_common::events::ProgressBus;
use podium_si::config::ResolvedConfig;
use podium_si::db;
use podium_si::services::pdf_analyzer::PdfAnalyzer;
use podium_si::services::review_service::{PieceCommitter, ReviewService};
use podium_si::services::temp_cleaner::TempFileCleaner;
use podium_si::workflow::{IngestPipeline, IngestRequest};

#[derive(Parser)]
#[command(name = "podium-si", about = "Podium score-ingest engine", version)]
struct Cli {
    /// SQLite database path (overrides PODIUM_DATABASE_PATH and config)
    #[arg(long, global = true)]
    db: Option<String>,

    /// Temp-file directory (overrides PODIUM_TEMP_DIR and config)
    #[arg(long, global = true)]
    temp_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a score file and print the routing decision
    Ingest {
        /// Path to the uploaded file
        file: PathBuf,

        /// Work title as printed on the score
        #[arg(long)]
        title: String,

        /// Composer credit
        #[arg(long)]
        composer: Option<String>,

        #[arg(long, default_value = "application/pdf")]
        mime_type: String,

        /// Extractor confidence to record (0-100)
        #[arg(long, default_value_t = 75)]
        confidence: u8,
    },

    /// Reject a pending upload session
    Reject {
        session_id: Uuid,

        /// Reason recorded in the audit trail
        #[arg(long)]
        reason: Option<String>,

        #[arg(long, default_value = "cli")]
        reviewer: String,
    },

    /// Approve a pending upload session and commit it to the library
    Approve {
        session_id: Uuid,

        #[arg(long, default_value = "cli")]
        reviewer: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = ResolvedConfig::resolve(cli.db.as_deref(), cli.temp_dir.as_deref())?;
    let pool = db::connect(&config.database_path).await?;

    match cli.command {
        Commands::Ingest {
            file,
            title,
            composer,
            mime_type,
            confidence,
        } => {
            let bytes = tokio::fs::read(&file).await?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| file.display().to_string());

            let bus = ProgressBus::new(256);
            let mut rx = bus.subscribe();
            let observer = tokio::spawn(async move {
                while let Ok(event) = rx.recv().await {
                    let terminal = event.is_terminal();
                    tracing::info!(?event, "pipeline event");
                    if terminal {
                        break;
                    }
                }
            });

            let pipeline =
                IngestPipeline::new(pool, bus, PdfAnalyzer::new(config.tuning.clone()));
            let outcome = pipeline
                .ingest(IngestRequest {
                    file_name,
                    mime_type,
                    bytes,
                    metadata: json!({
                        "title": title,
                        "composer": composer,
                    }),
                    confidence_score: confidence,
                })
                .await?;
            observer.await?;

            println!("policy:     {}", outcome.disposition.policy);
            println!("reason:     {}", outcome.disposition.reason);
            match outcome.session_id {
                Some(id) => println!("session:    {} (PENDING_REVIEW)", id),
                None => println!("session:    none (duplicate skipped)"),
            }
            if let Some(analysis) = outcome.analysis {
                println!(
                    "structure:  {} page(s), {} part(s), confidence {}",
                    analysis.total_pages,
                    analysis.estimated_parts.len(),
                    analysis.confidence
                );
                println!("notes:      {}", analysis.notes);
            }
        }

        Commands::Reject {
            session_id,
            reason,
            reviewer,
        } => {
            let service = ReviewService::new(
                pool.clone(),
                TempFileCleaner::new(&config.temp_dir),
                PieceCommitter::new(pool),
            );
            let receipt = service
                .reject(session_id, &reviewer, reason.as_deref())
                .await?;
            println!(
                "session {} -> {} at {} (cleanup: {:?})",
                receipt.session_id, receipt.status, receipt.reviewed_at, receipt.cleanup
            );
        }

        Commands::Approve {
            session_id,
            reviewer,
        } => {
            let service = ReviewService::new(
                pool.clone(),
                TempFileCleaner::new(&config.temp_dir),
                PieceCommitter::new(pool),
            );
            let receipt = service.approve(session_id, &reviewer).await?;
            println!(
                "session {} -> {} at {}",
                receipt.session_id, receipt.status, receipt.reviewed_at
            );
        }
    }

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}
