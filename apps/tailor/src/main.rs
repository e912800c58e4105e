use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tailor::batch::validate_job_urls;
use tailor::config::Config;
use tailor::models::batch::BatchResult;
use tailor::prep::{PrepCache, PrepEvent};
use tailor::state::AppState;

/// Drives the tailoring client against a live backend.
#[derive(Parser, Debug)]
#[command(name = "tailor")]
#[command(about = "Interview prep and batch tailoring client")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the interview prep for a tailored resume and its sub-analyses
    Load { tailored_resume_id: i64 },
    /// Generate (or regenerate) the interview prep
    Generate { tailored_resume_id: i64 },
    /// Drop the cached prep and fetch it again
    Refresh { tailored_resume_id: i64 },
    /// Delete the interview prep on the backend
    Delete { tailored_resume_id: i64 },
    /// Tailor one base resume against several job postings
    Batch {
        #[arg(long)]
        base_resume_id: i64,
        /// Job posting URLs, at most BATCH_MAX_JOBS
        #[arg(required = true)]
        job_urls: Vec<String>,
    },
    /// Count the STAR stories linked to a tailored resume
    Stars { tailored_resume_id: i64 },
    /// Toggle a checklist item and sync it to the backend
    Check {
        tailored_resume_id: i64,
        item_id: String,
    },
    /// Set the interview date (YYYY-MM-DD, empty to clear)
    Date {
        tailored_resume_id: i64,
        date: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    info!("Starting tailor client v{}", env!("CARGO_PKG_VERSION"));

    let settle_timeout = Duration::from_secs(config.http_timeout_secs);
    let state = AppState::build(config).await?;
    let prep = &state.prep;

    match args.command {
        Command::Load { tailored_resume_id } => {
            let events = prep.subscribe();
            prep.load(tailored_resume_id).await?;
            settle(prep, tailored_resume_id, events, settle_timeout).await;
            print_record(prep, tailored_resume_id)?;
        }
        Command::Generate { tailored_resume_id } => {
            let events = prep.subscribe();
            prep.generate(tailored_resume_id).await?;
            settle(prep, tailored_resume_id, events, settle_timeout).await;
            print_record(prep, tailored_resume_id)?;
        }
        Command::Refresh { tailored_resume_id } => {
            let events = prep.subscribe();
            prep.refresh(tailored_resume_id).await?;
            settle(prep, tailored_resume_id, events, settle_timeout).await;
            print_record(prep, tailored_resume_id)?;
        }
        Command::Delete { tailored_resume_id } => {
            if !prep.delete(tailored_resume_id).await? {
                bail!("Backend did not confirm deletion of interview prep for tailored resume {tailored_resume_id}");
            }
            println!("deleted");
        }
        Command::Batch {
            base_resume_id,
            job_urls,
        } => {
            let job_urls = validate_job_urls(&job_urls, state.config.batch_max_jobs)?;
            let (progress, mut updates) = watch::channel(Vec::<BatchResult>::new());

            let reporter = tokio::spawn(async move {
                while updates.changed().await.is_ok() {
                    let snapshot = updates.borrow_and_update().clone();
                    let done = snapshot.iter().filter(|r| !r.status.is_active()).count();
                    info!("Batch progress: {done}/{} settled", snapshot.len());
                }
            });

            let results = state
                .batch
                .submit_batch_observed(base_resume_id, &job_urls, &progress)
                .await;
            drop(progress);
            if let Err(e) = reporter.await {
                warn!("Batch progress reporter failed: {e}");
            }

            print_json(&results)?;
        }
        Command::Stars { tailored_resume_id } => {
            let count = prep.star_story_count(tailored_resume_id).await?;
            println!("{count}");
        }
        Command::Check {
            tailored_resume_id,
            item_id,
        } => {
            // Syncs need the interview prep id; without one the edit stays local
            prep.try_load(tailored_resume_id).await;
            prep.hydrate_annotations(tailored_resume_id).await?;
            let checked = prep.toggle_check(tailored_resume_id, &item_id).await?;
            println!("{item_id}: {}", if checked { "checked" } else { "unchecked" });
        }
        Command::Date {
            tailored_resume_id,
            date,
        } => {
            // Syncs need the interview prep id; without one the edit stays local
            prep.try_load(tailored_resume_id).await;
            prep.hydrate_annotations(tailored_resume_id).await?;
            prep.save_interview_date(tailored_resume_id, &date).await?;
            print_json(&prep.annotations(tailored_resume_id))?;
        }
    }

    prep.flush_pending_syncs().await;
    Ok(())
}

/// Waits until no sub-analysis of the record is loading, or the timeout passes.
async fn settle(
    prep: &PrepCache,
    tailored_resume_id: i64,
    mut events: broadcast::Receiver<PrepEvent>,
    timeout: Duration,
) {
    let waiting = async {
        loop {
            match prep.get(tailored_resume_id) {
                Some(record) if record.any_loading() => {}
                _ => return,
            }
            match events.recv().await {
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    };
    if tokio::time::timeout(timeout, waiting).await.is_err() {
        warn!("Sub-analyses for tailored resume {tailored_resume_id} still loading after {timeout:?}");
    }
}

fn print_record(prep: &PrepCache, tailored_resume_id: i64) -> Result<()> {
    let record = prep
        .get(tailored_resume_id)
        .with_context(|| format!("No cached interview prep for tailored resume {tailored_resume_id}"))?;
    print_json(&record)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
