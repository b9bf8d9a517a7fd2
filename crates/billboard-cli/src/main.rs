//! Billboard CLI: local video store and moderation pipeline from a terminal.
//!
//! Configuration comes from the environment (and `.env`), see `ModerationConfig`.
//! Every command prints JSON on stdout; logs go to stderr.

use anyhow::Context;
use billboard_cli::{init_tracing, parse_video_id, BookingKind, ContextArgs};
use billboard_core::{ErrorMetadata, ModerationConfig};
use billboard_moderation::{ModerationOrchestrator, ModerationSession};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "billboard", about = "Billboard video moderation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and store a video for a booking
    Store {
        /// Path to the video file
        file: PathBuf,
        #[arg(long)]
        user: String,
        #[arg(long)]
        booking: String,
        /// Display name recorded instead of the file name
        #[arg(long)]
        name: Option<String>,
    },
    /// List stored videos
    List {
        #[arg(long)]
        user: Option<String>,
        #[arg(long, conflicts_with = "user")]
        booking: Option<String>,
    },
    /// Get a stored video record by ID
    Get {
        /// Video UUID
        id: String,
    },
    /// Moderate a video and print the full decision
    Analyze {
        /// Path to the video file
        file: PathBuf,
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        user_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        booking: Option<String>,
        #[arg(long, value_enum)]
        booking_type: Option<BookingKind>,
        #[arg(long)]
        billboard: Option<String>,
    },
    /// Quick pass/fail check of a video
    Check {
        /// Path to the video file
        file: PathBuf,
    },
    /// Delete a stored video by ID
    Delete {
        /// Video UUID
        id: String,
    },
    /// Delete videos uploaded more than the given number of days ago
    Cleanup {
        #[arg(long, default_value = "30")]
        days: u32,
    },
    /// Storage statistics
    Stats,
    /// Local path of an approved video
    Playback {
        /// Video UUID
        id: String,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ModerationConfig::from_env().context("Invalid moderation configuration")?;
    let cli = Cli::parse();

    let orchestrator = ModerationOrchestrator::from_config(&config)
        .await
        .context("Failed to build moderation pipeline")?;
    let store = orchestrator
        .store()
        .cloned()
        .context("Video store not configured")?;

    match cli.command {
        Commands::Store {
            file,
            user,
            booking,
            name,
        } => {
            let response = store
                .store_video_response(&file, &user, &booking, name.as_deref())
                .await;
            print_json(&response)?;
        }
        Commands::List { user, booking } => match (user, booking) {
            (Some(user), _) => print_json(&store.get_videos_by_user(&user).await)?,
            (None, Some(booking)) => print_json(&store.get_video_by_booking(&booking).await)?,
            (None, None) => print_json(&store.get_all_videos().await)?,
        },
        Commands::Get { id } => {
            let record = store.get_video(parse_video_id(&id)?).await;
            print_json(&record)?;
        }
        Commands::Analyze {
            file,
            user,
            user_name,
            email,
            booking,
            booking_type,
            billboard,
        } => {
            let context = ContextArgs {
                user_id: user,
                user_name,
                email,
                booking_id: booking,
                booking_kind: booking_type,
                billboard,
            };

            let orchestrator = Arc::new(orchestrator);
            let session =
                ModerationSession::new(orchestrator.clone()).with_tick(config.progress_tick());

            let mut progress = session.subscribe();
            let reporter = tokio::spawn(async move {
                while progress.changed().await.is_ok() {
                    let state = progress.borrow_and_update().clone();
                    tracing::info!(progress = state.progress, status = ?state.status, "Analysis progress");
                }
            });

            let outcome = session
                .analyze_video(file, context.user(), context.booking())
                .await;
            orchestrator.wait_for_side_effects().await;
            drop(session);
            let _ = reporter.await;

            match outcome {
                Ok(decision) => print_json(&decision)?,
                Err(e) => {
                    print_json(&serde_json::json!({
                        "status": "error",
                        "code": e.error_code(),
                        "message": e.client_message(),
                        "recoverable": e.is_recoverable(),
                    }))?;
                    return Err(anyhow::anyhow!(e.detailed_message()));
                }
            }
        }
        Commands::Check { file } => {
            let check = orchestrator.moderate_video_simple(&file).await;
            print_json(&check)?;
        }
        Commands::Delete { id } => {
            let deleted = store.delete_video(parse_video_id(&id)?).await;
            print_json(&serde_json::json!({ "success": deleted, "id": id }))?;
        }
        Commands::Cleanup { days } => {
            let deleted = store.cleanup_old_videos(days).await;
            print_json(&serde_json::json!({ "deleted": deleted, "daysOld": days }))?;
        }
        Commands::Stats => {
            print_json(&store.get_storage_stats().await)?;
        }
        Commands::Playback { id } => {
            let path = store.get_video_for_playback(parse_video_id(&id)?).await;
            print_json(&serde_json::json!({ "id": id, "path": path }))?;
        }
    }

    Ok(())
}
