//! incidentctl - command-line host for the incident tracker.
//!
//! 1. Resolve configuration (flags > env > TOML file > defaults)
//! 2. Initialize the tracker with the configured backend
//! 3. Run one subcommand
//! 4. Flush queued writes before exiting

mod cli;
mod report;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use incident_core::{now_millis, Severity};
use incident_tracker::IncidentTracker;

use cli::{metadata_from_pairs, CliArgs, Command};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Tracing. Logs go to stderr so command output stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(args.resolve_log_level())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting incidentctl v{}", env!("CARGO_PKG_VERSION"));

    let config = args.resolve_tracker_config();
    tracing::info!(
        storage_type = ?config.storage_type,
        database_path = %config.database_path.display(),
        max_stored_incidents = config.max_stored_incidents,
        "Configuration resolved"
    );

    let tracker = IncidentTracker::new();
    tracker.init(config)?;

    run(&tracker, args.command).await?;

    tracker.flush().await?;
    Ok(())
}

async fn run(
    tracker: &IncidentTracker,
    command: Command,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Record {
            code,
            severity,
            message,
            screen,
            meta,
        } => {
            tracker.track_incident(
                &code,
                severity,
                &message,
                screen.as_deref(),
                metadata_from_pairs(meta),
            )?;
            println!("Recorded {} ({})", code, severity);
        }

        Command::Simulate { screen, count } => {
            tracker.track_screen(screen.as_str())?;
            for i in 0..count {
                let severity = Severity::ALL[i % Severity::ALL.len()];
                let mut metadata = incident_core::Metadata::new();
                metadata.insert("source".to_string(), "simulate".to_string());
                tracker.track_incident(
                    &format!("SIM_{:03}", i + 1),
                    severity,
                    &format!("Simulated {} incident", severity.as_str().to_lowercase()),
                    None,
                    metadata,
                )?;
            }
            println!("Simulated {} incidents on {}", count, screen);
        }

        Command::Summary { json } => {
            tracker.flush().await?;
            let summary = tracker.get_summary().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", report::render_summary(&summary));
            }
        }

        Command::Timeline { window, json } => {
            tracker.flush().await?;
            let timeline = tracker.get_timeline(window, now_millis()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&timeline)?);
            } else {
                print!("{}", report::render_timeline(&timeline));
            }
        }

        Command::Clear => {
            tracker.clear().await?;
            println!("Incident log cleared");
        }
    }
    Ok(())
}
