use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use daily_pulse::api::{self, middleware::SecurityConfig, AppState};
use daily_pulse::config::{CalendarArgs, StorageArgs};
use daily_pulse::heatmap::{heatmap, DEFAULT_WINDOW_DAYS};
use daily_pulse::models::HeatmapBucket;
use daily_pulse::review::end_day;
use daily_pulse::{Clock, SystemClock};

#[derive(Parser)]
#[command(name = "pulse")]
#[command(about = "Daily productivity tracker: tasks, habit streaks and daily reviews")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, env = "DAILY_PULSE_PORT", default_value = "5000")]
        port: u16,

        #[command(flatten)]
        storage: StorageArgs,

        #[command(flatten)]
        calendar: CalendarArgs,
    },
    /// Close out today for an owner and print the review
    EndDay {
        /// Owner id
        #[arg(long)]
        owner: Uuid,

        #[command(flatten)]
        storage: StorageArgs,

        #[command(flatten)]
        calendar: CalendarArgs,
    },
    /// Print completed activity per day over a trailing window
    Heatmap {
        /// Owner id
        #[arg(long)]
        owner: Uuid,

        /// Window length in days
        #[arg(long, default_value_t = DEFAULT_WINDOW_DAYS)]
        days: u32,

        #[command(flatten)]
        storage: StorageArgs,

        #[command(flatten)]
        calendar: CalendarArgs,
    },
}

/// Initialize tracing with output to stderr (for commands that print JSON) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "daily_pulse=debug,tower_http=debug".into()),
    );

    if use_stderr {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // One-shot commands print JSON on stdout
    let use_stderr = !matches!(cli.command, Commands::Serve { .. });
    init_tracing(use_stderr);

    match cli.command {
        Commands::Serve {
            port,
            storage,
            calendar,
        } => {
            tracing::info!("Starting Daily Pulse server on port {}", port);

            let db = storage.open()?;
            let state = AppState::new(db, Arc::new(SystemClock), calendar.calendar());
            let app = api::create_router_with_security(state, SecurityConfig::from_env());

            let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
            tracing::info!("Daily Pulse listening on http://127.0.0.1:{}/api/v1", port);

            axum::serve(listener, app).await?;
        }
        Commands::EndDay {
            owner,
            storage,
            calendar,
        } => {
            let db = storage.open()?;
            let outcome = end_day(&db, &calendar.calendar(), owner, SystemClock.now())?;
            if !outcome.created {
                tracing::info!("Review for {} already existed", outcome.review.day);
            }
            println!("{}", serde_json::to_string_pretty(&outcome.review)?);
        }
        Commands::Heatmap {
            owner,
            days,
            storage,
            calendar,
        } => {
            let db = storage.open()?;
            let map = heatmap(&db, &calendar.calendar(), owner, SystemClock.now(), days)?;
            let buckets: Vec<HeatmapBucket> = map.into_values().collect();
            println!("{}", serde_json::to_string_pretty(&buckets)?);
        }
    }

    Ok(())
}
