//! Reserva booking engine entry point.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reserva::{
    create_rest_router, AccessTracker, ApiState, AvailabilityCache, Config, GenerateRequest,
    MemoryStore, ReservationManager, RestApiConfig, ServiceKind, SlotCatalog,
};

/// Reserva: Booking and Access-Window Engine
#[derive(Parser, Debug)]
#[command(name = "reserva")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the REST server (default behavior)
    Serve {
        /// HTTP port. If not specified, uses the config file value.
        #[arg(short, long)]
        port: Option<u16>,
        /// Enable JSON logging format
        #[arg(long)]
        json_logs: bool,
    },
    /// Bulk-generate slots for a date range
    Generate {
        /// Service (consultorio, entrenamiento, sala)
        service: ServiceKind,
        /// First day (YYYY-MM-DD)
        #[arg(short, long)]
        start: NaiveDate,
        /// End day, exclusive (YYYY-MM-DD)
        #[arg(short, long)]
        end: NaiveDate,
        /// Start times, comma-separated HH:MM
        #[arg(short, long)]
        times: String,
        /// Price per slot
        #[arg(short, long)]
        price: f64,
        /// Session length in minutes
        #[arg(short, long, default_value = "60")]
        duration: u16,
        /// Skip Saturdays and Sundays
        #[arg(long)]
        skip_weekends: bool,
    },
    /// List available slots for a service
    Slots {
        /// Service (consultorio, entrenamiento, sala)
        service: ServiceKind,
        /// First date of the listing (YYYY-MM-DD, default: today)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Maximum slots across all days
        #[arg(short, long, default_value = "30")]
        limit: usize,
    },
    /// Show expiring and expired access windows
    Feed {
        /// Evaluation instant (RFC 3339, default: now)
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let is_serve = matches!(args.command, Some(Command::Serve { .. }) | None);
    if !is_serve {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(std::io::stderr)
            .init();
    }

    let config = if let Some(path) = &args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    match args.command {
        Some(Command::Serve { port, json_logs }) => run_server(config, port, json_logs).await,
        None => run_server(config, None, false).await,
        Some(Command::Generate {
            service,
            start,
            end,
            times,
            price,
            duration,
            skip_weekends,
        }) => {
            let times = times
                .split(',')
                .map(|t| reserva::time::to_minutes(t.trim()))
                .collect::<reserva::Result<Vec<u16>>>()?;

            let state = build_state(&config);
            let outcome = state
                .catalog
                .generate(&GenerateRequest {
                    service,
                    start_date: start,
                    end_date: end,
                    times,
                    price,
                    duration_minutes: duration,
                    skip_weekends,
                    skip_existing: true,
                    weekdays: None,
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        Some(Command::Slots {
            service,
            from,
            limit,
        }) => {
            let state = build_state(&config);
            let days = state.catalog.list_available(service, from, limit).await?;
            println!("{}", serde_json::to_string_pretty(&days)?);
            Ok(())
        }
        Some(Command::Feed { at }) => {
            let state = build_state(&config);
            let candidates = state
                .tracker
                .notification_candidates(at.unwrap_or_else(Utc::now))
                .await?;
            println!("{}", serde_json::to_string_pretty(&candidates)?);
            Ok(())
        }
    }
}

/// Wire the engine components over a shared in-memory store.
fn build_state(config: &Config) -> ApiState {
    let store = Arc::new(MemoryStore::new());
    let cache = AvailabilityCache::new(&config.cache);

    ApiState::new(
        SlotCatalog::new(store.clone(), cache.clone(), config.booking.clone()),
        ReservationManager::new(store.clone(), cache, config.booking.clone()),
        AccessTracker::new(store, config.access.clone()),
    )
}

/// Run the REST server until interrupted.
async fn run_server(mut config: Config, port: Option<u16>, json_logs: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    if let Some(p) = port {
        config.server.http_port = p;
    }

    tracing::info!("Starting Reserva v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        port = config.server.http_port,
        grace_minutes = config.booking.grace_minutes,
        renewal_policy = ?config.access.renewal_policy,
        "Configuration loaded"
    );

    let state = Arc::new(build_state(&config));
    let router = create_rest_router(
        state,
        &RestApiConfig {
            enable_cors: config.server.enable_cors,
            ..Default::default()
        },
    );

    let addr = format!("0.0.0.0:{}", config.server.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}
