use anyhow::Context;
use chrono::{NaiveDate, NaiveTime};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use api_shared::RolePolicy;
use ed_core::config::{poll_interval_from_env_value, wait_targets_from_env_values};
use ed_core::constants::{
    DEFAULT_FOLIO_PREFIX, DEFAULT_REST_ADDR, ENV_API_KEY, ENV_POLL_INTERVAL_SECS, ENV_REST_ADDR,
    ENV_ROSTER, ENV_TARGET_PREFIX, ENV_TARGET_SUFFIX,
};
use ed_core::{
    CoreConfig, DashboardPoller, DashboardSnapshot, Doctor, MemoryStore, SeedFile, TriageService,
};

/// Main entry point for the ED triage application
///
/// Starts the REST server and the dashboard poller:
/// - REST server on port 3000 (configurable via ED_REST_ADDR)
/// - Dashboard poller logging a queue snapshot every ED_POLL_INTERVAL_SECS
///
/// Ctrl-C stops accepting requests and cancels the poller.
///
/// # Environment Variables
/// - `ED_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `ED_POLL_INTERVAL_SECS`: dashboard refresh interval (default: 30)
/// - `ED_TARGET_<LEVEL>_MINUTES`: per-level wait target overrides
/// - `ED_ROSTER`: optional YAML file seeding patients, records and doctors
/// - `API_KEY`: API key required in the `x-api-key` header
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, seeding or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ed=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var(ENV_REST_ADDR).unwrap_or_else(|_| DEFAULT_REST_ADDR.into());
    let api_key = std::env::var(ENV_API_KEY).with_context(|| format!("{ENV_API_KEY} not set"))?;

    let poll_interval = poll_interval_from_env_value(std::env::var(ENV_POLL_INTERVAL_SECS).ok())?;
    let wait_targets = wait_targets_from_env_values(|level| {
        let name = format!(
            "{ENV_TARGET_PREFIX}{}{ENV_TARGET_SUFFIX}",
            level.as_str().to_ascii_uppercase()
        );
        std::env::var(name).ok()
    })?;
    let cfg = Arc::new(CoreConfig::new(
        poll_interval,
        wait_targets,
        DEFAULT_FOLIO_PREFIX.into(),
    )?);

    let seed = match std::env::var(ENV_ROSTER).ok() {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read roster {path}"))?;
            tracing::info!("-- Seeding from {}", path);
            SeedFile::parse(&text)?
        }
        None => SeedFile::default(),
    };

    let service = Arc::new(TriageService::new(
        cfg.clone(),
        Arc::new(MemoryStore::seeded(&seed)),
        Arc::new(RolePolicy),
    ));
    service.load_roster(seed.doctors);
    service.load_operational_day(chrono::Utc::now().date_naive())?;

    let mut poller = DashboardPoller::spawn(
        service.queue().clone(),
        cfg.poll_interval(),
        log_snapshot,
    );

    // No scheduling calendar is connected, so every active doctor counts as free.
    let availability = |_: &Doctor, _: NaiveDate, _: NaiveTime| true;
    let app = api_rest::router(AppState {
        service,
        api_key: Arc::from(api_key),
        availability: Arc::new(availability),
    });

    tracing::info!("++ Starting ED triage REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    poller.shutdown().await;
    tracing::info!("-- ED triage stopped");

    Ok(())
}

fn log_snapshot(snapshot: DashboardSnapshot) {
    let stats = snapshot.stats;
    if snapshot.has_critical {
        tracing::warn!(critical = stats.critical, "critical patients waiting");
    }
    tracing::info!(
        critical = stats.critical,
        urgent = stats.urgent,
        moderate = stats.moderate,
        low = stats.low,
        ambulatory = stats.ambulatory,
        overdue = snapshot.overdue,
        "queue status"
    );
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
}
