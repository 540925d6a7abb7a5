mod api;
mod cli;
mod db;
mod pg_store;
mod router;
mod scheduler;
mod state;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{info, warn};

use adpilot_core::Config;
use adpilot_rules::platform::{AdPlatform, SimulatedPlatform};
use adpilot_rules::AutomationStore;

use crate::cli::{Cli, Command};
use crate::pg_store::PgStore;
use crate::scheduler::BatchSchedule;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    adpilot_core::config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match cli.profile.as_deref() {
        Some(profile) => Config::for_profile(profile),
        None => Config::from_env(),
    };
    config.validate()?;
    config.log_summary();

    let store = open_store(&config).await;
    let platform: Arc<dyn AdPlatform> = Arc::new(SimulatedPlatform);
    info!("Ad platform: {}", platform.platform_name());
    let state = Arc::new(AppState::new(store, platform, &config.automation));

    match cli.command() {
        Command::Serve => serve(&config, state).await,
        Command::RunOnce => run_once(&state).await,
    }
}

/// Connect to PostgreSQL. A failure is kept as a message so the server can
/// still start and report it on the automation endpoint.
async fn open_store(config: &Config) -> Result<Arc<dyn AutomationStore>, String> {
    match db::init_pg_pool(&config.postgres).await {
        Ok(pool) => Ok(Arc::new(PgStore::new(pool))),
        Err(e) => {
            warn!("PostgreSQL unavailable: {:#}", e);
            Err(e.to_string())
        }
    }
}

async fn serve(config: &Config, state: Arc<AppState>) -> anyhow::Result<()> {
    if let Some(expr) = config.automation.cron.as_deref() {
        match (state.runner(), BatchSchedule::parse(expr, Utc::now())) {
            (Ok(runner), Ok(schedule)) => {
                let tick = Duration::from_secs(config.automation.tick_secs);
                tokio::spawn(scheduler::run_schedule_loop(runner.clone(), schedule, tick));
            }
            (Err(reason), _) => {
                warn!("Scheduler disabled: {}", reason);
            }
            (_, Err(e)) => {
                warn!("Scheduler disabled: invalid AUTOMATION_CRON '{}': {}", expr, e);
            }
        }
    }

    let app = router::build_router(state);

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);
    info!("API docs at http://{}/docs", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_once(state: &AppState) -> anyhow::Result<()> {
    let runner = state.runner().map_err(|reason| anyhow::anyhow!("{}", reason))?;
    let outcome = runner.run().await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
