//! Failover control daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │                      FAILOVER DAEMON                         │
//!   │                                                              │
//!   │  ┌──────────────┐  report_failure   ┌──────────────────┐     │
//!   │  │health monitor│──────────────────▶│ FailoverRegistry │     │
//!   │  └──────┬───────┘                   │  pools, events,  │     │
//!   │         │ HTTP probe                │  callbacks       │     │
//!   │         ▼                           └───┬──────────┬───┘     │
//!   │    instances ◀───── recovery probe ─────┘          │         │
//!   │                                                    │         │
//!   │  ┌──────────────┐   status / manual fail           │         │
//!   │  │  admin API   │◀─────────────────────────────────┘         │
//!   │  └──────────────┘                                            │
//!   │                                                              │
//!   │  config · logging · metrics · signals / shutdown             │
//!   └──────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use failover_control::admin::{self, AdminState};
use failover_control::config::{load_config, AppConfig};
use failover_control::health::{HealthMonitor, HttpProbe};
use failover_control::lifecycle::{signals, startup, Shutdown};
use failover_control::observability::{logging, metrics};
use failover_control::RecoveryProbe;

#[derive(Parser)]
#[command(name = "failover-control", version, about = "Failover and redundancy control daemon")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "FAILOVER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "failover-control starting");

    tracing::info!(
        config = ?args.config,
        strategy = %config.failover.strategy,
        pools = config.pools.len(),
        recovery_timeout_secs = config.failover.recovery_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let probe: Arc<dyn RecoveryProbe> = Arc::new(HttpProbe::new(&config.health_check));
    let registry = startup::build_registry(&config, probe.clone())?;
    let shutdown = Shutdown::new(registry.clone());

    let monitor = HealthMonitor::new(registry.clone(), config.health_check.clone(), probe);
    let monitor_task = tokio::spawn(monitor.run(shutdown.subscribe()));

    let admin_task = if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        let state = AdminState {
            registry: registry.clone(),
            api_key: Arc::from(config.admin.api_key.as_str()),
        };
        Some(tokio::spawn(admin::serve(listener, state, shutdown.subscribe())))
    } else {
        None
    };

    signals::wait_for_signal().await;
    shutdown.trigger();

    if let Err(e) = monitor_task.await {
        tracing::error!(error = %e, "Health monitor task failed");
    }
    if let Some(task) = admin_task {
        match task.await {
            Ok(Err(e)) => tracing::error!(error = %e, "Admin server error"),
            Err(e) => tracing::error!(error = %e, "Admin server task failed"),
            Ok(Ok(())) => {}
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
