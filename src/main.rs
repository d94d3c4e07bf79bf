//! Alert Simulator Rehearsal Run
//!
//! Runs the random fault driver with a real config file against in-memory
//! collaborators, so an ignore list or platform filter can be checked
//! without touching a cluster. Stops on Ctrl-C or when the configured
//! iteration bound is reached.
//!
//! ```text
//! alert-sim <config.toml> [--fast]
//! ```
//!
//! `--fast` zeroes both waits.

use alert_sim::catalog::FaultCatalog;
use alert_sim::config::DriverConfig;
use alert_sim::driver::{CancellationToken, RandomFaultDriver};
use alert_sim::observability::{init_tracing, simulated_metrics};
use alert_sim::procedures::{ProcedureSettings, Procedures};
use alert_sim::simulated::{SimulatedConfigStore, SimulatedInjector, SimulatedNode};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

const FINISH_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args: Vec<String> = std::env::args().collect();
    let Some(config_path) = args.get(1).filter(|a| !a.starts_with("--")) else {
        eprintln!("usage: alert-sim <config.toml> [--fast]");
        std::process::exit(2);
    };
    let fast = args.iter().any(|a| a == "--fast");

    let mut config = DriverConfig::from_file(config_path)?;
    if fast {
        config = config.with_waits(0, 0);
    }
    init_tracing(&config.log)?;

    let catalog = Arc::new(FaultCatalog::standard());
    config.validate(&catalog)?;

    println!("Alert Simulator (rehearsal)");
    println!("===========================");
    println!("  Config: {}", config_path);
    println!("  Setup: {}", config.setup_type);
    println!("  Ignored: {:?}", config.ignore_list);
    println!("  Monitor mode: {}", config.monitor_mode);
    match config.max_iterations {
        Some(max) => println!("  Iterations: {}", max),
        None => println!("  Iterations: until Ctrl-C"),
    }
    println!();

    let procedures = Procedures::new(
        Box::new(SimulatedNode::new()),
        Box::new(SimulatedConfigStore::new()),
        ProcedureSettings::from_config(&config),
    );
    let injector = SimulatedInjector::new();
    let metrics = simulated_metrics();
    let driver = RandomFaultDriver::new(config, catalog, procedures, Box::new(injector.clone()))
        .with_metrics(metrics.clone());
    info!(seed = driver.seed(), "Starting rehearsal");

    let handle = driver.spawn(CancellationToken::new())?;

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received, finishing current iteration");
            handle.cancel();
        }
        _ = async {
            while !handle.is_finished() {
                tokio::time::sleep(FINISH_POLL_INTERVAL).await;
            }
        } => {}
    }

    let report = match tokio::task::spawn_blocking(move || handle.join()).await? {
        Ok(report) => report,
        Err(e) => {
            error!("Driver stopped: {}", e);
            return Err(e.into());
        }
    };

    println!();
    println!("{}", report);
    println!("  Injection calls: {}", injector.requests().len());
    println!(
        "  Failed steps: {}",
        metrics.count_tagged("driver.step", "status:error")
    );
    Ok(())
}
