use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use frontdesk::bus::EventBus;
use frontdesk::clock::SystemClock;
use frontdesk::config::DeskConfig;
use frontdesk::engine::Engine;
use frontdesk::refresh::spawn_tracker;
use frontdesk::seed::SeedData;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = DeskConfig::from_env();
    frontdesk::observability::init(config.metrics_port)?;

    let seed = match &config.seed_path {
        Some(path) => SeedData::from_path(path)?,
        None => SeedData::embedded()?,
    };

    let bus = Arc::new(EventBus::new());
    let engine = Arc::new(Engine::new(bus, Arc::new(SystemClock), config.engine_settings()));
    engine.load_seed(seed)?;

    info!("frontdesk started");
    info!("  seed: {}", config.seed_path.as_ref().map_or("embedded".to_string(), |p| p.display().to_string()));
    info!("  transitions: {:?}", engine.settings().policy);
    info!("  overlap enforcement: {}", config.enforce_no_overlap);
    info!("  refresh: every {:?}, timeout {:?}", config.refresh_interval, config.refresh_timeout);
    info!("  metrics: {}", config.metrics_port.map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics")));

    let cancel = CancellationToken::new();
    let (mut occupancy, tracker) = spawn_tracker(engine.clone(), config.tracker_settings(), cancel.clone());

    // Shut down on SIGTERM/ctrl-c
    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => {}
                        _ = sigterm.recv() => {}
                    }
                }
                Err(e) => {
                    tracing::warn!("no SIGTERM handler ({e}); waiting for ctrl-c only");
                    ctrl_c.await.ok();
                }
            }
        }
        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
        }
    };
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = occupancy.changed() => {
                if changed.is_err() {
                    tracing::error!("occupancy tracker exited unexpectedly");
                    break;
                }
                let snapshot = *occupancy.borrow_and_update();
                info!(occupied = snapshot.occupied, total = snapshot.total, "occupancy");
            }
            _ = &mut shutdown => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    cancel.cancel();
    info!("draining background tasks...");
    match tokio::time::timeout(DRAIN_TIMEOUT, tracker).await {
        Ok(Ok(())) => info!("occupancy tracker drained"),
        Ok(Err(e)) => tracing::error!("occupancy tracker failed: {e}"),
        Err(_) => tracing::warn!("drain timeout, occupancy tracker still running"),
    }

    let metrics = engine.metrics().await;
    info!(
        occupancy_rate = metrics.occupancy_rate,
        revenue = metrics.today_revenue,
        "final desk metrics"
    );
    info!("frontdesk stopped");
    Ok(())
}
