use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bus::Subscription;
use crate::engine::{Engine, occupancy_rate};
use crate::model::{HotelEvent, OccupancySnapshot, Topic};
use crate::observability::{OCCUPANCY_RATE, REFRESH_DURATION_SECONDS, REFRESH_FAILURES_TOTAL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerSettings {
    /// Periodic refresh; restarted after every event-driven refresh.
    pub interval: Duration,
    /// A refresh taking longer than this is abandoned until the next cycle.
    pub timeout: Duration,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(2),
        }
    }
}

/// Background task keeping the header's occupied/total counter current.
///
/// Refreshes on start, on every `guest.status-changed` and `room.status-changed`
/// event, and on each interval tick. Each refresh recomputes from the rooms, so
/// overlapping triggers cannot double count. Stops when `cancel` fires.
pub fn spawn_tracker(
    engine: Arc<Engine>,
    settings: TrackerSettings,
    cancel: CancellationToken,
) -> (watch::Receiver<OccupancySnapshot>, JoinHandle<()>) {
    let (tx, rx) = watch::channel(OccupancySnapshot::default());
    // Subscribe before spawning so nothing published after this call is missed.
    let guests = engine.bus.subscribe(Topic::GuestStatusChanged);
    let rooms = engine.bus.subscribe(Topic::RoomStatusChanged);
    let handle = tokio::spawn(run_tracker(engine, settings, cancel, tx, guests, rooms));
    (rx, handle)
}

async fn run_tracker(
    engine: Arc<Engine>,
    settings: TrackerSettings,
    cancel: CancellationToken,
    tx: watch::Sender<OccupancySnapshot>,
    guests: Subscription,
    rooms: Subscription,
) {
    let mut interval = tokio::time::interval(settings.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut guests = Some(guests);
    let mut rooms = Some(rooms);

    loop {
        let triggered_by_event = tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => false,
            received = next_event(&mut guests) => on_event(received, &mut guests),
            received = next_event(&mut rooms) => on_event(received, &mut rooms),
        };
        if triggered_by_event {
            interval.reset();
        }
        refresh(&engine, &tx, settings.timeout).await;
    }
    info!("occupancy tracker stopped");
}

/// Pending forever once the subscription is gone.
async fn next_event(sub: &mut Option<Subscription>) -> Result<HotelEvent, RecvError> {
    match sub {
        Some(s) => s.recv().await,
        None => std::future::pending().await,
    }
}

fn on_event(received: Result<HotelEvent, RecvError>, sub: &mut Option<Subscription>) -> bool {
    match received {
        Ok(event) => {
            debug!(topic = event.topic().as_str(), "refresh triggered by event");
        }
        Err(RecvError::Lagged(missed)) => {
            warn!(missed, "occupancy tracker lagged; resyncing");
        }
        Err(RecvError::Closed) => {
            if let Some(s) = sub.take() {
                warn!(topic = s.topic().as_str(), "event stream closed; relying on interval");
            }
        }
    }
    true
}

/// One bounded recompute. Failures are logged and counted, never fatal.
async fn refresh(engine: &Engine, tx: &watch::Sender<OccupancySnapshot>, timeout: Duration) {
    let started = Instant::now();
    match tokio::time::timeout(timeout, engine.occupancy()).await {
        Ok(snapshot) => {
            metrics::histogram!(REFRESH_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
            metrics::gauge!(OCCUPANCY_RATE).set(f64::from(occupancy_rate(snapshot.occupied, snapshot.total)));
            tx.send_if_modified(|current| {
                if *current == snapshot {
                    return false;
                }
                *current = snapshot;
                true
            });
        }
        Err(_) => {
            metrics::counter!(REFRESH_FAILURES_TOTAL).increment(1);
            warn!(timeout_ms = timeout.as_millis() as u64, "occupancy refresh timed out; skipping");
        }
    }
}
