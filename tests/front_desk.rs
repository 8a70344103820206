use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use frontdesk::bus::{EventBus, Subscription};
use frontdesk::clock::FixedClock;
use frontdesk::config::{self, DeskConfig};
use frontdesk::engine::{Engine, EngineError, EngineSettings};
use frontdesk::model::*;
use frontdesk::refresh::{TrackerSettings, spawn_tracker};
use frontdesk::repo::*;
use frontdesk::seed::SeedData;

const WAIT: Duration = Duration::from_secs(5);

// ── Test infrastructure ──────────────────────────────────────

fn desk(settings: EngineSettings) -> Arc<Engine> {
    let day = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
    let engine = Engine::new(Arc::new(EventBus::new()), Arc::new(FixedClock::on(day)), settings);
    engine.load_seed(SeedData::embedded().unwrap()).unwrap();
    Arc::new(engine)
}

/// Wait for the next event with timeout.
async fn next_event(sub: &mut Subscription) -> Option<HotelEvent> {
    tokio::time::timeout(WAIT, sub.recv()).await.ok()?.ok()
}

async fn wait_for_occupied(rx: &mut watch::Receiver<OccupancySnapshot>, occupied: usize) -> OccupancySnapshot {
    *tokio::time::timeout(WAIT, rx.wait_for(|s| s.occupied == occupied))
        .await
        .expect("occupancy never reached")
        .unwrap()
}

// ── Tests ────────────────────────────────────────────────────

#[tokio::test]
async fn header_counter_follows_check_in_and_out() {
    let engine = desk(EngineSettings::default());
    let cancel = CancellationToken::new();
    let settings = TrackerSettings {
        interval: Duration::from_secs(3600),
        timeout: Duration::from_secs(1),
    };
    let (mut rx, tracker) = spawn_tracker(engine.clone(), settings, cancel.clone());

    let start = wait_for_occupied(&mut rx, 3).await;
    assert_eq!(start.total, 11);

    // Michael Chen returns to 412.
    engine.guests().check_in(3).await.unwrap();
    assert_eq!(wait_for_occupied(&mut rx, 4).await.total, 11);

    engine.guests().check_out(1).await.unwrap();
    engine.guests().check_out(2).await.unwrap();
    wait_for_occupied(&mut rx, 2).await;

    cancel.cancel();
    tokio::time::timeout(WAIT, tracker).await.unwrap().unwrap();
}

#[tokio::test]
async fn turnover_of_a_suite() {
    let engine = desk(EngineSettings::default());
    let mut rooms = engine.bus.subscribe(Topic::RoomStatusChanged);
    let mut guests = engine.bus.subscribe(Topic::GuestStatusChanged);
    let mut tasks = engine.bus.subscribe(Topic::TaskCompleted);

    // John Smith leaves 301, housekeeping cleans it.
    engine.guests().check_out(1).await.unwrap();
    engine.tasks().move_to(1, TaskStatus::InProgress).await.unwrap();
    engine.tasks().move_to(1, TaskStatus::Completed).await.unwrap();

    let first = next_event(&mut rooms).await.unwrap();
    let second = next_event(&mut rooms).await.unwrap();
    assert_eq!(
        (first, second),
        (
            HotelEvent::RoomStatusChanged {
                room_id: 301,
                previous_status: RoomStatus::Occupied,
                new_status: RoomStatus::Cleaning,
            },
            HotelEvent::RoomStatusChanged {
                room_id: 301,
                previous_status: RoomStatus::Cleaning,
                new_status: RoomStatus::Vacant,
            },
        )
    );
    assert!(matches!(
        next_event(&mut guests).await,
        Some(HotelEvent::GuestStatusChanged {
            guest_id: 1,
            status: GuestStatus::CheckedOut,
            ..
        })
    ));
    assert!(matches!(
        next_event(&mut tasks).await,
        Some(HotelEvent::TaskCompleted { task_type: TaskType::Cleaning, .. })
    ));

    // The suite can take the next arrival.
    let arrival = engine
        .guests()
        .create(GuestDraft {
            name: "Ana Ruiz".into(),
            email: String::new(),
            phone: String::new(),
            room_id: 301,
            check_in_date: NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(),
            check_out_date: NaiveDate::from_ymd_opt(2024, 1, 19).unwrap(),
            status: None,
            vip: false,
            special_requests: vec![],
        })
        .await
        .unwrap();
    assert_eq!(arrival.status, GuestStatus::CheckedIn);
    let suite = engine.rooms().get(301).await.unwrap();
    assert_eq!(suite.occupancy.unwrap().guest_name, "Ana Ruiz");
}

#[tokio::test]
async fn event_payload_is_camel_case_json() {
    let engine = desk(EngineSettings::default());
    let mut guests = engine.bus.subscribe(Topic::GuestStatusChanged);
    engine.guests().check_out(6).await.unwrap();

    let event = next_event(&mut guests).await.expect("expected event");
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["topic"], "guest.status-changed");
    assert_eq!(json["payload"]["guestId"], 6);
    assert_eq!(json["payload"]["roomNumber"], "234");
    assert_eq!(json["payload"]["status"], "checked-out");
}

#[tokio::test]
async fn strict_desk_from_configuration() {
    let env: HashMap<&str, &str> = [(config::STRICT_TRANSITIONS, "1"), (config::ENFORCE_NO_OVERLAP, "0")].into();
    let cfg = DeskConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));
    let engine = desk(cfg.engine_settings());

    // Occupied 301 straight to vacant skips cleaning.
    let err = engine.rooms().set_status(301, RoomStatus::Vacant).await.unwrap_err();
    assert!(matches!(err, EngineError::TransitionNotAllowed { .. }));
    engine.rooms().override_status(301, RoomStatus::Vacant).await.unwrap();

    // Overlap enforcement is off: double booking 101 is accepted.
    let clash = engine
        .reservations()
        .create(ReservationDraft {
            guest_name: "Walk In".into(),
            room_id: 101,
            check_in: NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2024, 1, 17).unwrap(),
            guests: 1,
        })
        .await;
    assert!(clash.is_ok());
}

#[tokio::test]
async fn seed_file_replaces_embedded_dataset() {
    let dir = std::env::temp_dir().join(format!("frontdesk_seed_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("hotel.json");
    std::fs::write(
        &path,
        r##"{
            "rooms": [
                { "id": 7, "number": "7A", "roomType": "suite", "floor": 7, "capacity": 2,
                  "rate": 0.0, "status": "vacant", "housekeepingStatus": "ready" }
            ],
            "reservations": [
                { "id": 40, "guestName": "Ida Nilsen", "roomId": 7, "checkIn": "2024-01-16",
                  "checkOut": "2024-01-18", "guests": 2, "status": "confirmed", "color": "#06B6D4" }
            ]
        }"##,
    )
    .unwrap();

    let seed = SeedData::from_path(&path).unwrap();
    let day = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
    let engine = Engine::new(
        Arc::new(EventBus::new()),
        Arc::new(FixedClock::on(day)),
        EngineSettings::default(),
    );
    engine.load_seed(seed).unwrap();

    assert_eq!(engine.rooms().list().await.len(), 1);
    assert!(engine.guests().list().await.is_empty());
    // Rate 0 falls back to the suite tier.
    let metrics = engine.metrics().await;
    assert_eq!(metrics.today_revenue, 350.0);
    assert_eq!(metrics.revpar, 350.0);

    let next = engine
        .reservations()
        .create(ReservationDraft {
            guest_name: "Next".into(),
            room_id: 7,
            check_in: NaiveDate::from_ymd_opt(2024, 1, 18).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2024, 1, 19).unwrap(),
            guests: 1,
        })
        .await
        .unwrap();
    assert_eq!(next.id, 41);

    std::fs::remove_dir_all(&dir).ok();
}
