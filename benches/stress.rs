use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chrono::{Days, NaiveDate};

use frontdesk::bus::EventBus;
use frontdesk::clock::FixedClock;
use frontdesk::engine::{Engine, EngineSettings};
use frontdesk::model::*;
use frontdesk::repo::*;

const ROOMS: u32 = 200;

fn base_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date")
}

fn day(offset: u64) -> NaiveDate {
    base_day() + Days::new(offset)
}

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.3}ms, p50={:.3}ms, p95={:.3}ms, p99={:.3}ms, max={:.3}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies.last().unwrap().as_secs_f64() * 1000.0,
    );
}

async fn setup() -> Arc<Engine> {
    let engine = Engine::new(
        Arc::new(EventBus::new()),
        Arc::new(FixedClock::on(base_day())),
        EngineSettings::default(),
    );
    for n in 0..ROOMS {
        engine
            .rooms()
            .create(RoomDraft {
                number: format!("{}", 100 + n),
                room_type: [RoomType::Standard, RoomType::Deluxe, RoomType::Suite][(n % 3) as usize],
                floor: (n / 20) as i32 + 1,
                capacity: 2 + n % 3,
                rate: 150.0 + f64::from(n % 3) * 100.0,
                status: None,
                occupancy: None,
                housekeeping_status: None,
            })
            .await
            .unwrap();
    }
    println!("  created {ROOMS} rooms");
    Arc::new(engine)
}

fn stay(guest: String, room_id: RoomId, offset: u64, nights: u64) -> ReservationDraft {
    ReservationDraft {
        guest_name: guest,
        room_id,
        check_in: day(offset),
        check_out: day(offset + nights),
        guests: 1,
    }
}

async fn phase1_sequential(engine: &Engine) {
    let n = 5000u64;
    let mut latencies = Vec::with_capacity(n as usize);
    let start = Instant::now();

    for i in 0..n {
        let room_id = (i % u64::from(ROOMS)) as RoomId + 1;
        let offset = (i / u64::from(ROOMS)) * 2;
        let t = Instant::now();
        engine
            .reservations()
            .create(stay(format!("Guest {i}"), room_id, offset, 2))
            .await
            .unwrap();
        latencies.push(t.elapsed());
    }

    let elapsed = start.elapsed();
    let ops = n as f64 / elapsed.as_secs_f64();
    println!("  {n} bookings in {:.2}s = {ops:.0} ops/sec", elapsed.as_secs_f64());
    print_latency("booking latency", &mut latencies);
}

async fn phase2_concurrent(engine: Arc<Engine>) {
    let n_tasks = 20u64;
    let n_per_task = 250u64;
    let start = Instant::now();
    let mut handles = Vec::new();

    for t in 0..n_tasks {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            for j in 0..n_per_task {
                // Far enough out to never collide with phase 1.
                let room_id = ((t * 7 + j) % u64::from(ROOMS)) as RoomId + 1;
                let offset = 400 + (t * n_per_task + j) * 3;
                engine
                    .reservations()
                    .create(stay(format!("Task {t} guest {j}"), room_id, offset, 1))
                    .await
                    .unwrap();
            }
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let elapsed = start.elapsed();
    let total = n_tasks * n_per_task;
    let ops = total as f64 / elapsed.as_secs_f64();
    println!(
        "  {n_tasks} tasks x {n_per_task} bookings = {total} total in {:.2}s = {ops:.0} ops/sec",
        elapsed.as_secs_f64()
    );
}

async fn phase3_read_under_load(engine: Arc<Engine>) {
    let stop = Arc::new(AtomicBool::new(false));
    let mut writers = Vec::new();
    for w in 0..4u32 {
        let engine = engine.clone();
        let stop = stop.clone();
        writers.push(tokio::spawn(async move {
            let mut i = 0u32;
            while !stop.load(Ordering::Relaxed) {
                let room_id = (w * 50 + i % 50) % ROOMS + 1;
                let target = if i % 2 == 0 {
                    RoomStatus::Cleaning
                } else {
                    RoomStatus::Vacant
                };
                let _ = engine.rooms().set_status(room_id, target).await;
                i += 1;
                tokio::task::yield_now().await;
            }
        }));
    }

    let n_readers = 8;
    let reads_per_reader = 200;
    let mut readers = Vec::new();
    for _ in 0..n_readers {
        let engine = engine.clone();
        readers.push(tokio::spawn(async move {
            let mut latencies = Vec::with_capacity(reads_per_reader);
            for _ in 0..reads_per_reader {
                let t = Instant::now();
                let metrics = engine.metrics().await;
                assert_eq!(metrics.total_rooms, ROOMS as usize);
                latencies.push(t.elapsed());
            }
            latencies
        }));
    }

    let mut all = Vec::new();
    for h in readers {
        all.extend(h.await.unwrap());
    }
    stop.store(true, Ordering::Relaxed);
    for h in writers {
        let _ = h.await;
    }
    print_latency("desk metrics", &mut all);
}

async fn phase4_contention(engine: Arc<Engine>) {
    let n_attempts = 500;
    let room_id = 1;
    let won = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let mut handles = Vec::new();
    for i in 0..n_attempts {
        let engine = engine.clone();
        let won = won.clone();
        handles.push(tokio::spawn(async move {
            let draft = stay(format!("Contender {i}"), room_id, 2000, 3);
            if engine.reservations().create(draft).await.is_ok() {
                won.fetch_add(1, Ordering::Relaxed);
            }
        }));
    }
    for h in handles {
        let _ = h.await;
    }

    let won = won.load(Ordering::Relaxed);
    println!(
        "  {n_attempts} bookings racing for one stay: {won} accepted in {:.2}s",
        start.elapsed().as_secs_f64()
    );
    assert_eq!(won, 1, "overlap check let a double booking through");
}

#[tokio::main]
async fn main() {
    println!("=== frontdesk stress benchmark ===\n");

    println!("[setup]");
    let engine = setup().await;

    println!("\n[phase 1] sequential booking throughput");
    phase1_sequential(&engine).await;

    println!("\n[phase 2] concurrent booking throughput");
    phase2_concurrent(engine.clone()).await;

    println!("\n[phase 3] metrics latency under status churn");
    phase3_read_under_load(engine.clone()).await;

    println!("\n[phase 4] contention on a single stay");
    phase4_contention(engine.clone()).await;

    println!("\n=== done ===");
}
