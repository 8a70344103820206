//! Derived figures for the dashboard header and reports page.
//!
//! Everything here is recomputed from a snapshot on each call; nothing is
//! accumulated, so repeated refreshes can never double count.

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::limits::MAX_REVENUE_WINDOW_DAYS;
use crate::model::*;

use super::Engine;

/// Nightly price used when a room has none of its own.
fn tier_rate(room_type: RoomType) -> f64 {
    match room_type {
        RoomType::Suite => 350.0,
        RoomType::Deluxe => 250.0,
        RoomType::Standard => 180.0,
    }
}

/// Price when the reservation points at a room that no longer exists.
const UNKNOWN_ROOM_RATE: f64 = 200.0;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `round(occupied / total * 100)`, 0 for an empty hotel.
pub fn occupancy_rate(occupied: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (occupied as f64 / total as f64 * 100.0).round() as u32
}

pub fn nightly_rate(room: Option<&Room>) -> f64 {
    match room {
        Some(r) if r.rate > 0.0 => r.rate,
        Some(r) => tier_rate(r.room_type),
        None => UNKNOWN_ROOM_RATE,
    }
}

fn revenue_on(rooms: &HashMap<RoomId, &Room>, reservations: &[Reservation], day: NaiveDate) -> (f64, usize) {
    reservations
        .iter()
        .filter(|r| r.is_confirmed() && r.stay.contains_date(day))
        .fold((0.0, 0), |(sum, sold), r| {
            (sum + nightly_rate(rooms.get(&r.room_id).copied()), sold + 1)
        })
}

fn index(rooms: &[Room]) -> HashMap<RoomId, &Room> {
    rooms.iter().map(|r| (r.id, r)).collect()
}

pub fn desk_metrics(rooms: &[Room], reservations: &[Reservation], today: NaiveDate) -> DeskMetrics {
    let total_rooms = rooms.len();
    let occupied_rooms = rooms
        .iter()
        .filter(|r| r.status == RoomStatus::Occupied)
        .count();
    let (today_revenue, rooms_sold) = revenue_on(&index(rooms), reservations, today);
    // Numerator and denominator both count bookings in house today.
    let adr = if rooms_sold == 0 {
        0.0
    } else {
        round2(today_revenue / rooms_sold as f64)
    };
    let revpar = if total_rooms == 0 {
        0.0
    } else {
        round2(today_revenue / total_rooms as f64)
    };
    DeskMetrics {
        total_rooms,
        occupied_rooms,
        occupancy_rate: occupancy_rate(occupied_rooms, total_rooms),
        rooms_sold,
        today_revenue,
        adr,
        revpar,
    }
}

/// Daily revenue for the `days` days ending on `last` (inclusive), oldest first.
/// Falls back to [`synthetic_history`] only when there are no reservations at all.
pub fn revenue_history(rooms: &[Room], reservations: &[Reservation], last: NaiveDate, days: u32) -> RevenueHistory {
    if reservations.is_empty() {
        return synthetic_history(last, days);
    }
    let rooms = index(rooms);
    let points = window(last, days)
        .map(|date| RevenuePoint {
            date,
            revenue: revenue_on(&rooms, reservations, date).0,
        })
        .collect();
    RevenueHistory {
        source: RevenueSource::Reservations,
        points,
    }
}

/// Demo filler: a deterministic weekly-shaped curve with weekend uplift.
/// Labelled [`RevenueSource::Synthetic`] so nobody mistakes it for real takings.
pub fn synthetic_history(last: NaiveDate, days: u32) -> RevenueHistory {
    let points = window(last, days)
        .map(|date| {
            let jitter = (i64::from(date.num_days_from_ce()) * 7919).rem_euclid(8000) as f64;
            let mut revenue = 12_000.0 + jitter;
            if matches!(date.weekday(), Weekday::Fri | Weekday::Sat) {
                revenue *= 1.3;
            }
            RevenuePoint {
                date,
                revenue: revenue.round(),
            }
        })
        .collect();
    RevenueHistory {
        source: RevenueSource::Synthetic,
        points,
    }
}

/// Trailing window against the window of the same length just before it.
pub fn revenue_comparison(
    rooms: &[Room],
    reservations: &[Reservation],
    today: NaiveDate,
    days: u32,
) -> RevenueComparison {
    let current = revenue_history(rooms, reservations, today, days);
    let previous_end = today - Duration::days(i64::from(days));
    let previous = revenue_history(rooms, reservations, previous_end, days);
    let (current_total, previous_total) = (current.total(), previous.total());
    let change_percent = (previous_total > 0.0)
        .then(|| ((current_total - previous_total) / previous_total * 1000.0).round() / 10.0);
    RevenueComparison {
        source: current.source,
        current: current_total,
        previous: previous_total,
        change_percent,
    }
}

fn window(last: NaiveDate, days: u32) -> impl Iterator<Item = NaiveDate> {
    let first = last - Duration::days(i64::from(days.saturating_sub(1)));
    first.iter_days().take(days as usize)
}

impl Engine {
    pub async fn metrics(&self) -> DeskMetrics {
        let (rooms, reservations) = self.snapshot().await;
        desk_metrics(&rooms, &reservations, self.today())
    }

    /// Occupied rooms out of the total, from room status.
    pub async fn occupancy(&self) -> OccupancySnapshot {
        let rooms = self.room_snapshot().await;
        OccupancySnapshot {
            occupied: rooms
                .iter()
                .filter(|r| r.status == RoomStatus::Occupied)
                .count(),
            total: rooms.len(),
        }
    }

    pub async fn revenue_history(&self) -> RevenueHistory {
        let (rooms, reservations) = self.snapshot().await;
        revenue_history(&rooms, &reservations, self.today(), self.revenue_window())
    }

    pub async fn revenue_comparison(&self) -> RevenueComparison {
        let (rooms, reservations) = self.snapshot().await;
        revenue_comparison(&rooms, &reservations, self.today(), self.revenue_window())
    }

    fn revenue_window(&self) -> u32 {
        self.settings
            .revenue_window_days
            .clamp(1, MAX_REVENUE_WINDOW_DAYS)
    }
}
