//! Reservation interval queries and month calendar projection.
//!
//! Two range semantics live side by side on purpose:
//! occupancy membership is half-open (`Stay::contains_date`), while window queries
//! such as "everything visible this month" are closed on both ends (`Stay::touches`).

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate};

use crate::limits::*;
use crate::model::*;

use super::EngineError;

/// Reservations whose stay touches `[start, end]`, boundary days included.
pub fn by_date_range<'a>(
    reservations: impl IntoIterator<Item = &'a Reservation>,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<Reservation> {
    reservations
        .into_iter()
        .filter(|r| r.stay.touches(start, end))
        .cloned()
        .collect()
}

/// Reservations occupying the room on `day` (checkout day excluded).
pub fn in_house_on<'a>(
    reservations: impl IntoIterator<Item = &'a Reservation>,
    day: NaiveDate,
) -> Vec<&'a Reservation> {
    reservations
        .into_iter()
        .filter(|r| r.stay.contains_date(day))
        .collect()
}

pub fn arrivals_on<'a>(
    reservations: impl IntoIterator<Item = &'a Reservation>,
    day: NaiveDate,
) -> Vec<Reservation> {
    reservations
        .into_iter()
        .filter(|r| r.stay.check_in == day)
        .cloned()
        .collect()
}

pub fn departures_on<'a>(
    reservations: impl IntoIterator<Item = &'a Reservation>,
    day: NaiveDate,
) -> Vec<Reservation> {
    reservations
        .into_iter()
        .filter(|r| r.stay.check_out == day)
        .cloned()
        .collect()
}

/// Which part of the stay bar `day` renders. A one-night stay is both start and end.
pub fn cell_position(stay: &Stay, day: NaiveDate) -> CellPosition {
    let is_start = day == stay.check_in;
    let is_end = day == stay.last_night();
    CellPosition {
        is_start,
        is_end,
        is_middle: !is_start && !is_end,
    }
}

/// `round(reservations / (rooms * days) * 100)`.
///
/// This is an approximation: it counts reservations, not occupied room-nights, so a
/// single long stay weighs the same as a one-nighter. Informational only.
pub fn period_occupancy_estimate(reservation_count: usize, room_count: usize, days: usize) -> u32 {
    let capacity = room_count * days;
    if capacity == 0 {
        return 0;
    }
    (reservation_count as f64 / capacity as f64 * 100.0).round() as u32
}

pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), EngineError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| EngineError::invalid(format!("invalid month {year}-{month}")))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or(EngineError::LimitExceeded("month out of supported range"))?;
    Ok((first, next - Duration::days(1)))
}

pub fn validate_window(start: NaiveDate, end: NaiveDate) -> Result<(), EngineError> {
    if end < start {
        return Err(EngineError::invalid("range end must not be before its start"));
    }
    if (end - start).num_days() + 1 > MAX_QUERY_WINDOW_DAYS {
        return Err(EngineError::LimitExceeded("query window too wide"));
    }
    Ok(())
}

/// Project reservations onto the days of a month. Each day lists the reservations in
/// house that day (half-open), with only the start cell labelled.
pub fn month_calendar(
    reservations: &[Reservation],
    room_numbers: &HashMap<RoomId, String>,
    room_count: usize,
    year: i32,
    month: u32,
) -> Result<CalendarMonth, EngineError> {
    let (first, last) = month_bounds(year, month)?;
    let visible = by_date_range(reservations, first, last);

    let days: Vec<CalendarDay> = first
        .iter_days()
        .take_while(|day| *day <= last)
        .map(|date| {
            let entries = in_house_on(&visible, date)
                .into_iter()
                .map(|r| {
                    let position = cell_position(&r.stay, date);
                    CalendarEntry {
                        reservation_id: r.id,
                        room_id: r.room_id,
                        color: r.color.clone(),
                        position,
                        guest_name: position.is_start.then(|| r.guest_name.clone()),
                        room_number: position
                            .is_start
                            .then(|| {
                                room_numbers
                                    .get(&r.room_id)
                                    .cloned()
                                    .unwrap_or_else(|| r.room_id.to_string())
                            }),
                    }
                })
                .collect();
            CalendarDay { date, entries }
        })
        .collect();

    Ok(CalendarMonth {
        year: first.year(),
        month: first.month(),
        occupancy_estimate: period_occupancy_estimate(visible.len(), room_count, days.len()),
        reservation_count: visible.len(),
        days,
    })
}
