use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::OwnedRwLockWriteGuard;
use tracing::{info, warn};

use crate::model::*;
use crate::repo::ReservationRepo;

use super::calendar;
use super::conflict::{capacity_warning, check_no_overlap, validate_guest_count, validate_stay, validate_text};
use super::store::RoomState;
use super::{Engine, EngineError, Entity};

/// Attempts to chase a reservation that moves rooms while we wait for a lock.
const LOCATE_ATTEMPTS: usize = 3;

/// Reservation repository over an [`Engine`].
pub struct Reservations<'a> {
    engine: &'a Engine,
}

impl<'a> Reservations<'a> {
    pub(super) fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    /// Day-by-day projection of the month for the calendar view.
    pub async fn month_calendar(&self, year: i32, month: u32) -> Result<CalendarMonth, EngineError> {
        calendar::month_bounds(year, month)?;
        let (rooms, reservations) = self.engine.snapshot().await;
        let numbers: HashMap<RoomId, String> = rooms.iter().map(|r| (r.id, r.number.clone())).collect();
        calendar::month_calendar(&reservations, &numbers, rooms.len(), year, month)
    }

    /// Confirmed bookings with more guests than their room holds.
    pub async fn capacity_warnings(&self) -> Vec<CapacityWarning> {
        let shared: Vec<_> = self.engine.rooms.iter().map(|e| e.value().clone()).collect();
        let mut warnings = Vec::new();
        for rs in shared {
            let guard = rs.read().await;
            warnings.extend(
                guard
                    .reservations
                    .iter()
                    .filter(|r| r.is_confirmed())
                    .filter_map(|r| capacity_warning(&guard.room, r.guests, Some(r.id))),
            );
        }
        warnings.sort_by_key(|w| w.reservation_id);
        warnings
    }

    /// Reservations occupying a room on `day`.
    pub async fn in_house(&self, day: NaiveDate) -> Vec<Reservation> {
        let all = self.engine.reservation_snapshot().await;
        calendar::in_house_on(&all, day).into_iter().cloned().collect()
    }

    /// Lookup reservation → room, lock the room, and follow the reservation if it
    /// moved to another room while we waited.
    async fn locate(&self, id: ReservationId) -> Result<(RoomId, OwnedRwLockWriteGuard<RoomState>), EngineError> {
        for _ in 0..LOCATE_ATTEMPTS {
            let room_id = self
                .engine
                .reservation_to_room
                .get(&id)
                .map(|e| *e.value())
                .ok_or_else(|| EngineError::not_found(Entity::Reservation, id))?;
            let guard = self
                .engine
                .lock_room(room_id)
                .await
                .map_err(|_| EngineError::not_found(Entity::Reservation, id))?;
            if guard.reservation(id).is_some() {
                return Ok((room_id, guard));
            }
        }
        Err(EngineError::not_found(Entity::Reservation, id))
    }

    fn warn_capacity(&self, room: &Room, reservation: &Reservation) {
        if let Some(w) = capacity_warning(room, reservation.guests, Some(reservation.id)) {
            metrics::counter!(crate::observability::CAPACITY_WARNINGS_TOTAL).increment(1);
            warn!(
                reservation_id = reservation.id,
                room_id = w.room_id,
                guests = w.guests,
                capacity = w.capacity,
                "reservation exceeds room capacity"
            );
        }
    }

    fn check_overlap(&self, rs: &RoomState, reservation: &Reservation) -> Result<(), EngineError> {
        if self.engine.settings.enforce_no_overlap && reservation.is_confirmed() {
            check_no_overlap(rs, &reservation.stay, Some(reservation.id))?;
        }
        Ok(())
    }
}

/// Apply a patch on top of an existing reservation, validating the result.
fn merge(existing: &Reservation, patch: &ReservationPatch) -> Result<Reservation, EngineError> {
    let guest_name = patch
        .guest_name
        .clone()
        .unwrap_or_else(|| existing.guest_name.clone());
    validate_text("guest name", &guest_name)?;
    let stay = validate_stay(
        patch.check_in.unwrap_or(existing.stay.check_in),
        patch.check_out.unwrap_or(existing.stay.check_out),
    )?;
    let guests = patch.guests.unwrap_or(existing.guests);
    validate_guest_count(guests)?;
    Ok(Reservation {
        id: existing.id,
        guest_name,
        room_id: patch.room_id.unwrap_or(existing.room_id),
        stay,
        guests,
        status: patch.status.unwrap_or(existing.status),
        color: existing.color.clone(),
    })
}

#[async_trait]
impl ReservationRepo for Reservations<'_> {
    async fn list(&self) -> Vec<Reservation> {
        self.engine.reservation_snapshot().await
    }

    async fn get(&self, id: ReservationId) -> Option<Reservation> {
        let room_id = self.engine.reservation_to_room.get(&id).map(|e| *e.value())?;
        let rs = self.engine.get_room(&room_id)?;
        let guard = rs.read().await;
        guard.reservation(id).cloned()
    }

    async fn create(&self, draft: ReservationDraft) -> Result<Reservation, EngineError> {
        validate_text("guest name", &draft.guest_name)?;
        let stay = validate_stay(draft.check_in, draft.check_out)?;
        validate_guest_count(draft.guests)?;

        let mut guard = self.engine.lock_room(draft.room_id).await?;
        self.engine.suspend().await;
        if self.engine.settings.enforce_no_overlap {
            check_no_overlap(&guard, &stay, None)?;
        }

        let reservation = Reservation {
            id: self.engine.next_reservation_id(),
            guest_name: draft.guest_name,
            room_id: draft.room_id,
            stay,
            guests: draft.guests,
            status: ReservationStatus::Confirmed,
            color: self.engine.next_color().to_string(),
        };
        self.warn_capacity(&guard.room, &reservation);
        guard.insert_reservation(reservation.clone());
        self.engine
            .reservation_to_room
            .insert(reservation.id, reservation.room_id);
        info!(
            reservation_id = reservation.id,
            room_id = reservation.room_id,
            check_in = %stay.check_in,
            check_out = %stay.check_out,
            "reservation created"
        );
        Ok(reservation)
    }

    async fn update(&self, id: ReservationId, patch: ReservationPatch) -> Result<Reservation, EngineError> {
        let (current_room, guard) = self.locate(id).await?;
        let target_room = patch.room_id.unwrap_or(current_room);

        if target_room == current_room {
            let mut guard = guard;
            self.engine.suspend().await;
            let existing = guard
                .reservation(id)
                .ok_or_else(|| EngineError::not_found(Entity::Reservation, id))?;
            let updated = merge(existing, &patch)?;
            self.check_overlap(&guard, &updated)?;
            self.warn_capacity(&guard.room, &updated);
            guard.remove_reservation(id);
            guard.insert_reservation(updated.clone());
            info!(reservation_id = id, "reservation updated");
            return Ok(updated);
        }

        // Moving rooms: hold both locks, taken in ascending room id order.
        let (mut from, mut to) = if current_room < target_room {
            let to = self.engine.lock_room(target_room).await?;
            (guard, to)
        } else {
            drop(guard);
            let to = self.engine.lock_room(target_room).await?;
            let from = self
                .engine
                .lock_room(current_room)
                .await
                .map_err(|_| EngineError::not_found(Entity::Reservation, id))?;
            (from, to)
        };
        self.engine.suspend().await;

        let existing = from
            .reservation(id)
            .ok_or_else(|| EngineError::not_found(Entity::Reservation, id))?;
        let updated = merge(existing, &patch)?;
        self.check_overlap(&to, &updated)?;
        self.warn_capacity(&to.room, &updated);

        from.remove_reservation(id);
        to.insert_reservation(updated.clone());
        self.engine.reservation_to_room.insert(id, target_room);
        info!(reservation_id = id, from_room = current_room, to_room = target_room, "reservation moved");
        Ok(updated)
    }

    async fn delete(&self, id: ReservationId) -> Result<bool, EngineError> {
        let (room_id, mut guard) = self.locate(id).await?;
        self.engine.suspend().await;
        guard.remove_reservation(id);
        self.engine.reservation_to_room.remove(&id);
        info!(reservation_id = id, room_id, "reservation deleted");
        Ok(true)
    }

    async fn by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Reservation>, EngineError> {
        calendar::validate_window(start, end)?;
        let all = self.engine.reservation_snapshot().await;
        Ok(calendar::by_date_range(&all, start, end))
    }

    async fn today_arrivals(&self) -> Vec<Reservation> {
        let all = self.engine.reservation_snapshot().await;
        calendar::arrivals_on(&all, self.engine.today())
    }

    async fn today_departures(&self) -> Vec<Reservation> {
        let all = self.engine.reservation_snapshot().await;
        calendar::departures_on(&all, self.engine.today())
    }
}
