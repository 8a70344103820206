use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry as MapEntry;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::limits::MAX_ROOMS;
use crate::model::*;
use crate::repo::RoomRepo;

use super::conflict::validate_room_fields;
use super::lifecycle::{self, validate_occupant};
use super::store::RoomState;
use super::{Authority, ConflictKind, Engine, EngineError, Entity};

/// Room repository over an [`Engine`].
pub struct Rooms<'a> {
    engine: &'a Engine,
}

impl<'a> Rooms<'a> {
    pub(super) fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    /// Desk-flow status change; the transition policy applies.
    pub async fn set_status(&self, id: RoomId, status: RoomStatus) -> Result<Room, EngineError> {
        self.change_status(id, status, None, Authority::Desk).await
    }

    /// Explicitly confirmed administrative change that bypasses a strict policy.
    pub async fn override_status(&self, id: RoomId, status: RoomStatus) -> Result<Room, EngineError> {
        self.change_status(id, status, None, Authority::Override).await
    }

    /// Walk-in style occupation of a room with the given occupant.
    pub async fn occupy(&self, id: RoomId, occupant: Occupancy) -> Result<Room, EngineError> {
        self.change_status(id, RoomStatus::Occupied, Some(occupant), Authority::Desk)
            .await
    }

    async fn change_status(
        &self,
        id: RoomId,
        status: RoomStatus,
        occupant: Option<Occupancy>,
        authority: Authority,
    ) -> Result<Room, EngineError> {
        let mut guard = self.engine.lock_room(id).await?;
        self.engine.suspend().await;
        let change = self.engine.transition_room(&mut guard, status, occupant, authority)?;
        self.engine.announce([change]);
        Ok(guard.room.clone())
    }

    pub async fn status_counts(&self) -> RoomStatusCounts {
        let mut counts = RoomStatusCounts::default();
        for room in self.engine.room_snapshot().await {
            counts.record(room.status);
        }
        counts
    }

    /// Room grid filtering by status and free-text search.
    pub async fn search(&self, filter: &RoomFilter) -> Vec<Room> {
        let needle = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        self.engine
            .room_snapshot()
            .await
            .into_iter()
            .filter(|room| filter.status.is_none_or(|s| room.status == s))
            .filter(|room| match &needle {
                None => true,
                Some(n) => {
                    room.number.to_lowercase().contains(n)
                        || room.room_type.as_str().contains(n.as_str())
                        || room
                            .occupancy
                            .as_ref()
                            .is_some_and(|o| o.guest_name.to_lowercase().contains(n))
                }
            })
            .collect()
    }

    /// Occupied rooms whose guest leaves today.
    pub async fn todays_checkouts(&self) -> Vec<Room> {
        let today = self.engine.today();
        self.engine
            .room_snapshot()
            .await
            .into_iter()
            .filter(|room| {
                room.status == RoomStatus::Occupied
                    && room.occupancy.as_ref().is_some_and(|o| o.check_out == today)
            })
            .collect()
    }

    /// Checked-in guests pointing at the room. Read before taking the room lock
    /// to keep the guest → room lock order.
    async fn checked_in_guests(&self, id: RoomId) -> usize {
        let guests: Vec<_> = self.engine.guests.iter().map(|e| e.value().clone()).collect();
        let mut count = 0;
        for guest in guests {
            let g = guest.read().await;
            if g.room_id == id && g.status == GuestStatus::CheckedIn {
                count += 1;
            }
        }
        count
    }

    fn reserve_number(&self, number: &str, id: RoomId) -> Result<(), EngineError> {
        match self.engine.room_numbers.entry(number.to_string()) {
            MapEntry::Occupied(_) => Err(EngineError::Conflict(ConflictKind::DuplicateRoomNumber(
                number.to_string(),
            ))),
            MapEntry::Vacant(slot) => {
                slot.insert(id);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl RoomRepo for Rooms<'_> {
    async fn list(&self) -> Vec<Room> {
        self.engine.room_snapshot().await
    }

    async fn get(&self, id: RoomId) -> Result<Room, EngineError> {
        let rs = self
            .engine
            .get_room(&id)
            .ok_or_else(|| EngineError::not_found(Entity::Room, id))?;
        let guard = rs.read().await;
        if guard.retired {
            return Err(EngineError::not_found(Entity::Room, id));
        }
        Ok(guard.room.clone())
    }

    async fn create(&self, draft: RoomDraft) -> Result<Room, EngineError> {
        validate_room_fields(&draft.number, draft.capacity, draft.rate)?;
        let status = draft.status.unwrap_or(RoomStatus::Vacant);
        match (status, &draft.occupancy) {
            (RoomStatus::Occupied, None) => {
                return Err(EngineError::invalid("occupied requires guest name and stay dates"));
            }
            (RoomStatus::Occupied, Some(occupant)) => validate_occupant(occupant)?,
            (_, Some(_)) => {
                return Err(EngineError::invalid("occupancy is only valid for occupied rooms"));
            }
            (_, None) => {}
        }
        if self.engine.rooms.len() >= MAX_ROOMS {
            return Err(EngineError::LimitExceeded("too many rooms"));
        }

        self.engine.suspend().await;
        let id = self.engine.next_room_id();
        self.reserve_number(&draft.number, id)?;

        let room = Room {
            id,
            number: draft.number,
            room_type: draft.room_type,
            floor: draft.floor,
            capacity: draft.capacity,
            rate: draft.rate,
            status,
            occupancy: draft.occupancy,
            housekeeping_status: draft.housekeeping_status.unwrap_or(HousekeepingStatus::Ready),
        };
        self.engine
            .rooms
            .insert(id, Arc::new(RwLock::new(RoomState::new(room.clone()))));
        info!(room_id = id, number = %room.number, "room created");
        Ok(room)
    }

    /// A new number is carried over to the housekeeping tasks filed under the old one.
    async fn update(&self, id: RoomId, patch: RoomPatch) -> Result<Room, EngineError> {
        // Task locks come before the room lock.
        let mut tasks = match patch.number {
            Some(_) => self.engine.lock_all_tasks().await,
            None => Vec::new(),
        };
        let mut guard = self.engine.lock_room(id).await?;
        self.engine.suspend().await;

        let current = &guard.room;
        let number = patch.number.clone().unwrap_or_else(|| current.number.clone());
        let capacity = patch.capacity.unwrap_or(current.capacity);
        let rate = patch.rate.unwrap_or(current.rate);
        validate_room_fields(&number, capacity, rate)?;

        let target = patch.status.unwrap_or(current.status);
        if patch.occupancy.is_some() && target != RoomStatus::Occupied {
            return Err(EngineError::invalid("occupancy is only valid for occupied rooms"));
        }
        let effective = lifecycle::validate(
            current,
            target,
            patch.occupancy.as_ref(),
            self.engine.settings.policy,
            Authority::Desk,
        )?;
        // Already occupied: a new occupant only replaces the details.
        if !effective && let Some(occupant) = &patch.occupancy {
            validate_occupant(occupant)?;
        }

        let old_number = current.number.clone();
        if number != old_number {
            self.reserve_number(&number, id)?;
            self.engine.room_numbers.remove(&old_number);
            let mut moved = 0;
            for task in tasks.iter_mut().filter(|t| t.room_number == old_number) {
                task.room_number = number.clone();
                moved += 1;
            }
            info!(room_id = id, from = %old_number, to = %number, tasks = moved, "room renumbered");
        }

        let room = &mut guard.room;
        room.number = number;
        if let Some(t) = patch.room_type {
            room.room_type = t;
        }
        if let Some(f) = patch.floor {
            room.floor = f;
        }
        room.capacity = capacity;
        room.rate = rate;
        if let Some(h) = patch.housekeeping_status {
            room.housekeeping_status = h;
        }
        let change = if effective {
            self.engine
                .transition_room(&mut guard, target, patch.occupancy, Authority::Desk)?
        } else {
            if let Some(occupant) = patch.occupancy {
                guard.room.occupancy = Some(occupant);
            }
            None
        };

        for r in guard.reservations.iter().filter(|r| r.is_confirmed()) {
            if r.guests > capacity {
                warn!(room_id = id, reservation_id = r.id, guests = r.guests, capacity, "booking now exceeds room capacity");
            }
        }

        self.engine.announce([change]);
        Ok(guard.room.clone())
    }

    async fn delete(&self, id: RoomId) -> Result<Room, EngineError> {
        let occupants = self.checked_in_guests(id).await;
        let mut guard = self.engine.lock_room(id).await?;
        self.engine.suspend().await;

        let occupied = usize::from(guard.room.status == RoomStatus::Occupied);
        let dependents = guard.confirmed_count() + occupants.max(occupied);
        if dependents > 0 {
            return Err(EngineError::Conflict(ConflictKind::RoomInUse {
                room_id: id,
                dependents,
            }));
        }

        guard.retired = true;
        for r in &guard.reservations {
            self.engine.reservation_to_room.remove(&r.id);
        }
        self.engine.room_numbers.remove(&guard.room.number);
        self.engine.rooms.remove(&id);
        warn!(room_id = id, number = %guard.room.number, "room deleted");
        Ok(guard.room.clone())
    }

    async fn set_status_by_number(&self, number: &str, status: RoomStatus) -> Result<Room, EngineError> {
        let id = self
            .engine
            .room_id_by_number(number)
            .ok_or_else(|| EngineError::not_found(Entity::Room, number))?;
        self.set_status(id, status).await
    }
}
