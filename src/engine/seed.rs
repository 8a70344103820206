use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::limits::{MAX_ROOMS, MAX_TASK_MINUTES};
use crate::model::*;
use crate::seed::SeedData;

use super::conflict::{
    capacity_warning, check_no_overlap, validate_guest_count, validate_room_fields, validate_stay, validate_text,
};
use super::lifecycle::validate_occupant;
use super::store::RoomState;
use super::{ConflictKind, Engine, EngineError, Entity};

fn duplicate(entity: Entity, id: u32) -> EngineError {
    EngineError::invalid(format!("duplicate {entity} id {id}"))
}

impl Engine {
    /// Populate from seed records, keeping their ids. Everything is validated
    /// before anything is inserted, so a bad dataset leaves the engine untouched.
    /// No events are published.
    pub fn load_seed(&self, seed: SeedData) -> Result<(), EngineError> {
        let SeedData {
            rooms,
            reservations,
            guests,
            tasks,
        } = seed;
        if self.rooms.len() + rooms.len() > MAX_ROOMS {
            return Err(EngineError::LimitExceeded("too many rooms"));
        }

        let mut staged: BTreeMap<RoomId, RoomState> = BTreeMap::new();
        let mut numbers: HashMap<String, RoomId> = HashMap::new();
        for room in rooms {
            validate_room_fields(&room.number, room.capacity, room.rate)?;
            match (room.status, &room.occupancy) {
                (RoomStatus::Occupied, Some(occupant)) => validate_occupant(occupant)?,
                (RoomStatus::Occupied, None) => {
                    return Err(EngineError::invalid(format!("room {} is occupied without an occupant", room.id)));
                }
                (_, Some(_)) => {
                    return Err(EngineError::invalid(format!("room {} has an occupant but is not occupied", room.id)));
                }
                (_, None) => {}
            }
            if self.rooms.contains_key(&room.id) || staged.contains_key(&room.id) {
                return Err(duplicate(Entity::Room, room.id));
            }
            if self.room_numbers.contains_key(&room.number) || numbers.contains_key(&room.number) {
                return Err(EngineError::Conflict(ConflictKind::DuplicateRoomNumber(room.number)));
            }
            numbers.insert(room.number.clone(), room.id);
            staged.insert(room.id, RoomState::new(room));
        }

        let mut booked: Vec<(ReservationId, RoomId)> = Vec::with_capacity(reservations.len());
        let mut seen = HashSet::new();
        for r in reservations {
            validate_text("guest name", &r.guest_name)?;
            validate_stay(r.stay.check_in, r.stay.check_out)?;
            validate_guest_count(r.guests)?;
            if self.reservation_to_room.contains_key(&r.id) || !seen.insert(r.id) {
                return Err(duplicate(Entity::Reservation, r.id));
            }
            let rs = staged
                .get_mut(&r.room_id)
                .ok_or_else(|| EngineError::not_found(Entity::Room, r.room_id))?;
            if self.settings.enforce_no_overlap && r.is_confirmed() {
                check_no_overlap(rs, &r.stay, Some(r.id))?;
            }
            if let Some(w) = capacity_warning(&rs.room, r.guests, Some(r.id)) {
                warn!(reservation_id = r.id, guests = w.guests, capacity = w.capacity, "seeded reservation exceeds room capacity");
            }
            booked.push((r.id, r.room_id));
            rs.insert_reservation(r);
        }

        let mut guest_ids = HashSet::new();
        for g in &guests {
            validate_text("guest name", &g.name)?;
            validate_stay(g.check_in_date, g.check_out_date)?;
            if self.guests.contains_key(&g.id) || !guest_ids.insert(g.id) {
                return Err(duplicate(Entity::Guest, g.id));
            }
            if !staged.contains_key(&g.room_id) && !self.rooms.contains_key(&g.room_id) {
                return Err(EngineError::not_found(Entity::Room, g.room_id));
            }
        }

        let mut task_ids = HashSet::new();
        for t in &tasks {
            validate_text("assignee", &t.assigned_to)?;
            if t.estimated_minutes == 0 || t.estimated_minutes > MAX_TASK_MINUTES {
                return Err(EngineError::invalid(format!("task {} has an out of range estimate", t.id)));
            }
            if self.tasks.contains_key(&t.id) || !task_ids.insert(t.id) {
                return Err(duplicate(Entity::Task, t.id));
            }
            if !numbers.contains_key(&t.room_number) && !self.room_numbers.contains_key(&t.room_number) {
                return Err(EngineError::not_found(Entity::Room, &t.room_number));
            }
        }

        let counts = (staged.len(), booked.len(), guests.len(), tasks.len());
        for (number, id) in numbers {
            self.room_numbers.insert(number, id);
        }
        for (id, rs) in staged {
            self.ids.room.observe(id);
            self.rooms.insert(id, Arc::new(RwLock::new(rs)));
        }
        for (id, room_id) in booked {
            self.ids.reservation.observe(id);
            self.reservation_to_room.insert(id, room_id);
        }
        for g in guests {
            self.ids.guest.observe(g.id);
            self.guests.insert(g.id, Arc::new(RwLock::new(g)));
        }
        for t in tasks {
            self.ids.task.observe(t.id);
            self.tasks.insert(t.id, Arc::new(RwLock::new(t)));
        }

        info!(
            rooms = counts.0,
            reservations = counts.1,
            guests = counts.2,
            tasks = counts.3,
            "seed loaded"
        );
        Ok(())
    }
}
