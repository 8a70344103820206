use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use tracing::{info, warn};

use crate::limits::{MAX_NAME_LEN, MAX_SPECIAL_REQUESTS};
use crate::model::*;
use crate::repo::GuestRepo;

use super::conflict::{validate_stay, validate_text};
use super::store::RoomState;
use super::{Authority, ConflictKind, Engine, EngineError, Entity, StatusChange};

/// Guest repository over an [`Engine`]. Check-in and check-out drive the room
/// the guest references.
pub struct Guests<'a> {
    engine: &'a Engine,
}

impl<'a> Guests<'a> {
    pub(super) fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    /// Mark a guest who never arrived. No room effect.
    pub async fn mark_no_show(&self, id: GuestId) -> Result<Guest, EngineError> {
        let mut guest = self.lock_guest(id).await?;
        match guest.status {
            GuestStatus::NoShow => return Ok(guest.clone()),
            GuestStatus::CheckedIn => {
                return Err(EngineError::invalid("a checked-in guest cannot be a no-show"));
            }
            GuestStatus::CheckedOut => {}
        }
        let room_number = self.room_number(guest.room_id).await;
        self.engine.suspend().await;
        guest.status = GuestStatus::NoShow;
        info!(guest_id = id, "guest marked no-show");
        self.engine.publish(HotelEvent::GuestStatusChanged {
            guest_id: id,
            room_number,
            status: GuestStatus::NoShow,
        });
        Ok(guest.clone())
    }

    async fn lock_guest(&self, id: GuestId) -> Result<OwnedRwLockWriteGuard<Guest>, EngineError> {
        let shared = self
            .engine
            .get_guest(&id)
            .ok_or_else(|| EngineError::not_found(Entity::Guest, id))?;
        let guard = shared.write_owned().await;
        // Deleted while we waited.
        if !self.engine.guests.contains_key(&id) {
            return Err(EngineError::not_found(Entity::Guest, id));
        }
        Ok(guard)
    }

    /// Display number for events; falls back to the id when the room is gone.
    async fn room_number(&self, room_id: RoomId) -> String {
        match self.engine.get_room(&room_id) {
            Some(rs) => rs.read().await.room.number.clone(),
            None => room_id.to_string(),
        }
    }

    /// Occupy the guest's room. The room must be vacant or cleaning.
    /// Caller holds the guest lock.
    fn occupy(&self, rs: &mut RoomState, guest: &Guest) -> Result<Option<StatusChange>, EngineError> {
        let status = rs.room.status;
        if !matches!(status, RoomStatus::Vacant | RoomStatus::Cleaning) {
            return Err(EngineError::Conflict(ConflictKind::RoomUnavailable {
                room_id: rs.room.id,
                status,
            }));
        }
        let occupant = Occupancy {
            guest_name: guest.name.clone(),
            check_in: guest.check_in_date,
            check_out: guest.check_out_date,
        };
        self.engine
            .transition_room(rs, RoomStatus::Occupied, Some(occupant), Authority::Desk)
    }

    async fn lock_room_if_present(
        &self,
        room_id: RoomId,
    ) -> Result<Option<OwnedRwLockWriteGuard<RoomState>>, EngineError> {
        match self.engine.lock_room(room_id).await {
            Ok(guard) => Ok(Some(guard)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn announce_guest(&self, guest: &Guest, room_number: String) {
        self.engine.publish(HotelEvent::GuestStatusChanged {
            guest_id: guest.id,
            room_number,
            status: guest.status,
        });
    }
}

fn validate_contact(name: &str, email: &str, phone: &str, requests: &[String]) -> Result<(), EngineError> {
    validate_text("guest name", name)?;
    for value in [email, phone] {
        if value.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("text field too long"));
        }
    }
    if requests.len() > MAX_SPECIAL_REQUESTS {
        return Err(EngineError::LimitExceeded("too many special requests"));
    }
    Ok(())
}

#[async_trait]
impl GuestRepo for Guests<'_> {
    async fn list(&self) -> Vec<Guest> {
        let shared: Vec<_> = self.engine.guests.iter().map(|e| e.value().clone()).collect();
        let mut guests = Vec::with_capacity(shared.len());
        for g in shared {
            guests.push(g.read().await.clone());
        }
        guests.sort_by_key(|g| g.id);
        guests
    }

    async fn get(&self, id: GuestId) -> Result<Guest, EngineError> {
        let shared = self
            .engine
            .get_guest(&id)
            .ok_or_else(|| EngineError::not_found(Entity::Guest, id))?;
        let guest = shared.read().await.clone();
        Ok(guest)
    }

    /// A new guest defaults to checked-in and occupies the room in the same step.
    async fn create(&self, draft: GuestDraft) -> Result<Guest, EngineError> {
        validate_contact(&draft.name, &draft.email, &draft.phone, &draft.special_requests)?;
        validate_stay(draft.check_in_date, draft.check_out_date)?;
        let status = draft.status.unwrap_or(GuestStatus::CheckedIn);

        let mut room = self.engine.lock_room(draft.room_id).await?;
        self.engine.suspend().await;

        let guest = Guest {
            id: self.engine.next_guest_id(),
            name: draft.name,
            email: draft.email,
            phone: draft.phone,
            room_id: draft.room_id,
            check_in_date: draft.check_in_date,
            check_out_date: draft.check_out_date,
            status,
            vip: draft.vip,
            special_requests: draft.special_requests,
        };
        let change = if status == GuestStatus::CheckedIn {
            self.occupy(&mut room, &guest)?
        } else {
            None
        };
        self.engine
            .guests
            .insert(guest.id, Arc::new(RwLock::new(guest.clone())));
        let room_number = room.room.number.clone();
        drop(room);

        info!(guest_id = guest.id, room_id = guest.room_id, status = %guest.status, "guest created");
        self.engine.announce([change]);
        if status == GuestStatus::CheckedIn {
            self.announce_guest(&guest, room_number);
        }
        Ok(guest)
    }

    async fn update(&self, id: GuestId, patch: GuestPatch) -> Result<Guest, EngineError> {
        let mut guest = self.lock_guest(id).await?;

        let name = patch.name.unwrap_or_else(|| guest.name.clone());
        let email = patch.email.unwrap_or_else(|| guest.email.clone());
        let phone = patch.phone.unwrap_or_else(|| guest.phone.clone());
        let requests = patch
            .special_requests
            .unwrap_or_else(|| guest.special_requests.clone());
        validate_contact(&name, &email, &phone, &requests)?;
        let stay = validate_stay(
            patch.check_in_date.unwrap_or(guest.check_in_date),
            patch.check_out_date.unwrap_or(guest.check_out_date),
        )?;
        let room_id = patch.room_id.unwrap_or(guest.room_id);
        let checked_in = guest.status == GuestStatus::CheckedIn;
        if checked_in && room_id != guest.room_id {
            return Err(EngineError::invalid("check the guest out before moving rooms"));
        }

        // Keep the occupied room's occupant details in step with the guest record.
        let mut room = self.lock_room_if_present(room_id).await?;
        if room.is_none() && !checked_in {
            return Err(EngineError::not_found(Entity::Room, room_id));
        }
        self.engine.suspend().await;
        if checked_in
            && let Some(rs) = room.as_mut()
            && let Some(occupant) = rs.room.occupancy.as_mut()
            && occupant.guest_name == guest.name
        {
            occupant.guest_name = name.clone();
            occupant.check_in = stay.check_in;
            occupant.check_out = stay.check_out;
        }

        guest.name = name;
        guest.email = email;
        guest.phone = phone;
        guest.room_id = room_id;
        guest.check_in_date = stay.check_in;
        guest.check_out_date = stay.check_out;
        if let Some(vip) = patch.vip {
            guest.vip = vip;
        }
        guest.special_requests = requests;
        info!(guest_id = id, "guest updated");
        Ok(guest.clone())
    }

    async fn delete(&self, id: GuestId) -> Result<Guest, EngineError> {
        let guest = self.lock_guest(id).await?;
        self.engine.suspend().await;
        self.engine.guests.remove(&id);
        if guest.status == GuestStatus::CheckedIn {
            warn!(guest_id = id, room_id = guest.room_id, "checked-in guest deleted; room left occupied");
        } else {
            info!(guest_id = id, "guest deleted");
        }
        Ok(guest.clone())
    }

    async fn check_in(&self, id: GuestId) -> Result<Guest, EngineError> {
        let mut guest = self.lock_guest(id).await?;
        if guest.status == GuestStatus::CheckedIn {
            return Ok(guest.clone());
        }
        let mut room = self.engine.lock_room(guest.room_id).await?;
        self.engine.suspend().await;

        let change = self.occupy(&mut room, &guest)?;
        guest.status = GuestStatus::CheckedIn;
        let room_number = room.room.number.clone();
        drop(room);

        info!(guest_id = id, room_number = %room_number, "guest checked in");
        self.engine.announce([change]);
        self.announce_guest(&guest, room_number);
        Ok(guest.clone())
    }

    /// Sends the room to cleaning when this guest is its occupant. A room deleted
    /// in the meantime does not block the check-out.
    async fn check_out(&self, id: GuestId) -> Result<Guest, EngineError> {
        let mut guest = self.lock_guest(id).await?;
        match guest.status {
            GuestStatus::CheckedOut => return Ok(guest.clone()),
            GuestStatus::NoShow => {
                return Err(EngineError::invalid("guest never checked in"));
            }
            GuestStatus::CheckedIn => {}
        }
        let mut room = self.lock_room_if_present(guest.room_id).await?;
        self.engine.suspend().await;

        let mut change = None;
        let mut room_number = guest.room_id.to_string();
        if let Some(rs) = room.as_mut() {
            room_number = rs.room.number.clone();
            let is_occupant = rs
                .room
                .occupancy
                .as_ref()
                .is_some_and(|o| o.guest_name == guest.name);
            if rs.room.status == RoomStatus::Occupied && is_occupant {
                change = self
                    .engine
                    .transition_room(rs, RoomStatus::Cleaning, None, Authority::Desk)?;
            }
        }
        guest.status = GuestStatus::CheckedOut;
        drop(room);

        info!(guest_id = id, room_number = %room_number, "guest checked out");
        self.engine.announce([change]);
        self.announce_guest(&guest, room_number);
        Ok(guest.clone())
    }
}
