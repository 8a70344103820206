mod calendar;
mod conflict;
mod error;
mod guests;
mod housekeeping;
pub mod lifecycle;
mod reports;
mod reservations;
mod rooms;
mod seed;
mod store;

pub use calendar::{
    arrivals_on, by_date_range, cell_position, departures_on, in_house_on, month_bounds,
    month_calendar, period_occupancy_estimate,
};
pub use conflict::capacity_warning;
pub use error::{ConflictKind, EngineError, Entity};
pub use guests::Guests;
pub use housekeeping::Tasks;
pub use lifecycle::{Authority, StatusChange, TransitionPolicy};
pub use reports::{
    desk_metrics, nightly_rate, occupancy_rate, revenue_comparison, revenue_history, synthetic_history,
};
pub use reservations::Reservations;
pub use rooms::Rooms;
pub use store::{PALETTE, RoomState};

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use crate::bus::EventBus;
use crate::clock::Clock;
use crate::limits::MAX_SIMULATED_LATENCY_MS;
use crate::model::*;

use store::{Palette, Sequence};

pub type SharedRoom = Arc<RwLock<RoomState>>;
pub type SharedGuest = Arc<RwLock<Guest>>;
pub type SharedTask = Arc<RwLock<HousekeepingTask>>;

/// Behavioural switches, usually built from [`crate::config::DeskConfig`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub policy: TransitionPolicy,
    /// Reject confirmed same-room overlaps on reservation create/update.
    pub enforce_no_overlap: bool,
    /// Simulated store latency; capped at `MAX_SIMULATED_LATENCY_MS`.
    pub latency: Duration,
    pub revenue_window_days: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            policy: TransitionPolicy::Permissive,
            enforce_no_overlap: true,
            latency: Duration::ZERO,
            revenue_window_days: 30,
        }
    }
}

#[derive(Debug, Default)]
struct Sequences {
    room: Sequence,
    reservation: Sequence,
    guest: Sequence,
    task: Sequence,
}

/// In-memory front-desk state: rooms (with their reservations), guests and
/// housekeeping tasks, plus the bus every mutation is announced on.
///
/// Lock order when more than one entity is written: guest or task first, then
/// rooms in ascending id order. Events go out only after every write of an
/// operation has been applied.
pub struct Engine {
    pub(super) rooms: DashMap<RoomId, SharedRoom>,
    /// Room number → room id.
    pub(super) room_numbers: DashMap<String, RoomId>,
    /// Reverse lookup: reservation id → room id.
    pub(super) reservation_to_room: DashMap<ReservationId, RoomId>,
    pub(super) guests: DashMap<GuestId, SharedGuest>,
    pub(super) tasks: DashMap<TaskId, SharedTask>,
    ids: Sequences,
    palette: Palette,
    pub bus: Arc<EventBus>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) settings: EngineSettings,
}

impl Engine {
    pub fn new(bus: Arc<EventBus>, clock: Arc<dyn Clock>, settings: EngineSettings) -> Self {
        Self {
            rooms: DashMap::new(),
            room_numbers: DashMap::new(),
            reservation_to_room: DashMap::new(),
            guests: DashMap::new(),
            tasks: DashMap::new(),
            ids: Sequences::default(),
            palette: Palette::default(),
            bus,
            clock,
            settings,
        }
    }

    pub fn rooms(&self) -> Rooms<'_> {
        Rooms::new(self)
    }

    pub fn reservations(&self) -> Reservations<'_> {
        Reservations::new(self)
    }

    pub fn guests(&self) -> Guests<'_> {
        Guests::new(self)
    }

    pub fn tasks(&self) -> Tasks<'_> {
        Tasks::new(self)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Simulated I/O pause. Callers hold the entity lock, so operations on the same
    /// entity resume in the order they were issued.
    pub(super) async fn suspend(&self) {
        let cap = Duration::from_millis(MAX_SIMULATED_LATENCY_MS);
        let latency = self.settings.latency.min(cap);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    pub(super) fn publish(&self, event: HotelEvent) {
        self.bus.publish(&event);
    }

    /// Announce applied room transitions, in order.
    pub(super) fn announce(&self, changes: impl IntoIterator<Item = Option<StatusChange>>) {
        for change in changes.into_iter().flatten() {
            self.publish(change.event());
        }
    }

    pub(super) fn get_room(&self, id: &RoomId) -> Option<SharedRoom> {
        self.rooms.get(id).map(|e| e.value().clone())
    }

    pub(super) fn room_id_by_number(&self, number: &str) -> Option<RoomId> {
        self.room_numbers.get(number).map(|e| *e.value())
    }

    pub(super) fn get_guest(&self, id: &GuestId) -> Option<SharedGuest> {
        self.guests.get(id).map(|e| e.value().clone())
    }

    pub(super) fn get_task(&self, id: &TaskId) -> Option<SharedTask> {
        self.tasks.get(id).map(|e| e.value().clone())
    }

    /// Lookup room, acquire its write lock, and reject rooms deleted while we waited.
    pub(super) async fn lock_room(&self, id: RoomId) -> Result<OwnedRwLockWriteGuard<RoomState>, EngineError> {
        let rs = self
            .get_room(&id)
            .ok_or_else(|| EngineError::not_found(Entity::Room, id))?;
        let guard = rs.write_owned().await;
        if guard.retired {
            return Err(EngineError::not_found(Entity::Room, id));
        }
        Ok(guard)
    }

    /// Validate and apply a room transition under the caller's lock. The change is
    /// returned, not published; the caller announces it once all its writes are done.
    pub(super) fn transition_room(
        &self,
        rs: &mut RoomState,
        target: RoomStatus,
        occupant: Option<Occupancy>,
        authority: Authority,
    ) -> Result<Option<StatusChange>, EngineError> {
        let change = lifecycle::transition(&mut rs.room, target, occupant, self.settings.policy, authority)?;
        if let Some(c) = change {
            metrics::counter!(
                crate::observability::ROOM_TRANSITIONS_TOTAL,
                "from" => c.previous.as_str(),
                "to" => c.new.as_str()
            )
            .increment(1);
            tracing::info!(room_id = c.room_id, from = %c.previous, to = %c.new, "room status changed");
        }
        Ok(change)
    }

    /// Rooms and reservations read under one set of room read locks, taken in
    /// ascending room id order like every writer. A reservation moving between
    /// rooms is seen exactly once.
    pub(super) async fn snapshot(&self) -> (Vec<Room>, Vec<Reservation>) {
        let mut shared: Vec<(RoomId, SharedRoom)> = self
            .rooms
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();
        shared.sort_by_key(|(id, _)| *id);

        let mut guards = Vec::with_capacity(shared.len());
        for (_, rs) in shared {
            guards.push(rs.read_owned().await);
        }

        let mut rooms = Vec::with_capacity(guards.len());
        let mut reservations = Vec::new();
        for guard in guards.iter().filter(|g| !g.retired) {
            rooms.push(guard.room.clone());
            reservations.extend(guard.reservations.iter().cloned());
        }
        reservations.sort_by_key(|r| r.id);
        (rooms, reservations)
    }

    /// Consistent copy of every room, sorted by id.
    pub(super) async fn room_snapshot(&self) -> Vec<Room> {
        self.snapshot().await.0
    }

    /// Every reservation across all rooms, sorted by id.
    pub(super) async fn reservation_snapshot(&self) -> Vec<Reservation> {
        self.snapshot().await.1
    }

    /// Write locks on every task, ascending by id. Taken before any room lock.
    pub(super) async fn lock_all_tasks(&self) -> Vec<OwnedRwLockWriteGuard<HousekeepingTask>> {
        let mut shared: Vec<(TaskId, SharedTask)> = self
            .tasks
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();
        shared.sort_by_key(|(id, _)| *id);

        let mut guards = Vec::with_capacity(shared.len());
        for (id, task) in shared {
            let guard = task.write_owned().await;
            if self.tasks.contains_key(&id) {
                guards.push(guard);
            }
        }
        guards
    }

    pub(super) fn next_room_id(&self) -> RoomId {
        self.ids.room.next()
    }

    pub(super) fn next_reservation_id(&self) -> ReservationId {
        self.ids.reservation.next()
    }

    pub(super) fn next_guest_id(&self) -> GuestId {
        self.ids.guest.next()
    }

    pub(super) fn next_task_id(&self) -> TaskId {
        self.ids.task.next()
    }

    pub(super) fn next_color(&self) -> &'static str {
        self.palette.next()
    }
}
