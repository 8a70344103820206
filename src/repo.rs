//! Repository contracts the dashboard collaborators program against.
//!
//! The engine hands out one implementation of each through
//! [`Engine::rooms`](crate::engine::Engine::rooms) and friends.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::engine::EngineError;
use crate::model::*;

#[async_trait]
pub trait RoomRepo {
    async fn list(&self) -> Vec<Room>;
    async fn get(&self, id: RoomId) -> Result<Room, EngineError>;
    async fn create(&self, draft: RoomDraft) -> Result<Room, EngineError>;
    async fn update(&self, id: RoomId, patch: RoomPatch) -> Result<Room, EngineError>;
    /// Administrative removal. Rooms with confirmed bookings or an occupant are refused.
    async fn delete(&self, id: RoomId) -> Result<Room, EngineError>;
    async fn set_status_by_number(&self, number: &str, status: RoomStatus) -> Result<Room, EngineError>;
}

#[async_trait]
pub trait ReservationRepo {
    async fn list(&self) -> Vec<Reservation>;
    async fn get(&self, id: ReservationId) -> Option<Reservation>;
    /// Id and colour are assigned here; status starts confirmed.
    async fn create(&self, draft: ReservationDraft) -> Result<Reservation, EngineError>;
    async fn update(&self, id: ReservationId, patch: ReservationPatch) -> Result<Reservation, EngineError>;
    /// `Ok(true)` once removed; an unknown id is `NotFound`.
    async fn delete(&self, id: ReservationId) -> Result<bool, EngineError>;
    /// Closed-range window query, `[start, end]` inclusive.
    async fn by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Reservation>, EngineError>;
    async fn today_arrivals(&self) -> Vec<Reservation>;
    async fn today_departures(&self) -> Vec<Reservation>;
}

#[async_trait]
pub trait GuestRepo {
    async fn list(&self) -> Vec<Guest>;
    async fn get(&self, id: GuestId) -> Result<Guest, EngineError>;
    async fn create(&self, draft: GuestDraft) -> Result<Guest, EngineError>;
    async fn update(&self, id: GuestId, patch: GuestPatch) -> Result<Guest, EngineError>;
    async fn delete(&self, id: GuestId) -> Result<Guest, EngineError>;
    /// Occupies the guest's room and emits `guest.status-changed`.
    async fn check_in(&self, id: GuestId) -> Result<Guest, EngineError>;
    /// Sends the guest's room to cleaning and emits `guest.status-changed`.
    async fn check_out(&self, id: GuestId) -> Result<Guest, EngineError>;
}

#[async_trait]
pub trait TaskRepo {
    async fn list(&self) -> Vec<HousekeepingTask>;
    async fn create(&self, draft: TaskDraft) -> Result<HousekeepingTask, EngineError>;
    async fn delete(&self, id: TaskId) -> Result<HousekeepingTask, EngineError>;
    /// Drop the task into a board column, applying the cleaning-completion rule.
    async fn move_to(&self, id: TaskId, column: TaskStatus) -> Result<HousekeepingTask, EngineError>;
}
