use thiserror::Error;

use crate::model::{ReservationId, RoomId, RoomStatus};

/// Kind of entity a lookup failed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Room,
    Reservation,
    Guest,
    Task,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Entity::Room => "room",
            Entity::Reservation => "reservation",
            Entity::Guest => "guest",
            Entity::Task => "task",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictKind {
    #[error("stay overlaps confirmed reservation {reservation_id}")]
    Overlap { reservation_id: ReservationId },
    #[error("room {room_id} is {status} and cannot take a guest")]
    RoomUnavailable { room_id: RoomId, status: RoomStatus },
    #[error("room number {0:?} is already in use")]
    DuplicateRoomNumber(String),
    #[error("room {room_id} still has {dependents} active booking(s) or guest(s)")]
    RoomInUse { room_id: RoomId, dependents: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// `key` is an id, or a room number for number-based lookups.
    #[error("{entity} not found: {key}")]
    NotFound { entity: Entity, key: String },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(ConflictKind),
    #[error("transition {from} -> {to} requires an administrative override")]
    TransitionNotAllowed { from: RoomStatus, to: RoomStatus },
    #[error("limit exceeded: {0}")]
    LimitExceeded(&'static str),
}

impl EngineError {
    pub fn not_found(entity: Entity, key: impl ToString) -> Self {
        EngineError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, EngineError::Conflict(_))
    }
}
