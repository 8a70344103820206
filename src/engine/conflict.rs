use chrono::NaiveDate;

use crate::limits::*;
use crate::model::*;

use super::store::RoomState;
use super::{ConflictKind, EngineError};

pub(crate) fn validate_text(field: &str, value: &str) -> Result<(), EngineError> {
    if value.trim().is_empty() {
        return Err(EngineError::invalid(format!("{field} is required")));
    }
    if value.len() > MAX_NAME_LEN {
        return Err(EngineError::LimitExceeded("text field too long"));
    }
    Ok(())
}

pub(crate) fn validate_stay(check_in: NaiveDate, check_out: NaiveDate) -> Result<Stay, EngineError> {
    if check_out <= check_in {
        return Err(EngineError::invalid("check-out must be after check-in"));
    }
    if (check_out - check_in).num_days() > MAX_STAY_NIGHTS {
        return Err(EngineError::LimitExceeded("stay too long"));
    }
    Ok(Stay::new(check_in, check_out))
}

pub(crate) fn validate_guest_count(guests: u32) -> Result<(), EngineError> {
    if guests < 1 {
        return Err(EngineError::invalid("at least one guest is required"));
    }
    if guests > MAX_GUESTS_PER_RESERVATION {
        return Err(EngineError::LimitExceeded("too many guests"));
    }
    Ok(())
}

pub(crate) fn validate_room_fields(number: &str, capacity: u32, rate: f64) -> Result<(), EngineError> {
    if number.trim().is_empty() {
        return Err(EngineError::invalid("room number is required"));
    }
    if number.len() > MAX_ROOM_NUMBER_LEN {
        return Err(EngineError::LimitExceeded("room number too long"));
    }
    if capacity < 1 {
        return Err(EngineError::invalid("room capacity must be at least 1"));
    }
    if !rate.is_finite() || rate < 0.0 {
        return Err(EngineError::invalid("room rate must be a non-negative amount"));
    }
    Ok(())
}

/// Reject `stay` if it shares a night with another confirmed reservation on the room.
/// `exclude` skips the reservation being edited.
pub(crate) fn check_no_overlap(
    rs: &RoomState,
    stay: &Stay,
    exclude: Option<ReservationId>,
) -> Result<(), EngineError> {
    for other in rs.overlapping(stay) {
        if Some(other.id) == exclude || !other.is_confirmed() {
            continue;
        }
        metrics::counter!(crate::observability::RESERVATION_CONFLICTS_TOTAL).increment(1);
        return Err(EngineError::Conflict(ConflictKind::Overlap {
            reservation_id: other.id,
        }));
    }
    Ok(())
}

/// Guests above room capacity is a warning, never a rejection.
pub fn capacity_warning(room: &Room, guests: u32, reservation_id: Option<ReservationId>) -> Option<CapacityWarning> {
    (guests > room.capacity).then(|| CapacityWarning {
        reservation_id,
        room_id: room.id,
        guests,
        capacity: room.capacity,
    })
}
