//! Room status state machine.
//!
//! Every state can reach every other state. Under [`TransitionPolicy::Strict`]
//! only the recommended operational flow is accepted from the desk:
//!
//! ```text
//! occupied ──▶ cleaning ──▶ vacant
//! vacant | cleaning ──▶ occupied      (check-in)
//! any ──▶ maintenance ──▶ vacant
//! ```
//!
//! Anything else needs [`Authority::Override`].

use serde::{Deserialize, Serialize};

use crate::model::*;

use super::EngineError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
    #[default]
    Permissive,
    Strict,
}

/// Who is asking for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    /// Regular desk and housekeeping flow, subject to the policy.
    Desk,
    /// Explicitly confirmed administrative change, bypasses the policy.
    Override,
}

/// An applied transition, ready to be announced as `room.status-changed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub room_id: RoomId,
    pub previous: RoomStatus,
    pub new: RoomStatus,
}

impl StatusChange {
    pub fn event(&self) -> HotelEvent {
        HotelEvent::RoomStatusChanged {
            room_id: self.room_id,
            previous_status: self.previous,
            new_status: self.new,
        }
    }
}

pub fn is_recommended(from: RoomStatus, to: RoomStatus) -> bool {
    use RoomStatus::*;
    from == to
        || matches!(
            (from, to),
            (Occupied, Cleaning)
                | (Cleaning, Vacant)
                | (Vacant | Cleaning, Occupied)
                | (_, Maintenance)
                | (Maintenance, Vacant)
        )
}

/// Check a transition without touching the room. Returns `false` for a same-status no-op.
pub fn validate(
    room: &Room,
    target: RoomStatus,
    occupant: Option<&Occupancy>,
    policy: TransitionPolicy,
    authority: Authority,
) -> Result<bool, EngineError> {
    if room.status == target {
        return Ok(false);
    }
    if policy == TransitionPolicy::Strict
        && authority == Authority::Desk
        && !is_recommended(room.status, target)
    {
        return Err(EngineError::TransitionNotAllowed {
            from: room.status,
            to: target,
        });
    }
    if target == RoomStatus::Occupied {
        let occupant =
            occupant.ok_or_else(|| EngineError::invalid("occupied requires guest name and stay dates"))?;
        validate_occupant(occupant)?;
    }
    Ok(true)
}

pub fn validate_occupant(occupant: &Occupancy) -> Result<(), EngineError> {
    if occupant.guest_name.trim().is_empty() {
        return Err(EngineError::invalid("occupant guest name is required"));
    }
    if occupant.check_out <= occupant.check_in {
        return Err(EngineError::invalid("occupant check-out must be after check-in"));
    }
    Ok(())
}

/// Apply a transition that already passed [`validate`]. Same status is a no-op:
/// nothing changes and no change is reported.
pub fn apply(room: &mut Room, target: RoomStatus, occupant: Option<Occupancy>) -> Option<StatusChange> {
    if room.status == target {
        return None;
    }
    let previous = room.status;
    room.status = target;
    room.occupancy = if target == RoomStatus::Occupied {
        occupant
    } else {
        None
    };
    Some(StatusChange {
        room_id: room.id,
        previous,
        new: target,
    })
}

/// Validate then apply.
pub fn transition(
    room: &mut Room,
    target: RoomStatus,
    occupant: Option<Occupancy>,
    policy: TransitionPolicy,
    authority: Authority,
) -> Result<Option<StatusChange>, EngineError> {
    validate(room, target, occupant.as_ref(), policy, authority)?;
    Ok(apply(room, target, occupant))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use RoomStatus::*;

    fn room(status: RoomStatus) -> Room {
        let occupancy = (status == Occupied).then(guest);
        Room {
            id: 301,
            number: "301".into(),
            room_type: RoomType::Deluxe,
            floor: 3,
            capacity: 2,
            rate: 250.0,
            status,
            occupancy,
            housekeeping_status: HousekeepingStatus::Ready,
        }
    }

    fn guest() -> Occupancy {
        Occupancy {
            guest_name: "John Smith".into(),
            check_in: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2024, 1, 18).unwrap(),
        }
    }

    #[test]
    fn permissive_allows_everything() {
        for &from in RoomStatus::ALL {
            for &to in RoomStatus::ALL {
                let mut r = room(from);
                let occupant = (to == Occupied).then(guest);
                let res = transition(&mut r, to, occupant, TransitionPolicy::Permissive, Authority::Desk);
                assert!(res.is_ok(), "{from} -> {to}");
                assert_eq!(r.status, to);
            }
        }
    }

    #[test]
    fn leaving_occupied_clears_occupancy() {
        let mut r = room(Occupied);
        let change = transition(&mut r, Cleaning, None, TransitionPolicy::Permissive, Authority::Desk)
            .unwrap()
            .unwrap();
        assert_eq!(change.previous, Occupied);
        assert_eq!(change.new, Cleaning);
        assert!(r.occupancy.is_none());
    }

    #[test]
    fn same_status_is_noop() {
        let mut r = room(Occupied);
        let before = r.clone();
        let change = transition(&mut r, Occupied, None, TransitionPolicy::Strict, Authority::Desk).unwrap();
        assert!(change.is_none());
        assert_eq!(r, before);
    }

    #[test]
    fn occupied_requires_occupant() {
        let mut r = room(Vacant);
        let err = transition(&mut r, Occupied, None, TransitionPolicy::Permissive, Authority::Desk)
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(r.status, Vacant); // nothing applied

        let mut bad = guest();
        bad.check_out = bad.check_in;
        assert!(transition(&mut r, Occupied, Some(bad), TransitionPolicy::Permissive, Authority::Desk).is_err());
    }

    #[test]
    fn strict_recommended_flow() {
        assert!(is_recommended(Occupied, Cleaning));
        assert!(is_recommended(Cleaning, Vacant));
        assert!(is_recommended(Vacant, Occupied));
        assert!(is_recommended(Cleaning, Occupied));
        assert!(is_recommended(Occupied, Maintenance));
        assert!(is_recommended(Maintenance, Vacant));

        assert!(!is_recommended(Occupied, Vacant));
        assert!(!is_recommended(Vacant, Cleaning));
        assert!(!is_recommended(Maintenance, Occupied));
        assert!(!is_recommended(Maintenance, Cleaning));
    }

    #[test]
    fn strict_rejects_shortcut_unless_overridden() {
        let mut r = room(Occupied);
        let err = transition(&mut r, Vacant, None, TransitionPolicy::Strict, Authority::Desk).unwrap_err();
        assert_eq!(err, EngineError::TransitionNotAllowed { from: Occupied, to: Vacant });
        assert_eq!(r.status, Occupied);
        assert!(r.occupancy.is_some());

        let change = transition(&mut r, Vacant, None, TransitionPolicy::Strict, Authority::Override).unwrap();
        assert!(change.is_some());
        assert_eq!(r.status, Vacant);
    }
}
