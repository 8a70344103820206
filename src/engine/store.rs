use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use crate::model::*;

/// Room record plus its reservations; the unit of locking.
#[derive(Debug, Clone)]
pub struct RoomState {
    pub room: Room,
    /// All reservations on this room, sorted by `stay.check_in`.
    pub reservations: Vec<Reservation>,
    /// Set when the room is deleted; late writers holding the Arc must treat it as gone.
    pub retired: bool,
}

impl RoomState {
    pub fn new(room: Room) -> Self {
        Self {
            room,
            reservations: Vec::new(),
            retired: false,
        }
    }

    /// Insert reservation maintaining sort order by check-in.
    pub fn insert_reservation(&mut self, reservation: Reservation) {
        let pos = self
            .reservations
            .binary_search_by_key(&reservation.stay.check_in, |r| r.stay.check_in)
            .unwrap_or_else(|e| e);
        self.reservations.insert(pos, reservation);
    }

    pub fn remove_reservation(&mut self, id: ReservationId) -> Option<Reservation> {
        let pos = self.reservations.iter().position(|r| r.id == id)?;
        Some(self.reservations.remove(pos))
    }

    pub fn reservation(&self, id: ReservationId) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.id == id)
    }

    /// Reservations sharing at least one night with `stay`.
    /// Binary search skips everything checking in on or after `stay.check_out`.
    pub fn overlapping<'a>(&'a self, stay: &'a Stay) -> impl Iterator<Item = &'a Reservation> {
        let right_bound = self
            .reservations
            .partition_point(|r| r.stay.check_in < stay.check_out);
        self.reservations[..right_bound]
            .iter()
            .filter(move |r| r.stay.check_out > stay.check_in)
    }

    pub fn confirmed_count(&self) -> usize {
        self.reservations.iter().filter(|r| r.is_confirmed()).count()
    }
}

/// Monotonic id allocator. Ids are never reused, even after deletes.
#[derive(Debug)]
pub struct Sequence(AtomicU32);

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequence {
    pub fn new() -> Self {
        Self(AtomicU32::new(1))
    }

    pub fn next(&self) -> u32 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }

    /// Make sure future ids land above `id` (used when seeding explicit ids).
    pub fn observe(&self, id: u32) {
        self.0.fetch_max(id.saturating_add(1), Ordering::Relaxed);
    }
}

pub const PALETTE: [&str; 7] = [
    "#3B82F6", "#10B981", "#F59E0B", "#8B5CF6", "#EF4444", "#06B6D4", "#84CC16",
];

/// Round-robin reservation colours.
#[derive(Debug, Default)]
pub struct Palette(AtomicUsize);

impl Palette {
    pub fn next(&self) -> &'static str {
        PALETTE[self.0.fetch_add(1, Ordering::Relaxed) % PALETTE.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn room() -> Room {
        Room {
            id: 1,
            number: "101".into(),
            room_type: RoomType::Standard,
            floor: 1,
            capacity: 2,
            rate: 180.0,
            status: RoomStatus::Vacant,
            occupancy: None,
            housekeeping_status: HousekeepingStatus::Ready,
        }
    }

    fn booking(id: ReservationId, from: u32, to: u32) -> Reservation {
        Reservation {
            id,
            guest_name: format!("guest {id}"),
            room_id: 1,
            stay: Stay::new(d(from), d(to)),
            guests: 1,
            status: ReservationStatus::Confirmed,
            color: PALETTE[0].into(),
        }
    }

    #[test]
    fn reservations_kept_sorted() {
        let mut rs = RoomState::new(room());
        rs.insert_reservation(booking(1, 20, 22));
        rs.insert_reservation(booking(2, 5, 7));
        rs.insert_reservation(booking(3, 10, 12));
        let starts: Vec<_> = rs.reservations.iter().map(|r| r.stay.check_in).collect();
        assert_eq!(starts, vec![d(5), d(10), d(20)]);
    }

    #[test]
    fn overlapping_skips_past_and_future() {
        let mut rs = RoomState::new(room());
        rs.insert_reservation(booking(1, 1, 4));
        rs.insert_reservation(booking(2, 8, 12));
        rs.insert_reservation(booking(3, 20, 25));

        let query = Stay::new(d(10), d(15));
        let hits: Vec<_> = rs.overlapping(&query).map(|r| r.id).collect();
        assert_eq!(hits, vec![2]);
    }

    #[test]
    fn overlapping_adjacent_not_included() {
        let mut rs = RoomState::new(room());
        rs.insert_reservation(booking(1, 10, 15));
        let query = Stay::new(d(15), d(18));
        assert_eq!(rs.overlapping(&query).count(), 0);
        let before = Stay::new(d(7), d(10));
        assert_eq!(rs.overlapping(&before).count(), 0);
    }

    #[test]
    fn remove_middle_preserves_order() {
        let mut rs = RoomState::new(room());
        rs.insert_reservation(booking(1, 1, 2));
        rs.insert_reservation(booking(2, 3, 4));
        rs.insert_reservation(booking(3, 5, 6));
        assert_eq!(rs.remove_reservation(2).map(|r| r.id), Some(2));
        assert!(rs.remove_reservation(2).is_none());
        let ids: Vec<_> = rs.reservations.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn sequence_observe_skips_seeded_ids() {
        let seq = Sequence::new();
        assert_eq!(seq.next(), 1);
        seq.observe(10);
        assert_eq!(seq.next(), 11);
        seq.observe(3); // never goes backwards
        assert_eq!(seq.next(), 12);
    }

    #[test]
    fn palette_round_robin() {
        let p = Palette::default();
        let first: Vec<_> = (0..PALETTE.len()).map(|_| p.next()).collect();
        assert_eq!(first, PALETTE.to_vec());
        assert_eq!(p.next(), PALETTE[0]);
    }
}
