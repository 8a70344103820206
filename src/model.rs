use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::engine::EngineError;

pub type RoomId = u32;
pub type ReservationId = u32;
pub type GuestId = u32;
pub type TaskId = u32;

/// Closed string-tagged enum: serde and `FromStr` both reject anything outside the listed values.
macro_rules! closed_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = EngineError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(EngineError::Validation(format!(
                        concat!("unknown ", stringify!($name), " value {:?}"),
                        other
                    ))),
                }
            }
        }
    };
}

closed_enum!(
    /// Room lifecycle state. All four are steady states.
    RoomStatus {
        Vacant => "vacant",
        Occupied => "occupied",
        Cleaning => "cleaning",
        Maintenance => "maintenance",
    }
);

closed_enum!(
    RoomType {
        Standard => "standard",
        Deluxe => "deluxe",
        Suite => "suite",
    }
);

closed_enum!(
    /// Evolves independently of [`RoomStatus`].
    HousekeepingStatus {
        Pending => "pending",
        InProgress => "in-progress",
        Completed => "completed",
        Ready => "ready",
    }
);

closed_enum!(
    ReservationStatus {
        Confirmed => "confirmed",
        Cancelled => "cancelled",
    }
);

closed_enum!(
    GuestStatus {
        CheckedIn => "checked-in",
        CheckedOut => "checked-out",
        NoShow => "no-show",
    }
);

closed_enum!(
    TaskType {
        Cleaning => "cleaning",
        Maintenance => "maintenance",
        Inspection => "inspection",
    }
);

closed_enum!(
    Priority {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
);

closed_enum!(
    /// Housekeeping board column.
    TaskStatus {
        ToClean => "to-clean",
        InProgress => "in-progress",
        Completed => "completed",
    }
);

/// Half-open stay `[check_in, check_out)`: the guest holds the room on `check_in`
/// through the night before `check_out`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stay {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl Stay {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Self {
        debug_assert!(check_in < check_out, "Stay check_in must be before check_out");
        Self { check_in, check_out }
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// Occupancy-day membership. The checkout day itself is not occupied.
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.check_in <= date && date < self.check_out
    }

    /// True when both stays share at least one occupied night.
    pub fn overlaps(&self, other: &Stay) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }

    /// Closed-range intersection with `[start, end]`, boundary days included.
    /// Used for "reservations touching this window", not for occupancy.
    pub fn touches(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.check_in <= end && self.check_out >= start
    }

    /// The last occupied night.
    pub fn last_night(&self) -> NaiveDate {
        self.check_out - Duration::days(1)
    }
}

/// Who holds an occupied room. Present on a [`Room`] iff its status is occupied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occupancy {
    pub guest_name: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub number: String,
    pub room_type: RoomType,
    pub floor: i32,
    pub capacity: u32,
    /// Nightly price.
    pub rate: f64,
    pub status: RoomStatus,
    pub occupancy: Option<Occupancy>,
    pub housekeeping_status: HousekeepingStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: ReservationId,
    pub guest_name: String,
    pub room_id: RoomId,
    #[serde(flatten)]
    pub stay: Stay,
    pub guests: u32,
    pub status: ReservationStatus,
    /// Presentation tag, assigned round-robin at creation.
    pub color: String,
}

impl Reservation {
    pub fn is_confirmed(&self) -> bool {
        self.status == ReservationStatus::Confirmed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    pub id: GuestId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub room_id: RoomId,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub status: GuestStatus,
    pub vip: bool,
    pub special_requests: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HousekeepingTask {
    pub id: TaskId,
    pub room_number: String,
    pub task_type: TaskType,
    pub priority: Priority,
    pub assigned_to: String,
    pub status: TaskStatus,
    pub estimated_minutes: u32,
    pub due_at: NaiveDateTime,
}

// ── Create / update payloads ─────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDraft {
    pub number: String,
    pub room_type: RoomType,
    pub floor: i32,
    pub capacity: u32,
    pub rate: f64,
    /// Defaults to vacant.
    #[serde(default)]
    pub status: Option<RoomStatus>,
    /// Required when `status` is occupied.
    #[serde(default)]
    pub occupancy: Option<Occupancy>,
    /// Defaults to ready.
    #[serde(default)]
    pub housekeeping_status: Option<HousekeepingStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoomPatch {
    pub number: Option<String>,
    pub room_type: Option<RoomType>,
    pub floor: Option<i32>,
    pub capacity: Option<u32>,
    pub rate: Option<f64>,
    pub status: Option<RoomStatus>,
    pub occupancy: Option<Occupancy>,
    pub housekeeping_status: Option<HousekeepingStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationDraft {
    pub guest_name: String,
    pub room_id: RoomId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReservationPatch {
    pub guest_name: Option<String>,
    pub room_id: Option<RoomId>,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub guests: Option<u32>,
    pub status: Option<ReservationStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestDraft {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub room_id: RoomId,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    /// Defaults to checked-in, which occupies the room on creation.
    #[serde(default)]
    pub status: Option<GuestStatus>,
    #[serde(default)]
    pub vip: bool,
    #[serde(default)]
    pub special_requests: Vec<String>,
}

/// Status is deliberately absent: it only changes through check-in, check-out and no-show.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GuestPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub room_id: Option<RoomId>,
    pub check_in_date: Option<NaiveDate>,
    pub check_out_date: Option<NaiveDate>,
    pub vip: Option<bool>,
    pub special_requests: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub room_number: String,
    pub task_type: TaskType,
    pub priority: Priority,
    pub assigned_to: String,
    pub estimated_minutes: u32,
}

// ── Events ───────────────────────────────────────────────────────

/// Bus topics. One broadcast channel per topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    #[serde(rename = "guest.status-changed")]
    GuestStatusChanged,
    #[serde(rename = "housekeeping.task-completed")]
    TaskCompleted,
    #[serde(rename = "room.status-changed")]
    RoomStatusChanged,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::GuestStatusChanged => "guest.status-changed",
            Topic::TaskCompleted => "housekeeping.task-completed",
            Topic::RoomStatusChanged => "room.status-changed",
        }
    }
}

/// Everything the core publishes. Payload shapes are fixed per topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "topic", content = "payload")]
pub enum HotelEvent {
    #[serde(rename = "guest.status-changed", rename_all = "camelCase")]
    GuestStatusChanged {
        guest_id: GuestId,
        room_number: String,
        status: GuestStatus,
    },
    #[serde(rename = "housekeeping.task-completed", rename_all = "camelCase")]
    TaskCompleted {
        room_number: String,
        task_type: TaskType,
    },
    #[serde(rename = "room.status-changed", rename_all = "camelCase")]
    RoomStatusChanged {
        room_id: RoomId,
        previous_status: RoomStatus,
        new_status: RoomStatus,
    },
}

impl HotelEvent {
    pub fn topic(&self) -> Topic {
        match self {
            HotelEvent::GuestStatusChanged { .. } => Topic::GuestStatusChanged,
            HotelEvent::TaskCompleted { .. } => Topic::TaskCompleted,
            HotelEvent::RoomStatusChanged { .. } => Topic::RoomStatusChanged,
        }
    }
}

// ── Query result types ───────────────────────────────────────────

/// Header counter: occupied rooms out of the total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupancySnapshot {
    pub occupied: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoomStatusCounts {
    pub vacant: usize,
    pub occupied: usize,
    pub cleaning: usize,
    pub maintenance: usize,
}

impl RoomStatusCounts {
    pub fn total(&self) -> usize {
        self.vacant + self.occupied + self.cleaning + self.maintenance
    }

    pub fn record(&mut self, status: RoomStatus) {
        match status {
            RoomStatus::Vacant => self.vacant += 1,
            RoomStatus::Occupied => self.occupied += 1,
            RoomStatus::Cleaning => self.cleaning += 1,
            RoomStatus::Maintenance => self.maintenance += 1,
        }
    }
}

/// Room grid filter. `search` matches number, guest name or type, case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomFilter {
    pub status: Option<RoomStatus>,
    pub search: Option<String>,
}

/// Where a day falls within a stay, for calendar rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellPosition {
    pub is_start: bool,
    pub is_end: bool,
    pub is_middle: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEntry {
    pub reservation_id: ReservationId,
    pub room_id: RoomId,
    pub color: String,
    pub position: CellPosition,
    /// Only the start cell carries the guest name and room number.
    pub guest_name: Option<String>,
    pub room_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub entries: Vec<CalendarEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
    pub days: Vec<CalendarDay>,
    /// Reservations touching the month (closed-range test).
    pub reservation_count: usize,
    /// Rough estimate, see [`crate::engine::period_occupancy_estimate`].
    pub occupancy_estimate: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityWarning {
    pub reservation_id: Option<ReservationId>,
    pub room_id: RoomId,
    pub guests: u32,
    pub capacity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeskMetrics {
    pub total_rooms: usize,
    /// Rooms whose status is occupied.
    pub occupied_rooms: usize,
    pub occupancy_rate: u32,
    /// Confirmed reservations in house today.
    pub rooms_sold: usize,
    pub today_revenue: f64,
    pub adr: f64,
    pub revpar: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RevenueSource {
    Reservations,
    /// Demo filler when there is no reservation data at all.
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenuePoint {
    pub date: NaiveDate,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueHistory {
    pub source: RevenueSource,
    pub points: Vec<RevenuePoint>,
}

impl RevenueHistory {
    pub fn total(&self) -> f64 {
        self.points.iter().map(|p| p.revenue).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueComparison {
    pub source: RevenueSource,
    pub current: f64,
    pub previous: f64,
    /// None when the previous window earned nothing.
    pub change_percent: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskBoard {
    pub to_clean: Vec<HousekeepingTask>,
    pub in_progress: Vec<HousekeepingTask>,
    pub completed: Vec<HousekeepingTask>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSummary {
    /// Everything not yet completed.
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub average_minutes: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn stay_contains_is_half_open() {
        let s = Stay::new(d("2024-01-15"), d("2024-01-18"));
        assert_eq!(s.nights(), 3);
        assert!(s.contains_date(d("2024-01-15")));
        assert!(s.contains_date(d("2024-01-17")));
        assert!(!s.contains_date(d("2024-01-18"))); // checkout day is free
        assert!(!s.contains_date(d("2024-01-14")));
    }

    #[test]
    fn stay_overlap() {
        let a = Stay::new(d("2024-01-15"), d("2024-01-18"));
        let b = Stay::new(d("2024-01-17"), d("2024-01-20"));
        let c = Stay::new(d("2024-01-18"), d("2024-01-21"));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c)); // back-to-back, same-day turnover
    }

    #[test]
    fn stay_touches_is_closed() {
        let s = Stay::new(d("2024-01-15"), d("2024-01-18"));
        assert!(s.touches(d("2024-01-01"), d("2024-01-31")));
        assert!(s.touches(d("2024-01-18"), d("2024-01-18")));
        assert!(s.touches(d("2024-01-10"), d("2024-01-15")));
        assert!(!s.touches(d("2024-01-19"), d("2024-01-31")));
    }

    #[test]
    fn stay_last_night() {
        let s = Stay::new(d("2024-02-28"), d("2024-03-01"));
        assert_eq!(s.last_night(), d("2024-02-29"));
    }

    #[test]
    fn closed_enums_parse_known_values() {
        assert_eq!("in-progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!("no-show".parse::<GuestStatus>().unwrap(), GuestStatus::NoShow);
        assert_eq!("maintenance".parse::<RoomStatus>().unwrap(), RoomStatus::Maintenance);
        for status in RoomStatus::ALL {
            assert_eq!(status.as_str().parse::<RoomStatus>().unwrap(), *status);
        }
    }

    #[test]
    fn closed_enums_reject_unknown_values() {
        let err = "dirty".parse::<RoomStatus>().unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(err.to_string().contains("RoomStatus"));
        assert!("Cleaning".parse::<TaskType>().is_err()); // case matters

        let json = r#"{"roomNumber":"301","taskType":"polishing","priority":"low","assignedTo":"Ana","estimatedMinutes":30}"#;
        assert!(serde_json::from_str::<TaskDraft>(json).is_err());
    }

    #[test]
    fn event_topics() {
        let e = HotelEvent::TaskCompleted {
            room_number: "301".into(),
            task_type: TaskType::Cleaning,
        };
        assert_eq!(e.topic(), Topic::TaskCompleted);
        assert_eq!(e.topic().as_str(), "housekeeping.task-completed");
    }

    #[test]
    fn event_json_shape() {
        let e = HotelEvent::RoomStatusChanged {
            room_id: 7,
            previous_status: RoomStatus::Occupied,
            new_status: RoomStatus::Cleaning,
        };
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["topic"], "room.status-changed");
        assert_eq!(v["payload"]["roomId"], 7);
        assert_eq!(v["payload"]["previousStatus"], "occupied");
        assert_eq!(v["payload"]["newStatus"], "cleaning");
    }

    #[test]
    fn reservation_json_flattens_stay() {
        let r = Reservation {
            id: 1,
            guest_name: "John Smith".into(),
            room_id: 101,
            stay: Stay::new(d("2024-01-15"), d("2024-01-18")),
            guests: 2,
            status: ReservationStatus::Confirmed,
            color: "#3B82F6".into(),
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["checkIn"], "2024-01-15");
        assert_eq!(v["checkOut"], "2024-01-18");
        assert_eq!(v["status"], "confirmed");
    }

    #[test]
    fn status_counts_record() {
        let mut c = RoomStatusCounts::default();
        c.record(RoomStatus::Occupied);
        c.record(RoomStatus::Occupied);
        c.record(RoomStatus::Cleaning);
        assert_eq!(c.occupied, 2);
        assert_eq!(c.cleaning, 1);
        assert_eq!(c.total(), 3);
    }
}
