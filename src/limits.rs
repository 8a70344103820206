//! Hard caps on input sizes and windows. Exceeding one yields `EngineError::LimitExceeded`.

pub const MAX_ROOMS: usize = 10_000;
pub const MAX_NAME_LEN: usize = 256;
pub const MAX_ROOM_NUMBER_LEN: usize = 16;
pub const MAX_SPECIAL_REQUESTS: usize = 32;
pub const MAX_GUESTS_PER_RESERVATION: u32 = 32;

/// Longest bookable stay.
pub const MAX_STAY_NIGHTS: i64 = 365;

/// Widest `by_date_range` window, inclusive days.
pub const MAX_QUERY_WINDOW_DAYS: i64 = 731;

pub const MAX_REVENUE_WINDOW_DAYS: u32 = 366;

/// Longest estimated duration for a housekeeping task (one day).
pub const MAX_TASK_MINUTES: u32 = 24 * 60;

/// Upper bound on the simulated store latency, whatever the configuration says.
pub const MAX_SIMULATED_LATENCY_MS: u64 = 5_000;
