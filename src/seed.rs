//! Static dataset the engine is populated from at startup.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::EngineError;
use crate::model::{Guest, HousekeepingTask, Reservation, Room};

const EMBEDDED: &str = include_str!("../data/seed.json");

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("reading seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing seed data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("seed data rejected: {0}")]
    Invalid(#[from] EngineError),
}

/// Records with explicit ids. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedData {
    pub rooms: Vec<Room>,
    pub reservations: Vec<Reservation>,
    pub guests: Vec<Guest>,
    pub tasks: Vec<HousekeepingTask>,
}

impl SeedData {
    /// The demo hotel compiled into the binary.
    pub fn embedded() -> Result<Self, SeedError> {
        Self::from_json(EMBEDDED)
    }

    pub fn from_json(json: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_dataset_parses() {
        let seed = SeedData::embedded().unwrap();
        assert_eq!(seed.rooms.len(), 11);
        assert_eq!(seed.reservations.len(), 5);
        assert_eq!(seed.guests.len(), 6);
        assert_eq!(seed.tasks.len(), 4);
        assert!(seed.rooms.iter().any(|r| r.number == "301"));
    }

    #[test]
    fn sections_are_optional() {
        let seed = SeedData::from_json(r#"{"rooms": []}"#).unwrap();
        assert_eq!(seed, SeedData::default());
    }

    #[test]
    fn unknown_status_is_rejected() {
        let json = r#"{"rooms": [{"id": 1, "number": "1", "roomType": "standard", "floor": 1,
            "capacity": 2, "rate": 100.0, "status": "haunted", "housekeepingStatus": "ready"}]}"#;
        assert!(matches!(SeedData::from_json(json), Err(SeedError::Parse(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SeedData::from_path("/nonexistent/frontdesk-seed.json").unwrap_err();
        assert!(matches!(err, SeedError::Io(_)));
    }
}
