// Water reading domain model
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Format used when a reading is stamped at creation time.
pub const MINUTE_FORMAT: &str = "%Y-%m-%d %H:%M";
/// Older files may carry second precision.
pub const SECOND_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One timestamped measurement for a named aquarium profile.
///
/// The constructor never validates; callers run `domain::validation` first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterReading {
    pub timestamp: String,
    pub name: String,
    #[serde(rename = "pH")]
    pub ph: f64,
    pub temperature: f64,
    pub ammonia: f64,
    /// Nil when the stored record predates ids; see `assign_missing_id`.
    #[serde(default)]
    pub id: Uuid,
}

impl WaterReading {
    pub fn new(name: String, ph: f64, temperature: f64, ammonia: f64) -> Self {
        Self::with_timestamp(name, ph, temperature, ammonia, current_timestamp())
    }

    pub fn with_timestamp(
        name: String,
        ph: f64,
        temperature: f64,
        ammonia: f64,
        timestamp: String,
    ) -> Self {
        Self {
            timestamp,
            name,
            ph,
            temperature,
            ammonia,
            id: Uuid::new_v4(),
        }
    }

    /// Parses the stored timestamp at either minute or second precision.
    pub fn recorded_at(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.timestamp)
    }

    /// Gives a record loaded without an id a fresh one. Returns whether it
    /// changed, so the caller knows to write the file back.
    pub fn assign_missing_id(&mut self) -> bool {
        if !self.id.is_nil() {
            return false;
        }
        self.id = Uuid::new_v4();
        true
    }

    pub fn is_profile(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

pub fn current_timestamp() -> String {
    Local::now().format(MINUTE_FORMAT).to_string()
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, SECOND_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, MINUTE_FORMAT))
        .ok()
}
