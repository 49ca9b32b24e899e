use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One advertisement as delivered by the radio driver.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RadioObservation {
    pub device_id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Proximity-beacon service data, starting at the frame type byte.
    #[serde(default)]
    pub service_data: Option<Vec<u8>>,
    /// Raw manufacturer specific data including the company identifier.
    #[serde(default)]
    pub manufacturer_data: Option<Vec<u8>>,
    pub rssi: i32,
}

/// Operator-facing record of any device heard during a debug scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericObservation {
    pub device_id: String,
    pub name: String,
    pub rssi: i32,
    pub description: String,
    pub last_seen: DateTime<Utc>,
}
