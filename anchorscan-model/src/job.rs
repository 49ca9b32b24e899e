use serde::{Deserialize, Serialize};

use crate::lenient;

/// One unit of scan work as returned by `GET /scan-by-anchor/`.
///
/// Field names follow the server schema verbatim. Numeric fields are kept as
/// raw text; the deadline calculator owns their interpretation and the
/// fallbacks for malformed values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanJob {
    #[serde(rename = "scan_id", deserialize_with = "lenient::string")]
    pub scan_id: String,

    /// Server-side row id of the anchor that owns the job.
    #[serde(rename = "anchor_db_id", deserialize_with = "lenient::string")]
    pub anchor_db_id: String,

    #[serde(rename = "scan_duration", deserialize_with = "lenient::string")]
    pub duration: String,

    #[serde(
        rename = "scan_timeout",
        default,
        deserialize_with = "lenient::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout: Option<String>,

    #[serde(
        rename = "scan_min_rssi",
        default,
        deserialize_with = "lenient::optional_i32"
    )]
    pub min_rssi: Option<i32>,

    #[serde(rename = "scan_created", deserialize_with = "lenient::string")]
    pub created_at: String,

    #[serde(rename = "event.event_id", deserialize_with = "lenient::string")]
    pub event_id: String,

    #[serde(rename = "server_time", deserialize_with = "lenient::string")]
    pub server_now: String,
}

impl ScanJob {
    /// Signal floor used when the server sends no usable minimum.
    pub const DEFAULT_MIN_RSSI: i32 = -100;

    pub fn min_rssi_or_default(&self) -> i32 {
        self.min_rssi.unwrap_or(Self::DEFAULT_MIN_RSSI)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_mixed_string_and_number_fields() {
        let raw = r#"{
            "scan_id": 4711,
            "anchor_db_id": "88",
            "scan_duration": 120,
            "scan_timeout": "60",
            "scan_min_rssi": "-90",
            "scan_created": "2024-05-01 10:00:00",
            "event.event_id": 12,
            "server_time": "2024-05-01 10:00:03"
        }"#;
        let job: ScanJob = serde_json::from_str(raw).unwrap();
        assert_eq!(job.scan_id, "4711");
        assert_eq!(job.anchor_db_id, "88");
        assert_eq!(job.duration, "120");
        assert_eq!(job.timeout.as_deref(), Some("60"));
        assert_eq!(job.min_rssi, Some(-90));
        assert_eq!(job.event_id, "12");
    }

    #[test]
    fn missing_timeout_and_garbage_rssi_become_none() {
        let raw = r#"{
            "scan_id": "a",
            "anchor_db_id": "b",
            "scan_duration": "30",
            "scan_timeout": "",
            "scan_min_rssi": "loud",
            "scan_created": "2024-05-01 10:00:00",
            "event.event_id": "e",
            "server_time": "2024-05-01 10:00:00"
        }"#;
        let job: ScanJob = serde_json::from_str(raw).unwrap();
        assert_eq!(job.timeout, None);
        assert_eq!(job.min_rssi, None);
        assert_eq!(job.min_rssi_or_default(), ScanJob::DEFAULT_MIN_RSSI);
    }
}
