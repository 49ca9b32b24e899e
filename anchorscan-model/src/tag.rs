use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lenient;

/// One roster entry from `GET /get-tags-by-event/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    /// Public identifier shown to operators.
    #[serde(rename = "tag_id", deserialize_with = "lenient::string")]
    pub tag_id: String,

    /// 16 byte beacon identity as hex. Case and separators vary by client.
    #[serde(rename = "tag_uuid")]
    pub uuid: String,

    /// Opaque row id, only echoed back when reporting.
    #[serde(rename = "tag_db_id", deserialize_with = "lenient::string")]
    pub db_id: String,
}

impl TagRecord {
    /// Upper-case hex with separators removed.
    pub fn normalized_uuid(&self) -> String {
        self.uuid
            .chars()
            .filter(|c| !matches!(c, '-' | ':' | ' '))
            .collect::<String>()
            .to_uppercase()
    }
}

/// Best observation of a roster tag within the active job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedTag {
    pub tag_id: String,
    pub uuid: String,
    pub db_id: String,
    pub rssi: i32,
    pub last_seen: DateTime<Utc>,
}

impl MatchedTag {
    pub fn first_sighting(tag: &TagRecord, rssi: i32, at: DateTime<Utc>) -> Self {
        Self {
            tag_id: tag.tag_id.clone(),
            uuid: tag.normalized_uuid(),
            db_id: tag.db_id.clone(),
            rssi,
            last_seen: at,
        }
    }
}
