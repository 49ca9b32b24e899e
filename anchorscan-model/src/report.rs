use serde::{Deserialize, Serialize};

use crate::tag::MatchedTag;

/// One row of the `POST /scan_data` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanDataEntry {
    pub scan_id: String,
    pub scan_data_tag_id: String,
    pub scan_data_tag_rssi: i32,
    pub scan_data_anchor_id: String,
}

impl ScanDataEntry {
    pub fn from_match(scan_id: &str, anchor_db_id: &str, tag: &MatchedTag) -> Self {
        Self {
            scan_id: scan_id.to_string(),
            scan_data_tag_id: tag.db_id.clone(),
            scan_data_tag_rssi: tag.rssi,
            scan_data_anchor_id: anchor_db_id.to_string(),
        }
    }
}

/// Body of `POST /jet-rel/230`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipUpdate {
    pub parent_id: String,
    pub child_id: String,
    pub context: String,
    pub store_items_type: String,
}

impl RelationshipUpdate {
    pub fn parent_link(parent_id: &str, child_id: &str) -> Self {
        Self {
            parent_id: parent_id.to_string(),
            child_id: child_id.to_string(),
            context: "parent".to_string(),
            store_items_type: "update".to_string(),
        }
    }
}
