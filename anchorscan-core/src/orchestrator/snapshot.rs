use anchorscan_model::{GenericObservation, MatchedTag};
use serde::Serialize;

use super::phase::Phase;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ScanProgress {
    pub elapsed_secs: f64,
    pub total_secs: f64,
}

impl ScanProgress {
    pub fn fraction(&self) -> f64 {
        if self.total_secs <= 0.0 {
            1.0
        } else {
            (self.elapsed_secs / self.total_secs).clamp(0.0, 1.0)
        }
    }
}

/// Everything a status surface needs, published on every change.
#[derive(Clone, Debug, Default, Serialize)]
pub struct AnchorSnapshot {
    pub anchor_id: String,
    pub phase: Phase,
    pub status: String,
    pub radio_ready: bool,
    pub scan_id: Option<String>,
    pub progress: Option<ScanProgress>,
    pub roster_size: usize,
    pub matched: Vec<MatchedTag>,
    pub nearby: Vec<GenericObservation>,
}
