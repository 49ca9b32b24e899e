use std::time::Duration;

use anchorscan_model::ScanJob;
use tokio::time::Instant;

use crate::deadline::MAX_SCAN_SECS;
use crate::merger::ObservationMerger;
use crate::roster::TagRoster;

/// State that exists only while a job is scanning. Dropped as one unit when
/// the job ends, which is what clears the roster and matched set together.
#[derive(Debug)]
pub(crate) struct ActiveJob {
    pub job: ScanJob,
    pub roster: TagRoster,
    pub merger: ObservationMerger,
    pub min_rssi: i32,
    pub started_at: Instant,
    pub total: Duration,
}

impl ActiveJob {
    pub fn deadline(&self) -> Instant {
        self.started_at
            .checked_add(self.total)
            .or_else(|| self.started_at.checked_add(Duration::from_secs(MAX_SCAN_SECS)))
            .unwrap_or(self.started_at)
    }
}

#[derive(Debug)]
pub(crate) struct DebugScan {
    pub deadline: Instant,
}
