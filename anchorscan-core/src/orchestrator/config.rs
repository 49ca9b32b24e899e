use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::beacon::Namespace;
use crate::deadline::DeadlinePolicy;

/// Knobs for the job lifecycle loop.
///
/// Every field has a default so a deployment only spells out what it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Delay between job polls while idle.
    pub poll_interval_ms: u64,
    /// Cadence of the cosmetic progress updates while scanning.
    pub progress_interval_ms: u64,
    /// Length of an operator-triggered debug scan.
    pub debug_scan_secs: u64,
    /// Ask the radio to report every advertisement, not just the first per device.
    pub allow_duplicates: bool,
    /// Namespace a UID frame must carry to be considered one of our tags.
    pub namespace: Namespace,
    pub deadline: DeadlinePolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            progress_interval_ms: 1_000,
            debug_scan_secs: 15,
            allow_duplicates: true,
            namespace: Namespace::DEFAULT,
            deadline: DeadlinePolicy::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }

    pub fn debug_scan_duration(&self) -> Duration {
        Duration::from_secs(self.debug_scan_secs)
    }
}
