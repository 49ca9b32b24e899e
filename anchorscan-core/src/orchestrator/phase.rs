use std::fmt;

use serde::Serialize;

/// Where the anchor is in its job lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    JobReceived,
    FetchingRoster,
    Scanning,
    Uploading,
    /// Operator scan; excludes every job phase.
    DebugScanning,
}

impl Phase {
    /// True while nothing owns the radio and no job is in flight.
    pub fn is_idle(self) -> bool {
        matches!(self, Phase::Idle)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Idle => "idle",
            Phase::JobReceived => "job-received",
            Phase::FetchingRoster => "fetching-roster",
            Phase::Scanning => "scanning",
            Phase::Uploading => "uploading",
            Phase::DebugScanning => "debug-scanning",
        };
        f.write_str(label)
    }
}

/// Why a job scan is ending.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinishTrigger {
    Deadline,
    AllTagsSeen,
}

/// How far [`super::Orchestrator::accept_job`] got.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStart {
    Scanning { duration: std::time::Duration },
    /// Another job or a debug scan already owns the radio.
    Busy,
    Expired,
    RosterFailed,
    RadioUnavailable,
}

/// Result of one poll attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    Skipped,
    NoWork,
    Failed,
    Job(JobStart),
}
