//! Effective scan length for a job.
//!
//! The server hands out a requested duration plus a timeout measured from the
//! job's creation. Both are judged against the server's own clock reading that
//! arrives with the job, so the anchor's local clock never enters the math.

use std::time::Duration;

use anchorscan_model::{ScanJob, parse_server_time};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Longest scan a single job may ask for, one day.
pub const MAX_SCAN_SECS: u64 = 86_400;

/// Tunables for the deadline computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadlinePolicy {
    /// Substitute for unparseable duration or timeout values (seconds).
    pub fallback_secs: f64,
    /// Margin subtracted from the remaining time to absorb transport delay
    /// and server clock skew (seconds).
    pub skew_margin_secs: f64,
}

impl Default for DeadlinePolicy {
    fn default() -> Self {
        Self {
            fallback_secs: 120.0,
            skew_margin_secs: 5.0,
        }
    }
}

impl DeadlinePolicy {
    fn parse_seconds(&self, field: &str, raw: &str) -> f64 {
        match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() && value >= 0.0 => value,
            _ => {
                warn!(
                    field,
                    raw,
                    fallback = self.fallback_secs,
                    "unparseable job seconds; using fallback"
                );
                self.fallback_secs
            }
        }
    }

    /// Effective scan length in seconds, never negative.
    ///
    /// Zero means the job expired before it could start.
    pub fn effective_secs(
        &self,
        duration: &str,
        timeout: Option<&str>,
        created_at: &str,
        server_now: &str,
    ) -> f64 {
        let duration = self.parse_seconds("duration", duration);
        let timeout = match timeout {
            Some(raw) => self.parse_seconds("timeout", raw),
            None => duration,
        };

        let (created, now) =
            match (parse_server_time(created_at), parse_server_time(server_now)) {
                (Ok(created), Ok(now)) => (created, now),
                (created, now) => {
                    let reason = created
                        .err()
                        .or(now.err())
                        .map(|err| err.to_string())
                        .unwrap_or_default();
                    warn!(%reason, "job timestamps unusable; scanning for the raw duration");
                    return cap(duration);
                }
            };

        let expiry_ms = created.timestamp_millis() as f64 + timeout * 1000.0;
        let remaining = (expiry_ms - now.timestamp_millis() as f64) / 1000.0;
        let effective = duration.min(remaining - self.skew_margin_secs);
        cap(effective.max(0.0))
    }

    pub fn for_job(&self, job: &ScanJob) -> f64 {
        self.effective_secs(
            &job.duration,
            job.timeout.as_deref(),
            &job.created_at,
            &job.server_now,
        )
    }
}

fn cap(secs: f64) -> f64 {
    let ceiling = MAX_SCAN_SECS as f64;
    if secs > ceiling {
        warn!(requested = secs, ceiling, "job asks for an oversized scan; capping");
        return ceiling;
    }
    secs
}

/// Converts non-negative seconds into a timer duration, saturating at
/// [`MAX_SCAN_SECS`].
pub fn as_duration(secs: f64) -> Duration {
    let secs = secs.clamp(0.0, MAX_SCAN_SECS as f64);
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}
