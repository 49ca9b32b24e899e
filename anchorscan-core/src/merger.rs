//! Best-signal bookkeeping for the active job.

use anchorscan_model::MatchedTag;
use chrono::{DateTime, Utc};

use crate::beacon::InstanceId;
use crate::roster::TagRoster;

/// What a single observation did to the matched set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Instance is not on the roster.
    Unmatched,
    /// First sighting of a roster tag. `complete` is true exactly once per
    /// job: on the sighting that covers the last outstanding roster entry.
    New { complete: bool },
    /// Stronger reading replaced the stored one.
    Improved,
    /// Reading was not stronger than the stored one.
    Kept,
}

#[derive(Debug, Default)]
pub struct ObservationMerger {
    matched: Vec<MatchedTag>,
    completion_signalled: bool,
}

impl ObservationMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(
        &mut self,
        roster: &TagRoster,
        instance: &InstanceId,
        rssi: i32,
        at: DateTime<Utc>,
    ) -> MergeOutcome {
        let Some(tag) = roster.find_by_instance(instance) else {
            return MergeOutcome::Unmatched;
        };

        let outcome = match self.matched.iter_mut().find(|m| m.tag_id == tag.tag_id) {
            Some(existing) if rssi > existing.rssi => {
                existing.rssi = rssi;
                existing.last_seen = at;
                MergeOutcome::Improved
            }
            Some(_) => MergeOutcome::Kept,
            None => {
                self.matched.push(MatchedTag::first_sighting(tag, rssi, at));
                let complete = !self.completion_signalled
                    && !roster.is_empty()
                    && self.matched.len() == roster.len();
                self.completion_signalled |= complete;
                MergeOutcome::New { complete }
            }
        };

        if outcome != MergeOutcome::Kept {
            self.matched.sort_by(|a, b| b.rssi.cmp(&a.rssi));
        }
        outcome
    }

    /// Matched tags, strongest first.
    pub fn matched(&self) -> &[MatchedTag] {
        &self.matched
    }

    pub fn len(&self) -> usize {
        self.matched.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matched.is_empty()
    }

    /// Hands the result set out and resets for the next job.
    pub fn take(&mut self) -> Vec<MatchedTag> {
        self.completion_signalled = false;
        std::mem::take(&mut self.matched)
    }
}
