//! Job lifecycle orchestrator.
//!
//! One task owns every piece of mutable job state. Polls, roster fetches,
//! radio events, timers and operator commands are all handled from the single
//! `select!` loop in [`Orchestrator::run`], so no two transitions ever overlap.
//! The deadline timer and early completion both funnel into
//! [`Orchestrator::finish_scan`], which only acts while the phase is still
//! `Scanning`; whichever trigger arrives second is a no-op.

mod config;
mod phase;
mod session;
mod snapshot;

use std::sync::Arc;

use anchorscan_model::{
    AnchorId, MatchedTag, RadioObservation, RelationshipUpdate, ScanDataEntry,
    ScanJob,
};
use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{Level, debug, info, trace, warn};

pub use config::OrchestratorConfig;
pub use phase::{FinishTrigger, JobStart, Phase, PollOutcome};
pub use snapshot::{AnchorSnapshot, ScanProgress};

use crate::beacon::{decode_instance, describe};
use crate::deadline::as_duration;
use crate::debug_view::GenericObservationSet;
use crate::merger::{MergeOutcome, ObservationMerger};
use crate::ports::{AnchorApi, RadioScanner};
use crate::roster::TagRoster;
use session::{ActiveJob, DebugScan};

/// Out-of-band instructions for the control loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    /// Operator asked for a debug scan.
    StartDebugScan,
    /// Radio driver reported a power/readiness change.
    RadioStateChanged { ready: bool },
    Shutdown,
}

pub struct Orchestrator {
    api: Arc<dyn AnchorApi>,
    radio: Box<dyn RadioScanner>,
    config: OrchestratorConfig,
    anchor_id: AnchorId,
    phase: Phase,
    active: Option<ActiveJob>,
    debug_scan: Option<DebugScan>,
    nearby: GenericObservationSet,
    /// Set after a job was dropped for lack of radio; cleared by a ready notification.
    waiting_for_radio: bool,
    snapshot: watch::Sender<AnchorSnapshot>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("anchor_id", &self.anchor_id)
            .field("phase", &self.phase)
            .field(
                "scan_id",
                &self.active.as_ref().map(|a| a.job.scan_id.as_str()),
            )
            .field("waiting_for_radio", &self.waiting_for_radio)
            .finish()
    }
}

impl Orchestrator {
    pub fn new(
        api: Arc<dyn AnchorApi>,
        radio: Box<dyn RadioScanner>,
        anchor_id: AnchorId,
        config: OrchestratorConfig,
    ) -> Self {
        let (snapshot, _) = watch::channel(AnchorSnapshot {
            anchor_id: anchor_id.to_string(),
            radio_ready: radio.is_ready(),
            status: "Waiting for jobs".to_string(),
            ..Default::default()
        });
        Self {
            api,
            radio,
            config,
            anchor_id,
            phase: Phase::Idle,
            active: None,
            debug_scan: None,
            nearby: GenericObservationSet::default(),
            waiting_for_radio: false,
            snapshot,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AnchorSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn anchor_id(&self) -> &AnchorId {
        &self.anchor_id
    }

    /// Matched tags of the running job, strongest first.
    pub fn matched(&self) -> &[MatchedTag] {
        self.active
            .as_ref()
            .map(|active| active.merger.matched())
            .unwrap_or(&[])
    }

    pub fn scan_deadline(&self) -> Option<Instant> {
        self.active.as_ref().map(ActiveJob::deadline)
    }

    fn can_poll(&self) -> bool {
        self.phase.is_idle() && !self.waiting_for_radio
    }

    /// Drives the anchor until a shutdown command arrives or the command
    /// channel closes.
    pub async fn run(
        mut self,
        mut observations: mpsc::Receiver<RadioObservation>,
        mut commands: mpsc::Receiver<ControlCommand>,
    ) {
        let mut poll_ticker = time::interval(self.config.poll_interval());
        poll_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut progress_ticker = time::interval(self.config.progress_interval());
        progress_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(anchor_id = %self.anchor_id, "orchestrator started");

        loop {
            let scan_deadline = self.scan_deadline();
            let debug_deadline = self.debug_scan.as_ref().map(|d| d.deadline);
            let scanning = self.phase == Phase::Scanning;

            tokio::select! {
                _ = poll_ticker.tick(), if self.can_poll() => {
                    discard_stale(&mut observations);
                    match self.poll().await {
                        PollOutcome::Job(JobStart::Scanning { .. }) => {
                            progress_ticker.reset();
                        }
                        PollOutcome::Job(JobStart::Expired) => {
                            poll_ticker.reset_immediately();
                        }
                        _ => {}
                    }
                }
                Some(observation) = observations.recv() => {
                    let was_scanning = self.phase == Phase::Scanning;
                    self.handle_observation(observation).await;
                    if was_scanning && self.phase.is_idle() {
                        discard_stale(&mut observations);
                        poll_ticker.reset();
                    }
                }
                _ = sleep_until_opt(scan_deadline) => {
                    if self.finish_scan(FinishTrigger::Deadline).await {
                        discard_stale(&mut observations);
                        poll_ticker.reset();
                    }
                }
                _ = sleep_until_opt(debug_deadline) => {
                    self.finish_debug_scan().await;
                    discard_stale(&mut observations);
                }
                _ = progress_ticker.tick(), if scanning => {
                    self.publish_progress();
                }
                command = commands.recv() => match command {
                    Some(ControlCommand::StartDebugScan) => {
                        if self.phase.is_idle() {
                            discard_stale(&mut observations);
                        }
                        self.start_debug_scan().await;
                    }
                    Some(ControlCommand::RadioStateChanged { ready }) => {
                        if self.radio_state_changed(ready).await {
                            poll_ticker.reset_immediately();
                        }
                    }
                    Some(ControlCommand::Shutdown) | None => {
                        self.shutdown().await;
                        break;
                    }
                },
            }
        }

        info!(anchor_id = %self.anchor_id, "orchestrator stopped");
    }

    /// One `Idle -> JobReceived` attempt.
    pub async fn poll(&mut self) -> PollOutcome {
        if !self.can_poll() {
            return PollOutcome::Skipped;
        }

        match self.api.poll_jobs(&self.anchor_id).await {
            Ok(jobs) => match jobs.into_iter().next() {
                Some(job) => PollOutcome::Job(self.accept_job(job).await),
                None => {
                    trace!("no job pending");
                    PollOutcome::NoWork
                }
            },
            Err(err) => {
                warn!(error = %err, "job poll failed; retrying next cycle");
                self.set_status(format!("Poll failed: {err}"));
                PollOutcome::Failed
            }
        }
    }

    /// Runs `JobReceived -> FetchingRoster -> Scanning`, or aborts back to idle.
    ///
    /// Refused with [`JobStart::Busy`] unless the anchor is idle.
    pub async fn accept_job(&mut self, job: ScanJob) -> JobStart {
        if !self.phase.is_idle() {
            warn!(
                scan_id = %job.scan_id,
                phase = %self.phase,
                active = ?self.active.as_ref().map(|a| a.job.scan_id.as_str()),
                "job refused; anchor is busy"
            );
            return JobStart::Busy;
        }
        info!(
            scan_id = %job.scan_id,
            event_id = %job.event_id,
            duration = %job.duration,
            timeout = ?job.timeout,
            "job received"
        );
        self.enter(Phase::JobReceived, format!("Job {} received", job.scan_id));

        let effective = self.config.deadline.for_job(&job);
        if effective <= 0.0 {
            info!(scan_id = %job.scan_id, "job expired before scanning; dropping");
            self.return_to_idle(format!("Job {} expired", job.scan_id));
            return JobStart::Expired;
        }

        self.enter(Phase::FetchingRoster, "Fetching tag roster".to_string());
        let records = match self.api.fetch_roster(&job.event_id).await {
            Ok(records) => records,
            Err(err) => {
                warn!(scan_id = %job.scan_id, error = %err, "roster fetch failed; dropping job");
                self.return_to_idle(format!("Roster fetch failed: {err}"));
                return JobStart::RosterFailed;
            }
        };
        let roster = TagRoster::build(records);
        if roster.is_empty() {
            warn!(scan_id = %job.scan_id, "roster is empty; scanning until the deadline");
        }

        if !self.radio.is_ready() {
            return self.abort_for_radio(&job.scan_id, "radio not ready".to_string());
        }
        if let Err(err) = self.radio.start(self.config.allow_duplicates).await {
            return self.abort_for_radio(&job.scan_id, err.to_string());
        }

        let total = as_duration(effective);
        let roster_size = roster.len();
        info!(
            scan_id = %job.scan_id,
            roster = roster_size,
            seconds = effective,
            min_rssi = job.min_rssi_or_default(),
            "scan started"
        );
        let scan_id = job.scan_id.clone();
        self.active = Some(ActiveJob {
            min_rssi: job.min_rssi_or_default(),
            job,
            roster,
            merger: ObservationMerger::new(),
            started_at: Instant::now(),
            total,
        });

        self.enter(
            Phase::Scanning,
            format!("Scanning for {roster_size} tags ({effective:.0}s)"),
        );
        self.snapshot.send_modify(|s| {
            s.scan_id = Some(scan_id);
            s.roster_size = roster_size;
            s.matched.clear();
            s.progress = Some(ScanProgress {
                elapsed_secs: 0.0,
                total_secs: total.as_secs_f64(),
            });
        });

        JobStart::Scanning { duration: total }
    }

    fn abort_for_radio(&mut self, scan_id: &str, reason: String) -> JobStart {
        warn!(scan_id, %reason, "radio unavailable; dropping job until the radio is ready");
        self.waiting_for_radio = true;
        self.return_to_idle(format!("Radio unavailable: {reason}"));
        JobStart::RadioUnavailable
    }

    /// Decode, filter, merge and check for completion, in that order.
    pub async fn handle_observation(&mut self, observation: RadioObservation) {
        match self.phase {
            Phase::Scanning => self.match_observation(observation).await,
            Phase::DebugScanning => {
                self.nearby
                    .record(&observation, &self.config.namespace, Utc::now());
                let nearby = self.nearby.snapshot();
                self.snapshot.send_modify(|s| s.nearby = nearby);
            }
            _ => trace!(device = %observation.device_id, "observation outside a scan; ignored"),
        }
    }

    async fn match_observation(&mut self, observation: RadioObservation) {
        let Some(active) = self.active.as_mut() else {
            return;
        };

        let Some(instance) = decode_instance(
            observation.service_data.as_deref(),
            &self.config.namespace,
        ) else {
            if tracing::enabled!(Level::TRACE) {
                trace!(
                    device = %observation.device_id,
                    rssi = observation.rssi,
                    frame = %describe(&observation, &self.config.namespace),
                    "advertisement carries no tag identity"
                );
            }
            return;
        };

        if observation.rssi < active.min_rssi {
            debug!(
                instance = %instance,
                rssi = observation.rssi,
                min_rssi = active.min_rssi,
                "reading below job threshold; discarded"
            );
            return;
        }

        let outcome = active.merger.observe(
            &active.roster,
            &instance,
            observation.rssi,
            Utc::now(),
        );
        match outcome {
            MergeOutcome::Unmatched => {
                trace!(instance = %instance, "instance not on roster");
                return;
            }
            MergeOutcome::Kept => return,
            MergeOutcome::New { .. } => info!(
                scan_id = %active.job.scan_id,
                instance = %instance,
                rssi = observation.rssi,
                matched = active.merger.len(),
                roster = active.roster.len(),
                "tag matched"
            ),
            MergeOutcome::Improved => debug!(
                instance = %instance,
                rssi = observation.rssi,
                "stronger reading recorded"
            ),
        }

        let matched = active.merger.matched().to_vec();
        let roster_size = active.roster.len();
        self.snapshot.send_modify(|s| {
            s.status = format!("Found {}/{} tags", matched.len(), roster_size);
            s.matched = matched;
        });

        if let MergeOutcome::New { complete: true } = outcome {
            info!("every roster tag seen; ending scan early");
            self.finish_scan(FinishTrigger::AllTagsSeen).await;
        }
    }

    /// The guarded `Scanning -> Uploading -> Idle` transition.
    ///
    /// Returns false when the scan had already finished.
    pub async fn finish_scan(&mut self, trigger: FinishTrigger) -> bool {
        if self.phase != Phase::Scanning {
            debug!(?trigger, phase = %self.phase, "scan already finishing; trigger ignored");
            return false;
        }
        self.enter(Phase::Uploading, "Uploading results".to_string());

        if let Err(err) = self.radio.stop().await {
            warn!(error = %err, "failed to stop radio scan");
        }

        let Some(mut active) = self.active.take() else {
            self.return_to_idle("Scan ended without a job".to_string());
            return true;
        };
        let matched = active.merger.take();
        info!(
            scan_id = %active.job.scan_id,
            ?trigger,
            matched = matched.len(),
            roster = active.roster.len(),
            elapsed_secs = active.started_at.elapsed().as_secs_f64(),
            "scan finished"
        );

        let status = self.report(&active.job, &matched).await;
        self.return_to_idle(status);
        true
    }

    /// Best-effort upload. Never retried; the outcome only shapes the status line.
    async fn report(&self, job: &ScanJob, matched: &[MatchedTag]) -> String {
        let entries: Vec<ScanDataEntry> = matched
            .iter()
            .map(|tag| ScanDataEntry::from_match(&job.scan_id, &job.anchor_db_id, tag))
            .collect();

        let status = if entries.is_empty() {
            info!(scan_id = %job.scan_id, "no roster tags heard; nothing to upload");
            format!("Scan {} finished: no tags found", job.scan_id)
        } else {
            match self.api.upload_scan_data(&entries).await {
                Ok(body) => {
                    info!(scan_id = %job.scan_id, entries = entries.len(), response = %body, "scan data uploaded");
                    format!("Uploaded {} tags for scan {}", entries.len(), job.scan_id)
                }
                Err(err) => {
                    warn!(scan_id = %job.scan_id, error = %err, "scan data upload failed; results dropped");
                    format!("Upload failed: {err}")
                }
            }
        };

        let link = RelationshipUpdate::parent_link(&job.anchor_db_id, &job.scan_id);
        match self.api.update_relationship(&link).await {
            Ok(body) => debug!(scan_id = %job.scan_id, response = %body, "relationship updated"),
            Err(err) => warn!(scan_id = %job.scan_id, error = %err, "relationship update failed"),
        }

        status
    }

    /// Starts the operator scan if neither a job nor another debug scan owns
    /// the radio.
    pub async fn start_debug_scan(&mut self) -> bool {
        if !self.phase.is_idle() {
            warn!(phase = %self.phase, "debug scan refused while busy");
            self.set_status(format!("Debug scan unavailable while {}", self.phase));
            return false;
        }
        if !self.radio.is_ready() {
            self.set_status("Debug scan unavailable: radio not ready".to_string());
            return false;
        }
        if let Err(err) = self.radio.start(true).await {
            warn!(error = %err, "failed to start debug scan");
            self.set_status(format!("Debug scan failed: {err}"));
            return false;
        }

        let length = self.config.debug_scan_duration();
        self.nearby.clear();
        self.debug_scan = Some(DebugScan {
            deadline: Instant::now() + length,
        });
        info!(seconds = length.as_secs(), "debug scan started");
        self.enter(
            Phase::DebugScanning,
            format!("Debug scan ({}s)", length.as_secs()),
        );
        self.snapshot.send_modify(|s| s.nearby.clear());
        true
    }

    pub async fn finish_debug_scan(&mut self) {
        if self.phase != Phase::DebugScanning {
            return;
        }
        if let Err(err) = self.radio.stop().await {
            warn!(error = %err, "failed to stop debug scan");
        }
        self.debug_scan = None;
        info!(devices = self.nearby.len(), "debug scan finished");
        self.return_to_idle(format!(
            "Debug scan finished: {} devices",
            self.nearby.len()
        ));
    }

    /// Returns true when polling should resume right away.
    pub async fn radio_state_changed(&mut self, ready: bool) -> bool {
        self.snapshot.send_modify(|s| s.radio_ready = ready);

        if ready {
            if self.waiting_for_radio {
                info!("radio ready; resuming job polling");
                self.waiting_for_radio = false;
                self.set_status("Radio ready; waiting for jobs".to_string());
                return true;
            }
            return false;
        }

        match self.phase {
            Phase::Scanning => {
                let scan_id = self
                    .active
                    .take()
                    .map(|active| active.job.scan_id)
                    .unwrap_or_default();
                warn!(scan_id = %scan_id, "radio lost during scan; job dropped");
                self.waiting_for_radio = true;
                self.return_to_idle("Radio unavailable: scan aborted".to_string());
            }
            Phase::DebugScanning => {
                self.debug_scan = None;
                self.return_to_idle("Radio unavailable: debug scan aborted".to_string());
            }
            _ => {
                self.waiting_for_radio = true;
                self.set_status("Radio unavailable".to_string());
            }
        }
        false
    }

    async fn shutdown(&mut self) {
        if matches!(self.phase, Phase::Scanning | Phase::DebugScanning) {
            if let Err(err) = self.radio.stop().await {
                warn!(error = %err, "failed to stop radio during shutdown");
            }
            if let Some(active) = self.active.take() {
                warn!(scan_id = %active.job.scan_id, "shutting down mid-scan; results discarded");
            }
            self.debug_scan = None;
        }
        self.return_to_idle("Stopped".to_string());
    }

    fn publish_progress(&self) {
        let Some(active) = self.active.as_ref() else {
            return;
        };
        let progress = ScanProgress {
            elapsed_secs: active
                .started_at
                .elapsed()
                .min(active.total)
                .as_secs_f64(),
            total_secs: active.total.as_secs_f64(),
        };
        self.snapshot.send_modify(|s| s.progress = Some(progress));
    }

    fn enter(&mut self, phase: Phase, status: String) {
        debug!(from = %self.phase, to = %phase, "phase transition");
        self.phase = phase;
        self.snapshot.send_modify(|s| {
            s.phase = phase;
            s.status = status;
        });
    }

    fn set_status(&self, status: String) {
        self.snapshot.send_modify(|s| s.status = status);
    }

    fn return_to_idle(&mut self, status: String) {
        self.active = None;
        self.enter(Phase::Idle, status);
        self.snapshot.send_modify(|s| {
            s.scan_id = None;
            s.progress = None;
            s.roster_size = 0;
            s.matched.clear();
        });
    }
}

/// Drops readings queued before the radio was last stopped so they cannot
/// leak into the next scan.
fn discard_stale(observations: &mut mpsc::Receiver<RadioObservation>) -> usize {
    let mut dropped = 0;
    while observations.try_recv().is_ok() {
        dropped += 1;
    }
    if dropped > 0 {
        debug!(dropped, "discarded readings from a finished scan");
    }
    dropped
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beacon::{Namespace, UidFrame};
    use crate::error::{AnchorError, Result};
    use anchorscan_model::TagRecord;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug, Default)]
    struct StubApi {
        roster: Vec<TagRecord>,
        roster_fails: bool,
        uploads: Mutex<Vec<Vec<ScanDataEntry>>>,
        roster_calls: Mutex<u32>,
    }

    #[async_trait]
    impl AnchorApi for StubApi {
        async fn poll_jobs(&self, _anchor_id: &AnchorId) -> Result<Vec<ScanJob>> {
            Ok(Vec::new())
        }

        async fn fetch_roster(&self, _event_id: &str) -> Result<Vec<TagRecord>> {
            *self.roster_calls.lock().unwrap() += 1;
            if self.roster_fails {
                return Err(AnchorError::Network("connection refused".into()));
            }
            Ok(self.roster.clone())
        }

        async fn upload_scan_data(&self, entries: &[ScanDataEntry]) -> Result<String> {
            self.uploads.lock().unwrap().push(entries.to_vec());
            Ok("ok".into())
        }

        async fn update_relationship(&self, _update: &RelationshipUpdate) -> Result<String> {
            Ok("ok".into())
        }
    }

    #[derive(Debug)]
    struct StubRadio {
        ready: bool,
        scanning: Arc<AtomicBool>,
    }

    #[async_trait]
    impl RadioScanner for StubRadio {
        fn is_ready(&self) -> bool {
            self.ready
        }

        async fn start(&mut self, _allow_duplicates: bool) -> Result<()> {
            self.scanning.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&mut self) -> Result<()> {
            self.scanning.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    fn job() -> ScanJob {
        ScanJob {
            scan_id: "s-1".into(),
            anchor_db_id: "a-9".into(),
            duration: "30".into(),
            timeout: None,
            min_rssi: Some(-90),
            created_at: "2024-05-01 10:00:00".into(),
            event_id: "ev".into(),
            server_now: "2024-05-01 10:00:00".into(),
        }
    }

    fn tag(id: &str, instance: [u8; 6]) -> TagRecord {
        TagRecord {
            tag_id: id.into(),
            uuid: format!("{}{}", Namespace::DEFAULT.to_hex(), hex::encode(instance)),
            db_id: format!("db-{id}"),
        }
    }

    fn sighting(instance: [u8; 6], rssi: i32) -> RadioObservation {
        RadioObservation {
            device_id: hex::encode(instance),
            service_data: Some(
                UidFrame {
                    tx_power: -20,
                    namespace: Namespace::DEFAULT,
                    instance,
                }
                .to_bytes(),
            ),
            rssi,
            ..Default::default()
        }
    }

    fn orchestrator(api: Arc<StubApi>, ready: bool) -> (Orchestrator, Arc<AtomicBool>) {
        let scanning = Arc::new(AtomicBool::new(false));
        let radio = StubRadio {
            ready,
            scanning: scanning.clone(),
        };
        let orchestrator = Orchestrator::new(
            api,
            Box::new(radio),
            AnchorId::parse("0123456789ab").unwrap(),
            OrchestratorConfig::default(),
        );
        (orchestrator, scanning)
    }

    #[tokio::test]
    async fn completion_then_deadline_uploads_once() {
        let a = [0, 0, 0, 0, 0, 1];
        let b = [0, 0, 0, 0, 0, 2];
        let api = Arc::new(StubApi {
            roster: vec![tag("A", a), tag("B", b)],
            ..Default::default()
        });
        let (mut orchestrator, scanning) = orchestrator(api.clone(), true);

        assert!(matches!(
            orchestrator.accept_job(job()).await,
            JobStart::Scanning { .. }
        ));
        assert!(scanning.load(Ordering::SeqCst));

        orchestrator.handle_observation(sighting(a, -70)).await;
        assert_eq!(orchestrator.phase(), Phase::Scanning);
        orchestrator.handle_observation(sighting(b, -60)).await;
        assert_eq!(orchestrator.phase(), Phase::Idle);
        assert!(!scanning.load(Ordering::SeqCst));

        assert!(!orchestrator.finish_scan(FinishTrigger::Deadline).await);
        assert_eq!(api.uploads.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn roster_failure_returns_to_idle_without_scanning() {
        let api = Arc::new(StubApi {
            roster_fails: true,
            ..Default::default()
        });
        let (mut orchestrator, scanning) = orchestrator(api.clone(), true);
        assert_eq!(orchestrator.accept_job(job()).await, JobStart::RosterFailed);
        assert_eq!(orchestrator.phase(), Phase::Idle);
        assert!(!scanning.load(Ordering::SeqCst));
        assert!(api.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn radio_not_ready_suspends_polling_until_ready() {
        let api = Arc::new(StubApi {
            roster: vec![tag("A", [1; 6])],
            ..Default::default()
        });
        let (mut orchestrator, _) = orchestrator(api, false);
        assert_eq!(orchestrator.accept_job(job()).await, JobStart::RadioUnavailable);
        assert_eq!(orchestrator.poll().await, PollOutcome::Skipped);

        assert!(orchestrator.radio_state_changed(true).await);
        assert_eq!(orchestrator.poll().await, PollOutcome::NoWork);
    }

    #[tokio::test]
    async fn debug_scan_is_refused_during_a_job() {
        let api = Arc::new(StubApi {
            roster: vec![tag("A", [1; 6])],
            ..Default::default()
        });
        let (mut orchestrator, _) = orchestrator(api, true);
        orchestrator.accept_job(job()).await;
        assert!(!orchestrator.start_debug_scan().await);
        assert_eq!(orchestrator.phase(), Phase::Scanning);
    }

    #[tokio::test]
    async fn debug_scan_records_devices_and_blocks_polling() {
        let api = Arc::new(StubApi::default());
        let (mut orchestrator, scanning) = orchestrator(api, true);
        let status = orchestrator.subscribe();

        assert!(orchestrator.start_debug_scan().await);
        assert_eq!(orchestrator.poll().await, PollOutcome::Skipped);
        orchestrator.handle_observation(sighting([7; 6], -40)).await;
        assert_eq!(status.borrow().nearby.len(), 1);
        assert_eq!(orchestrator.accept_job(job()).await, JobStart::Busy);
        assert_eq!(orchestrator.phase(), Phase::DebugScanning);

        orchestrator.finish_debug_scan().await;
        assert_eq!(orchestrator.phase(), Phase::Idle);
        assert!(!scanning.load(Ordering::SeqCst));
        assert_eq!(status.borrow().nearby.len(), 1);
    }

    #[tokio::test]
    async fn second_job_is_refused_while_scanning() {
        let a = [0, 0, 0, 0, 0, 1];
        let b = [0, 0, 0, 0, 0, 2];
        let api = Arc::new(StubApi {
            roster: vec![tag("A", a), tag("B", b)],
            ..Default::default()
        });
        let (mut orchestrator, _) = orchestrator(api.clone(), true);
        orchestrator.accept_job(job()).await;
        orchestrator.handle_observation(sighting(a, -70)).await;

        let intruder = ScanJob {
            scan_id: "s-2".into(),
            ..job()
        };
        assert_eq!(orchestrator.accept_job(intruder).await, JobStart::Busy);
        assert_eq!(orchestrator.phase(), Phase::Scanning);
        assert_eq!(orchestrator.matched().len(), 1);
        assert_eq!(*api.roster_calls.lock().unwrap(), 1);

        assert!(orchestrator.finish_scan(FinishTrigger::Deadline).await);
        let uploads = api.uploads.lock().unwrap().clone();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0][0].scan_id, "s-1");
    }

    #[tokio::test]
    async fn oversized_job_gets_a_bounded_deadline() {
        let api = Arc::new(StubApi {
            roster: vec![tag("A", [1; 6])],
            ..Default::default()
        });
        let (mut orchestrator, _) = orchestrator(api, true);
        let huge = ScanJob {
            duration: "1e19".into(),
            timeout: Some("1e19".into()),
            ..job()
        };
        let day = std::time::Duration::from_secs(crate::deadline::MAX_SCAN_SECS);
        assert_eq!(
            orchestrator.accept_job(huge).await,
            JobStart::Scanning { duration: day }
        );
        let deadline = orchestrator.scan_deadline().unwrap();
        assert!(deadline <= Instant::now() + day);
        assert!(deadline > Instant::now());
    }

    #[tokio::test]
    async fn stale_readings_are_discarded() {
        let (tx, mut rx) = mpsc::channel(8);
        for rssi in [-40, -50, -60] {
            tx.try_send(sighting([3; 6], rssi)).unwrap();
        }
        assert_eq!(discard_stale(&mut rx), 3);
        assert!(rx.try_recv().is_err());
        assert_eq!(discard_stale(&mut rx), 0);
    }
}
