use anchorscan_core::orchestrator::{AnchorSnapshot, Phase};
use tokio::sync::watch;
use tracing::info;

/// Logs every phase or status-line change until the orchestrator goes away.
pub async fn follow_status(mut status: watch::Receiver<AnchorSnapshot>) {
    let mut last: Option<(Phase, String)> = None;
    loop {
        let current = {
            let snapshot = status.borrow_and_update();
            (snapshot.phase, snapshot.status.clone())
        };
        if last.as_ref() != Some(&current) {
            info!(phase = %current.0, status = %current.1, "anchor status");
            last = Some(current);
        }
        if status.changed().await.is_err() {
            break;
        }
    }
}

/// Full dump for the operator `status` command.
pub fn log_snapshot(snapshot: &AnchorSnapshot) {
    info!(
        anchor_id = %snapshot.anchor_id,
        phase = %snapshot.phase,
        radio_ready = snapshot.radio_ready,
        scan_id = snapshot.scan_id.as_deref().unwrap_or("-"),
        status = %snapshot.status,
        "snapshot"
    );
    if let Some(progress) = snapshot.progress {
        info!(
            elapsed_secs = progress.elapsed_secs,
            total_secs = progress.total_secs,
            percent = (progress.fraction() * 100.0).round(),
            "scan progress"
        );
    }
    if snapshot.roster_size > 0 {
        info!(
            matched = snapshot.matched.len(),
            roster = snapshot.roster_size,
            "roster coverage"
        );
    }
    for tag in &snapshot.matched {
        info!(tag_id = %tag.tag_id, rssi = tag.rssi, last_seen = %tag.last_seen, "matched tag");
    }
    for device in &snapshot.nearby {
        info!(
            device = %device.device_id,
            name = %device.name,
            rssi = device.rssi,
            frame = %device.description,
            "nearby device"
        );
    }
}
