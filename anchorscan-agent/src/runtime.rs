use std::sync::Arc;

use anchorscan_config::Config;
use anchorscan_core::orchestrator::{ControlCommand, Orchestrator};
use anchorscan_core::ports::RadioScanner;
use anyhow::Context;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::commands::ensure_identity;
use crate::infra::api_client::HttpAnchorApi;
use crate::infra::operator::read_operator_commands;
use crate::infra::radio_bridge::{BridgeSinks, DisabledRadio, RadioBridge};
use crate::infra::status_log::follow_status;

const OBSERVATION_BUFFER: usize = 1024;
const COMMAND_BUFFER: usize = 32;

/// Runs the anchor until `quit`, Ctrl-C or the radio and operator inputs
/// both go away.
pub async fn run_agent(config: Config) -> anyhow::Result<()> {
    let anchor_id = ensure_identity(&config.identity_path)?;
    info!(anchor_id = %anchor_id, path = %config.identity_path.display(), "anchor identity");

    let api = HttpAnchorApi::new(&config.api).context("failed to build API client")?;
    info!(base_url = %api.base_url(), "API client ready");

    let (observation_tx, observation_rx) = mpsc::channel(OBSERVATION_BUFFER);
    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);

    let radio: Box<dyn RadioScanner> = if config.radio.is_configured() {
        Box::new(RadioBridge::spawn(
            &config.radio,
            BridgeSinks {
                observations: observation_tx,
                commands: command_tx.clone(),
            },
        )?)
    } else {
        warn!("no radio bridge configured; scans will be refused");
        Box::new(DisabledRadio)
    };

    let orchestrator = Orchestrator::new(
        Arc::new(api),
        radio,
        anchor_id,
        config.orchestrator.clone(),
    );
    let status = orchestrator.subscribe();

    tokio::spawn(follow_status(status.clone()));
    tokio::spawn(read_operator_commands(
        BufReader::new(tokio::io::stdin()),
        command_tx.clone(),
        status,
    ));

    let shutdown_tx = command_tx;
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received; shutting down");
                let _ = shutdown_tx.send(ControlCommand::Shutdown).await;
            }
            Err(err) => warn!(error = %err, "failed to listen for Ctrl-C"),
        }
    });

    orchestrator.run(observation_rx, command_rx).await;
    Ok(())
}
