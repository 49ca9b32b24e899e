//! Radio access through an external helper process.
//!
//! The helper owns the Bluetooth adapter and speaks line-delimited JSON.
//! It receives `{"command":"start","allow_duplicates":true}` and
//! `{"command":"stop"}` on stdin, and emits one event per line on stdout:
//!
//! ```text
//! {"event":"state","ready":true}
//! {"event":"observation","device_id":"C4:7C:8D:6A:11:02","name":null,
//!  "service_data":"00eb…","manufacturer_data":null,"rssi":-67}
//! {"event":"error","message":"adapter reset"}
//! ```
//!
//! Byte payloads are hex strings. Stderr is forwarded to the log.

use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anchorscan_config::RadioConfig;
use anchorscan_core::orchestrator::ControlCommand;
use anchorscan_core::ports::RadioScanner;
use anchorscan_core::{AnchorError, Result};
use anchorscan_model::RadioObservation;
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Where bridge events are delivered.
#[derive(Debug, Clone)]
pub struct BridgeSinks {
    pub observations: mpsc::Sender<RadioObservation>,
    pub commands: mpsc::Sender<ControlCommand>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BridgeEvent {
    State { ready: bool },
    Observation(WireObservation),
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WireObservation {
    pub device_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "hex_bytes")]
    pub service_data: Option<Vec<u8>>,
    #[serde(default, deserialize_with = "hex_bytes")]
    pub manufacturer_data: Option<Vec<u8>>,
    pub rssi: i32,
}

impl From<WireObservation> for RadioObservation {
    fn from(wire: WireObservation) -> Self {
        RadioObservation {
            device_id: wire.device_id,
            name: wire.name,
            service_data: wire.service_data,
            manufacturer_data: wire.manufacturer_data,
            rssi: wire.rssi,
        }
    }
}

fn hex_bytes<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<u8>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(hex_str) => hex::decode(hex_str)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
enum BridgeCommand {
    Start { allow_duplicates: bool },
    Stop,
}

pub fn parse_event(line: &str) -> serde_json::Result<BridgeEvent> {
    serde_json::from_str(line)
}

pub struct RadioBridge {
    writer: Box<dyn AsyncWrite + Send + Unpin>,
    ready: Arc<AtomicBool>,
    reader: JoinHandle<()>,
    child: Option<Child>,
}

impl std::fmt::Debug for RadioBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadioBridge")
            .field("ready", &self.ready.load(Ordering::SeqCst))
            .field("pid", &self.child.as_ref().and_then(Child::id))
            .finish()
    }
}

impl RadioBridge {
    /// Launches the helper process and starts pumping its events.
    pub fn spawn(config: &RadioConfig, sinks: BridgeSinks) -> anyhow::Result<Self> {
        let program = config
            .program
            .as_deref()
            .ok_or_else(|| anyhow!("no radio bridge command configured"))?;

        let mut child = Command::new(program)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn radio bridge '{program}'"))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("radio bridge stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("radio bridge stdout unavailable"))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "radio_bridge", "{line}");
                }
            });
        }

        info!(program, pid = ?child.id(), "radio bridge started");
        let mut bridge = Self::from_io(stdout, stdin, sinks);
        bridge.child = Some(child);
        Ok(bridge)
    }

    /// Bridge over arbitrary streams; used by [`RadioBridge::spawn`] and tests.
    pub fn from_io<R, W>(reader: R, writer: W, sinks: BridgeSinks) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let ready = Arc::new(AtomicBool::new(false));
        let reader = tokio::spawn(pump_events(reader, ready.clone(), sinks));
        Self {
            writer: Box::new(writer),
            ready,
            reader,
            child: None,
        }
    }

    async fn send(&mut self, command: BridgeCommand) -> Result<()> {
        let mut line = serde_json::to_string(&command)?;
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|err| AnchorError::Radio(format!("bridge write failed: {err}")))?;
        self.writer
            .flush()
            .await
            .map_err(|err| AnchorError::Radio(format!("bridge flush failed: {err}")))
    }
}

impl Drop for RadioBridge {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[async_trait]
impl RadioScanner for RadioBridge {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn start(&mut self, allow_duplicates: bool) -> Result<()> {
        if !self.is_ready() {
            return Err(AnchorError::RadioUnavailable);
        }
        self.send(BridgeCommand::Start { allow_duplicates }).await
    }

    async fn stop(&mut self) -> Result<()> {
        self.send(BridgeCommand::Stop).await
    }
}

async fn pump_events<R>(reader: R, ready: Arc<AtomicBool>, sinks: BridgeSinks)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                warn!(error = %err, "radio bridge read failed");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_event(line) {
            Ok(BridgeEvent::State { ready: now_ready }) => {
                let was_ready = ready.swap(now_ready, Ordering::SeqCst);
                if was_ready != now_ready {
                    info!(ready = now_ready, "radio state changed");
                    if sinks
                        .commands
                        .send(ControlCommand::RadioStateChanged { ready: now_ready })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            }
            Ok(BridgeEvent::Observation(wire)) => {
                trace!(device = %wire.device_id, rssi = wire.rssi, "advertisement");
                if sinks.observations.send(wire.into()).await.is_err() {
                    break;
                }
            }
            Ok(BridgeEvent::Error { message }) => {
                warn!(%message, "radio bridge reported an error");
            }
            Err(err) => warn!(error = %err, line, "unparseable radio bridge line"),
        }
    }

    if ready.swap(false, Ordering::SeqCst) {
        let _ = sinks
            .commands
            .send(ControlCommand::RadioStateChanged { ready: false })
            .await;
    }
    warn!("radio bridge output closed");
}

/// Stand-in when no bridge is configured. Never ready.
#[derive(Debug, Default)]
pub struct DisabledRadio;

#[async_trait]
impl RadioScanner for DisabledRadio {
    fn is_ready(&self) -> bool {
        false
    }

    async fn start(&mut self, _allow_duplicates: bool) -> Result<()> {
        Err(AnchorError::RadioUnavailable)
    }

    async fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}
