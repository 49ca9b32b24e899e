use anchorscan_core::orchestrator::{AnchorSnapshot, ControlCommand};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use super::status_log::log_snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    Debug,
    Status,
    Quit,
}

pub fn parse_operator_command(line: &str) -> Option<OperatorCommand> {
    match line.trim().to_ascii_lowercase().as_str() {
        "debug" | "d" => Some(OperatorCommand::Debug),
        "status" | "s" => Some(OperatorCommand::Status),
        "quit" | "exit" | "q" => Some(OperatorCommand::Quit),
        _ => None,
    }
}

/// Reads operator commands line by line until `quit` or end of input.
pub async fn read_operator_commands<R>(
    reader: R,
    commands: mpsc::Sender<ControlCommand>,
    status: watch::Receiver<AnchorSnapshot>,
) where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        match parse_operator_command(&line) {
            Some(OperatorCommand::Debug) => {
                if commands.send(ControlCommand::StartDebugScan).await.is_err() {
                    break;
                }
            }
            Some(OperatorCommand::Status) => log_snapshot(&status.borrow()),
            Some(OperatorCommand::Quit) => {
                info!("quit requested");
                let _ = commands.send(ControlCommand::Shutdown).await;
                break;
            }
            None => warn!(input = %line.trim(), "unknown command; expected debug, status or quit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_are_case_insensitive_with_short_forms() {
        assert_eq!(parse_operator_command(" DEBUG "), Some(OperatorCommand::Debug));
        assert_eq!(parse_operator_command("s"), Some(OperatorCommand::Status));
        assert_eq!(parse_operator_command("exit"), Some(OperatorCommand::Quit));
        assert_eq!(parse_operator_command("scan"), None);
    }

    #[tokio::test]
    async fn quit_stops_reading_and_requests_shutdown() {
        let (tx, mut rx) = mpsc::channel(4);
        let (_status_tx, status_rx) = watch::channel(AnchorSnapshot::default());
        let input: &[u8] = b"debug\nbogus\nstatus\nquit\ndebug\n";

        read_operator_commands(input, tx, status_rx).await;

        assert_eq!(rx.recv().await, Some(ControlCommand::StartDebugScan));
        assert_eq!(rx.recv().await, Some(ControlCommand::Shutdown));
        assert_eq!(rx.recv().await, None);
    }
}
