//! Operator command channel: a line-oriented stdin protocol that toggles
//! auto-scroll while the engine runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Shared auto-scroll flag. Written by the command channel, read by the
/// driver between ticks and candidates.
#[derive(Debug, Clone, Default)]
pub struct ScrollSwitch(Arc<AtomicBool>);

impl ScrollSwitch {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::SeqCst);
    }

    /// Flip the flag and return the new value.
    pub fn toggle(&self) -> bool {
        !self.0.fetch_xor(true, Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    ToggleAutoScroll,
}

pub fn parse_command(line: &str) -> Option<OperatorCommand> {
    match line.trim() {
        "s" => Some(OperatorCommand::ToggleAutoScroll),
        _ => None,
    }
}

/// Consume lines until EOF, applying every recognised command.
pub async fn run_command_channel<R>(reader: R, switch: ScrollSwitch)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match parse_command(&line) {
                Some(OperatorCommand::ToggleAutoScroll) => {
                    let enabled = switch.toggle();
                    info!(
                        "[⚙] auto-scroll {}",
                        if enabled { "ENABLED" } else { "PAUSED" }
                    );
                }
                None => debug!("command channel: ignored {:?}", line.trim()),
            },
            Ok(None) => {
                debug!("command channel: input closed");
                break;
            }
            Err(e) => {
                warn!("command channel: read failed: {}", e);
                break;
            }
        }
    }
}

pub fn spawn_stdin_channel(switch: ScrollSwitch) -> JoinHandle<()> {
    tokio::spawn(async move {
        run_command_channel(BufReader::new(tokio::io::stdin()), switch).await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("s"), Some(OperatorCommand::ToggleAutoScroll));
        assert_eq!(parse_command("  s \r"), Some(OperatorCommand::ToggleAutoScroll));
        assert_eq!(parse_command("S"), None);
        assert_eq!(parse_command("stop"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn test_toggle_returns_new_state() {
        let switch = ScrollSwitch::new(false);
        assert!(switch.toggle());
        assert!(switch.is_enabled());
        assert!(!switch.toggle());
        assert!(!switch.is_enabled());
    }

    #[tokio::test]
    async fn test_channel_toggles_and_ends_on_eof() {
        let switch = ScrollSwitch::new(false);
        let input: &[u8] = b"s\nhello\n s \ns\n";
        run_command_channel(input, switch.clone()).await;
        // Three toggles from off.
        assert!(switch.is_enabled());
    }
}
