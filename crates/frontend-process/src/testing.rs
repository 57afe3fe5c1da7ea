//! A frontend that records what it sees, used by the `frontend-recorder` binary
//! and the integration tests.

use async_trait::async_trait;
use frontend_process_core::{Frontend, FrontendStdin};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecorderArgs {
    /// File that receives one line per event
    pub output: PathBuf,
    /// A packet equal to this makes the hook fail
    #[serde(default)]
    pub fail_on: Option<String>,
    /// Drain standard input during termination
    #[serde(default)]
    pub read_stdin: bool,
}

impl RecorderArgs {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            fail_on: None,
            read_stdin: false,
        }
    }
}

/// Writes `packet:<p>` per packet, then `stdin:<line>` per input line when
/// asked to, then `terminated`.
pub struct RecordingFrontend {
    args: RecorderArgs,
    log: Option<File>,
}

impl RecordingFrontend {
    async fn record(&mut self, line: &str) -> anyhow::Result<()> {
        if self.log.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.args.output)
                .await?;
            self.log = Some(file);
        }
        if let Some(log) = self.log.as_mut() {
            log.write_all(format!("{line}\n").as_bytes()).await?;
            log.flush().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Frontend for RecordingFrontend {
    const DISPLAY_NAME: &'static str = "Recorder";
    type Args = RecorderArgs;
    type Packet = String;

    fn construct(args: RecorderArgs) -> anyhow::Result<Self> {
        Ok(Self { args, log: None })
    }

    async fn handle_incoming_packet(
        &mut self,
        packet: String,
        _stdin: &mut FrontendStdin,
    ) -> anyhow::Result<()> {
        if self.args.fail_on.as_deref() == Some(packet.as_str()) {
            anyhow::bail!("refusing to display packet {packet:?}");
        }
        self.record(&format!("packet:{packet}")).await
    }

    async fn handle_termination(&mut self, stdin: &mut FrontendStdin) -> anyhow::Result<()> {
        if self.args.read_stdin {
            while let Some(line) = stdin.read_line().await? {
                self.record(&format!("stdin:{line}")).await?;
            }
        }
        self.record("terminated").await
    }
}

/// Events recorded so far in `path`; empty when nothing was written
pub fn read_recording(path: &std::path::Path) -> std::io::Result<Vec<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text.lines().map(str::to_string).collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}
