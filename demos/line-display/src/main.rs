use async_trait::async_trait;
use frontend_process::{Frontend, FrontendProcess, FrontendStdin, run_subordinate_if_requested};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Reading {
    seq: u64,
    value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LineDisplayArgs {
    label: String,
    echo_stdin: bool,
}

/// Prints each reading on its own line
struct LineDisplay {
    label: String,
    echo_stdin: bool,
    shown: u64,
}

#[async_trait]
impl Frontend for LineDisplay {
    const DISPLAY_NAME: &'static str = "LineDisplay";
    type Args = LineDisplayArgs;
    type Packet = Reading;

    fn construct(args: LineDisplayArgs) -> anyhow::Result<Self> {
        Ok(Self {
            label: args.label,
            echo_stdin: args.echo_stdin,
            shown: 0,
        })
    }

    async fn handle_incoming_packet(
        &mut self,
        reading: Reading,
        _stdin: &mut FrontendStdin,
    ) -> anyhow::Result<()> {
        println!("[{}] #{:>3} {:>8.3}", self.label, reading.seq, reading.value);
        self.shown += 1;
        Ok(())
    }

    async fn handle_termination(&mut self, stdin: &mut FrontendStdin) -> anyhow::Result<()> {
        if self.echo_stdin {
            while let Some(line) = stdin.read_line().await? {
                println!("[{}] stdin: {}", self.label, line);
            }
        }
        println!("[{}] {} readings shown", self.label, self.shown);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if run_subordinate_if_requested::<LineDisplay>().await? {
        return Ok(());
    }

    let args = LineDisplayArgs {
        label: "sensor".to_string(),
        echo_stdin: std::env::args().any(|a| a == "--echo-stdin"),
    };
    let mut display = FrontendProcess::<LineDisplay>::new(args)?;
    display.start().await?;
    let pid = display.pid();
    info!("Display running as PID {:?}", pid);

    for seq in 0..10u64 {
        let value = (seq as f64 / 3.0).sin() * 100.0;
        display.issue_packet(Reading { seq, value })?;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    if let Some(exit) = display.stop().await? {
        info!("Display finished with {}", exit);
    }
    Ok(())
}
