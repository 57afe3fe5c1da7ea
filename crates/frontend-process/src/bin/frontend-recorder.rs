use frontend_process::testing::RecordingFrontend;
use frontend_process::{FrontendError, SubordinateEntryPoint};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Stdout belongs to the display.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    match SubordinateEntryPoint::<RecordingFrontend>::require_from_env() {
        Ok(entry) => {
            entry.run().await?;
            Ok(())
        }
        Err(FrontendError::NotSubordinate) => {
            eprintln!("frontend-recorder only runs as a subordinate of FrontendProcess");
            std::process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}
