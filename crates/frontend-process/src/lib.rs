//! Run a display frontend in its own process.
//!
//! [`FrontendProcess`] spawns a subordinate process that hosts a [`Frontend`],
//! hands it standard input and feeds it packets through an unbounded queue.
//! The subordinate side is entered with [`run_subordinate_if_requested`] at the
//! top of `main`:
//!
//! ```rust,no_run
//! use frontend_process::testing::{RecorderArgs, RecordingFrontend};
//! use frontend_process::{FrontendProcess, run_subordinate_if_requested};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     if run_subordinate_if_requested::<RecordingFrontend>().await? {
//!         return Ok(());
//!     }
//!
//!     let mut display = FrontendProcess::<RecordingFrontend>::new(RecorderArgs::new("events.log"))?;
//!     display.start().await?;
//!     display.issue_packet("hello".to_string())?;
//!     display.stop().await?;
//!     Ok(())
//! }
//! ```

mod entry;
mod factory;
mod link;
mod runtime;
mod supervisor;
pub mod testing;

pub use entry::{SubordinateEntryPoint, run_subordinate_if_requested};
pub use factory::{PlatformLauncher, PlatformLauncherFactory};
pub use runtime::{FrontendRuntime, Ready, RuntimeState, Uninitialized};
pub use supervisor::FrontendProcess;

// Re-export core types for convenience
pub use frontend_process_core::*;
