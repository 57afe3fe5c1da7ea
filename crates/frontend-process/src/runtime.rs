use frontend_process_core::{
    Frontend, FrontendStdin, PacketReceiver, ReadError, RuntimeConfig, TerminationFlag,
};
use std::time::Duration;
use tracing::{debug, info};

/// Type-state marker for a runtime whose IPC is not set up yet
pub struct Uninitialized;

/// Type-state for a runtime connected to its packet channel
pub struct Ready<P> {
    receiver: PacketReceiver<P>,
    flag: TerminationFlag,
    stdin: FrontendStdin,
}

/// Lifecycle of a running frontend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    Running,
    Terminated,
}

/// Drives a [`Frontend`] inside the subordinate process.
///
/// IPC is set up exactly once, before [`FrontendRuntime::run`], which the
/// type-state enforces. The loop polls the packet channel in short bounded
/// waits so a termination request is noticed within one poll interval.
pub struct FrontendRuntime<F: Frontend, S = Uninitialized> {
    frontend: F,
    poll_interval: Duration,
    state: S,
}

impl<F: Frontend> FrontendRuntime<F, Uninitialized> {
    pub fn new(frontend: F) -> Self {
        Self::with_config(frontend, &RuntimeConfig::default())
    }

    pub fn with_config(frontend: F, config: &RuntimeConfig) -> Self {
        Self {
            frontend,
            poll_interval: config.poll_interval(),
            state: Uninitialized,
        }
    }

    /// Attach the packet channel, the termination flag and the input stream
    pub fn set_up_ipc(
        self,
        receiver: PacketReceiver<F::Packet>,
        flag: TerminationFlag,
        stdin: FrontendStdin,
    ) -> FrontendRuntime<F, Ready<F::Packet>> {
        FrontendRuntime {
            frontend: self.frontend,
            poll_interval: self.poll_interval,
            state: Ready {
                receiver,
                flag,
                stdin,
            },
        }
    }
}

impl<F: Frontend, S> FrontendRuntime<F, S> {
    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl<F: Frontend> FrontendRuntime<F, Ready<F::Packet>> {
    /// Remove one packet from the channel
    pub async fn read_packet(
        &mut self,
        blocking: bool,
        timeout: Option<Duration>,
    ) -> Result<F::Packet, ReadError> {
        self.state.receiver.read(blocking, timeout).await
    }

    /// Wait at most one poll interval for the next packet
    pub async fn fetch_packet_from_analyzer(&mut self) -> Option<F::Packet> {
        let interval = self.poll_interval;
        match self.read_packet(true, Some(interval)).await {
            Ok(packet) => Some(packet),
            Err(ReadError::Empty) => None,
            Err(ReadError::Disconnected) => {
                debug!("Packet channel disconnected");
                None
            }
        }
    }

    /// Dispatch every packet available right now, returning how many were handled
    pub async fn handle_communications(&mut self) -> anyhow::Result<usize> {
        let mut handled = 0;
        while let Some(packet) = self.fetch_packet_from_analyzer().await {
            self.frontend
                .handle_incoming_packet(packet, &mut self.state.stdin)
                .await?;
            handled += 1;
        }
        Ok(handled)
    }

    /// Process packets until termination is requested, then clean up once.
    ///
    /// Returns the frontend so its final state can be inspected.
    pub async fn run(mut self) -> anyhow::Result<F> {
        let mut state = RuntimeState::Running;
        info!("{} frontend running", F::DISPLAY_NAME);

        while state == RuntimeState::Running {
            if self.state.flag.is_set() {
                state = RuntimeState::Terminated;
                continue;
            }
            let handled = self.handle_communications().await?;
            if handled > 0 {
                debug!("Dispatched {} packets", handled);
            }
            self.frontend.handle_events(&mut self.state.stdin).await?;
        }

        info!("{} frontend terminating", F::DISPLAY_NAME);
        self.frontend
            .handle_termination(&mut self.state.stdin)
            .await?;
        Ok(self.frontend)
    }

    pub fn termination_flag(&self) -> &TerminationFlag {
        &self.state.flag
    }
}
