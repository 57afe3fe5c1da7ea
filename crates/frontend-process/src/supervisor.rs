use crate::factory::{PlatformLauncher, PlatformLauncherFactory};
use crate::link::SupervisorLink;
use frontend_process_core::{
    DuplicatedStdin, Frontend, FrontendError, IpcEndpoint, LaunchSpec, PacketReceiver,
    PacketSender, ProcessId, StdinState, SubordinateEnv, SubordinateExit, SubordinateHandle,
    SubordinateLauncher, SubordinateLauncherFactory, SupervisorConfig, TerminationFlag,
    encode_packet, packet_channel, process_name_for,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::bytes::Bytes;
use tracing::{debug, info, warn};

type PlatformHandle = <PlatformLauncher as SubordinateLauncher>::Handle;

/// Where each lifecycle's copy of standard input comes from
enum StdinSource {
    /// The owning process's own standard input
    Inherited,
    /// A handle supplied by the caller, kept so later lifecycles get the same stream
    Supplied(DuplicatedStdin),
}

/// A started subordinate and the task feeding it
struct Running {
    handle: PlatformHandle,
    link: SupervisorLink,
}

/// Owns one subordinate process hosting the frontend `F`.
///
/// Packets issued with [`FrontendProcess::issue_packet`] are queued without
/// bound and delivered to the frontend in order. Shutdown is cooperative:
/// [`FrontendProcess::stop`] raises the termination flag and waits for the
/// subordinate to exit on its own.
pub struct FrontendProcess<F: Frontend> {
    config: SupervisorConfig,
    args: F::Args,
    process_name: String,
    launcher: PlatformLauncher,
    sender: PacketSender<Bytes>,
    queue: Arc<Mutex<PacketReceiver<Bytes>>>,
    flag: TerminationFlag,
    stdin: DuplicatedStdin,
    stdin_source: StdinSource,
    running: Option<Running>,
}

impl<F: Frontend> FrontendProcess<F> {
    /// Prepare a supervisor for `F` with default settings; nothing is spawned yet
    pub fn new(args: F::Args) -> Result<Self, FrontendError> {
        Self::with_config(SupervisorConfig::default(), args)
    }

    pub fn with_config(config: SupervisorConfig, args: F::Args) -> Result<Self, FrontendError> {
        let launcher = PlatformLauncherFactory::create_launcher();
        let stdin = match launcher.duplicate_stdin() {
            Ok(stdin) => stdin,
            Err(e) => {
                warn!("Standard input unavailable, the frontend gets none: {}", e);
                DuplicatedStdin::unavailable()
            }
        };
        Self::build(config, args, stdin, StdinSource::Inherited)
    }

    /// Like [`FrontendProcess::with_config`], handing the subordinate `stdin` instead of ours.
    ///
    /// A duplicate of `stdin` is kept for restarts, so every lifecycle reads
    /// the same stream.
    pub fn with_stdin(
        config: SupervisorConfig,
        args: F::Args,
        stdin: DuplicatedStdin,
    ) -> Result<Self, FrontendError> {
        let source = StdinSource::Supplied(stdin.try_clone()?);
        Self::build(config, args, stdin, source)
    }

    fn build(
        config: SupervisorConfig,
        args: F::Args,
        stdin: DuplicatedStdin,
        stdin_source: StdinSource,
    ) -> Result<Self, FrontendError> {
        config
            .validate()
            .map_err(|e| FrontendError::Configuration(e.to_string()))?;

        let (sender, receiver) = packet_channel();
        Ok(Self {
            config,
            args,
            process_name: process_name_for::<F>(),
            launcher: PlatformLauncherFactory::create_launcher(),
            sender,
            queue: Arc::new(Mutex::new(receiver)),
            flag: TerminationFlag::new(),
            stdin,
            stdin_source,
            running: None,
        })
    }

    /// Launch the subordinate process.
    ///
    /// On success the local stdin copy belongs to the subordinate.
    pub async fn start(&mut self) -> Result<(), FrontendError> {
        if self.running.is_some() {
            return Err(FrontendError::AlreadyRunning(self.process_name.clone()));
        }

        if self.stdin.state() == StdinState::Transferred {
            debug!("Re-duplicating standard input for '{}'", self.process_name);
            self.stdin = match &self.stdin_source {
                StdinSource::Inherited => self.launcher.duplicate_stdin()?,
                StdinSource::Supplied(source) => source.try_clone()?,
            };
        }
        let child_stdin = self.stdin.for_child()?;

        self.flag.clear();
        let endpoint = IpcEndpoint::generate(&self.config.socket_prefix);
        let listeners = endpoint.bind()?;

        let subordinate_env = SubordinateEnv::new(
            self.process_name.clone(),
            F::DISPLAY_NAME,
            &self.args,
            endpoint,
            self.config.runtime.clone(),
        )?;
        let mut env = self.config.env.clone();
        env.extend(subordinate_env.to_vars()?);

        let spec = LaunchSpec {
            program: self.config.resolve_program()?,
            args: self.config.args.clone(),
            env,
            working_directory: self.config.working_directory.clone(),
            process_name: self.process_name.clone(),
        };

        let handle = self.launcher.spawn(&spec, child_stdin)?;
        self.stdin.mark_transferred();

        let link = SupervisorLink::spawn(
            listeners,
            self.queue.clone(),
            self.flag.clone(),
            self.process_name.clone(),
        );

        info!(
            "Started '{}' on {} (PID: {:?})",
            self.process_name,
            PlatformLauncherFactory::platform_name(),
            handle.get_pid()
        );
        self.running = Some(Running { handle, link });
        Ok(())
    }

    /// Queue a packet for the frontend; never blocks.
    ///
    /// The packet is encoded here, so one that cannot reach the frontend
    /// unchanged is refused with [`FrontendError::Codec`] and nothing is queued.
    pub fn issue_packet(&self, packet: F::Packet) -> Result<(), FrontendError> {
        let frame = encode_packet(&packet)?;
        self.sender.send(frame)
    }

    /// Request termination and wait for the subordinate to exit.
    ///
    /// Returns `Ok(None)` when nothing was running. A subordinate that crashed
    /// is reported through the returned [`SubordinateExit`], not as an error.
    pub async fn stop(&mut self) -> Result<Option<SubordinateExit>, FrontendError> {
        let Some(Running { mut handle, link }) = self.running.take() else {
            debug!("'{}' is not running, nothing to stop", self.process_name);
            return Ok(None);
        };

        info!("Stopping '{}'", self.process_name);
        self.flag.set();

        let exit = handle.wait().await;
        link.close().await;
        let exit = exit?;

        if exit.is_clean() {
            info!("'{}' exited cleanly", self.process_name);
        } else {
            warn!("'{}' ended abnormally: {}", self.process_name, exit);
        }
        Ok(Some(exit))
    }

    /// Whether a subordinate was started and not yet joined
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    pub fn pid(&self) -> Option<ProcessId> {
        self.running.as_ref().and_then(|r| r.handle.get_pid())
    }

    pub fn stdin_state(&self) -> StdinState {
        self.stdin.state()
    }

    /// Duplicate the stdin copy held for the next subordinate
    pub fn stdin_handle(&self) -> Result<DuplicatedStdin, FrontendError> {
        self.stdin.try_clone()
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }
}

impl<F: Frontend> Drop for FrontendProcess<F> {
    fn drop(&mut self) {
        if self.running.is_some() {
            warn!(
                "'{}' dropped without stop(), requesting termination",
                self.process_name
            );
            self.flag.set();
        }
    }
}
