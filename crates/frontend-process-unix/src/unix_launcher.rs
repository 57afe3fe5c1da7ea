use anyhow::Result;
use async_trait::async_trait;
use frontend_process_core::{
    DuplicatedStdin, FrontendError, LaunchSpec, ProcessId, SubordinateExit, SubordinateHandle,
    SubordinateLauncher,
};
use std::process::Stdio;

#[cfg(unix)]
mod unix_impl {
    use super::*;
    use nix::sys::signal::Signal;
    use std::os::fd::AsFd;
    use std::os::unix::process::ExitStatusExt;
    use tokio::process::{Child, Command};
    use tracing::{debug, info};

    /// Unix-specific subordinate handle implementation
    pub struct UnixSubordinateHandle {
        child: Child,
        process_name: String,
    }

    impl UnixSubordinateHandle {
        pub fn new(child: Child, process_name: String) -> Self {
            Self {
                child,
                process_name,
            }
        }
    }

    /// Translate a wait status, naming the signal when one ended the process
    pub fn describe_exit(status: std::process::ExitStatus) -> SubordinateExit {
        if let Some(code) = status.code() {
            return SubordinateExit::from_code(code);
        }
        match status.signal() {
            Some(raw) => match Signal::try_from(raw) {
                Ok(signal) => SubordinateExit::from_signal(signal.as_str()),
                Err(_) => SubordinateExit::from_signal(format!("signal {raw}")),
            },
            None => SubordinateExit {
                code: None,
                signal: None,
            },
        }
    }

    #[async_trait]
    impl SubordinateHandle for UnixSubordinateHandle {
        fn get_pid(&self) -> Option<ProcessId> {
            self.child.id()
        }

        fn process_name(&self) -> &str {
            &self.process_name
        }

        async fn try_wait(&mut self) -> Result<Option<SubordinateExit>> {
            Ok(self.child.try_wait()?.map(describe_exit))
        }

        async fn wait(&mut self) -> Result<SubordinateExit> {
            let status = self.child.wait().await?;
            Ok(describe_exit(status))
        }
    }

    /// Unix-specific subordinate launcher
    #[derive(Debug, Default)]
    pub struct UnixLauncher;

    impl SubordinateLauncher for UnixLauncher {
        type Handle = UnixSubordinateHandle;

        fn new() -> Self {
            UnixLauncher
        }

        fn duplicate_stdin(&self) -> std::io::Result<DuplicatedStdin> {
            let handle = std::io::stdin().as_fd().try_clone_to_owned()?;
            Ok(DuplicatedStdin::new(handle))
        }

        fn spawn(&self, spec: &LaunchSpec, stdin: Stdio) -> Result<Self::Handle, FrontendError> {
            let mut cmd = Command::new(&spec.program);
            cmd.args(&spec.args).envs(&spec.env).stdin(stdin);

            if let Some(dir) = &spec.working_directory {
                cmd.current_dir(dir);
            }

            // Stays in the caller's process group: a background group cannot read the terminal.
            let child = cmd.spawn().map_err(|source| FrontendError::SpawnFailed {
                program: spec.program.display().to_string(),
                source,
            })?;

            if let Some(pid) = child.id() {
                info!(
                    "Spawned Unix subordinate '{}' (PID: {}) from {}",
                    spec.process_name,
                    pid,
                    spec.program.display()
                );
            }

            Ok(UnixSubordinateHandle::new(child, spec.process_name.clone()))
        }

        fn apply_process_name(&self, name: &str) -> Result<()> {
            #[cfg(any(target_os = "linux", target_os = "android"))]
            {
                // The kernel keeps at most 15 bytes of a task name.
                let short: String = name.chars().take(15).collect();
                let c_name = std::ffi::CString::new(short)?;
                nix::sys::prctl::set_name(&c_name)?;
                debug!("Applied process name '{}'", name);
            }

            #[cfg(not(any(target_os = "linux", target_os = "android")))]
            {
                debug!("Process naming unsupported here, keeping '{}' in logs only", name);
            }

            Ok(())
        }
    }
}

// Re-export the Unix implementation when on Unix systems
#[cfg(unix)]
pub use unix_impl::{UnixLauncher, UnixSubordinateHandle, describe_exit};

// Provide stub implementations for non-Unix systems
#[cfg(not(unix))]
pub struct UnixSubordinateHandle;

#[cfg(not(unix))]
#[async_trait]
impl SubordinateHandle for UnixSubordinateHandle {
    fn get_pid(&self) -> Option<ProcessId> {
        None
    }

    fn process_name(&self) -> &str {
        ""
    }

    async fn try_wait(&mut self) -> Result<Option<SubordinateExit>> {
        Ok(None)
    }

    async fn wait(&mut self) -> Result<SubordinateExit> {
        Err(anyhow::anyhow!("Unix subordinates are unavailable on this platform"))
    }
}

#[cfg(not(unix))]
#[derive(Debug, Default)]
pub struct UnixLauncher;

#[cfg(not(unix))]
impl SubordinateLauncher for UnixLauncher {
    type Handle = UnixSubordinateHandle;

    fn new() -> Self {
        UnixLauncher
    }

    fn duplicate_stdin(&self) -> std::io::Result<DuplicatedStdin> {
        Ok(DuplicatedStdin::unavailable())
    }

    fn spawn(&self, spec: &LaunchSpec, _stdin: Stdio) -> Result<Self::Handle, FrontendError> {
        Err(FrontendError::SpawnFailed {
            program: spec.program.display().to_string(),
            source: std::io::Error::from(std::io::ErrorKind::Unsupported),
        })
    }

    fn apply_process_name(&self, _name: &str) -> Result<()> {
        Ok(())
    }
}
