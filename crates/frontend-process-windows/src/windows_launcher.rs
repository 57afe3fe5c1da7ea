use anyhow::Result;
use async_trait::async_trait;
use frontend_process_core::{
    DuplicatedStdin, FrontendError, LaunchSpec, ProcessId, SubordinateExit, SubordinateHandle,
    SubordinateLauncher,
};
use std::process::Stdio;

#[cfg(windows)]
mod windows_impl {
    use super::*;
    use std::os::windows::io::AsHandle;
    use tokio::process::{Child, Command};
    use tracing::{debug, info};
    use windows::Win32::System::Console::SetConsoleTitleW;
    use windows::core::HSTRING;

    /// Windows-specific subordinate handle implementation
    pub struct WindowsSubordinateHandle {
        child: Child,
        process_name: String,
    }

    impl WindowsSubordinateHandle {
        pub fn new(child: Child, process_name: String) -> Self {
            Self {
                child,
                process_name,
            }
        }
    }

    fn describe_exit(status: std::process::ExitStatus) -> SubordinateExit {
        match status.code() {
            Some(code) => SubordinateExit::from_code(code),
            None => SubordinateExit {
                code: None,
                signal: None,
            },
        }
    }

    #[async_trait]
    impl SubordinateHandle for WindowsSubordinateHandle {
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

    /// Windows-specific subordinate launcher
    #[derive(Debug, Default)]
    pub struct WindowsLauncher;

    impl SubordinateLauncher for WindowsLauncher {
        type Handle = WindowsSubordinateHandle;

        fn new() -> Self {
            WindowsLauncher
        }

        fn duplicate_stdin(&self) -> std::io::Result<DuplicatedStdin> {
            let handle = std::io::stdin().as_handle().try_clone_to_owned()?;
            Ok(DuplicatedStdin::new(handle))
        }

        fn spawn(&self, spec: &LaunchSpec, stdin: Stdio) -> Result<Self::Handle, FrontendError> {
            let mut cmd = Command::new(&spec.program);
            cmd.args(&spec.args).envs(&spec.env).stdin(stdin);

            if let Some(dir) = &spec.working_directory {
                cmd.current_dir(dir);
            }

            let child = cmd.spawn().map_err(|source| FrontendError::SpawnFailed {
                program: spec.program.display().to_string(),
                source,
            })?;

            if let Some(pid) = child.id() {
                info!(
                    "Spawned Windows subordinate '{}' (PID: {}) from {}",
                    spec.process_name,
                    pid,
                    spec.program.display()
                );
            }

            Ok(WindowsSubordinateHandle::new(
                child,
                spec.process_name.clone(),
            ))
        }

        fn apply_process_name(&self, name: &str) -> Result<()> {
            // The console title is the closest thing to a process name an operator sees.
            unsafe { SetConsoleTitleW(&HSTRING::from(name))? };
            debug!("Applied console title '{}'", name);
            Ok(())
        }
    }
}

#[cfg(windows)]
pub use windows_impl::{WindowsLauncher, WindowsSubordinateHandle};

// Provide stub implementations for non-Windows systems
#[cfg(not(windows))]
pub struct WindowsSubordinateHandle;

#[cfg(not(windows))]
#[async_trait]
impl SubordinateHandle for WindowsSubordinateHandle {
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
        Err(anyhow::anyhow!(
            "Windows subordinates are unavailable on this platform"
        ))
    }
}

#[cfg(not(windows))]
#[derive(Debug, Default)]
pub struct WindowsLauncher;

#[cfg(not(windows))]
impl SubordinateLauncher for WindowsLauncher {
    type Handle = WindowsSubordinateHandle;

    fn new() -> Self {
        WindowsLauncher
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

#[cfg(all(test, not(windows)))]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[test]
    fn test_stub_refuses_to_spawn() {
        let launcher = WindowsLauncher::new();
        let spec = LaunchSpec {
            program: PathBuf::from("display.exe"),
            args: Vec::new(),
            env: HashMap::new(),
            working_directory: None,
            process_name: "Display UI process".to_string(),
        };
        assert!(matches!(
            launcher.spawn(&spec, Stdio::null()),
            Err(FrontendError::SpawnFailed { .. })
        ));
        assert!(!launcher.duplicate_stdin().unwrap().is_held());
    }
}
