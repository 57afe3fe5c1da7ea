use crate::error::FrontendError;
use crate::stdio::DuplicatedStdin;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

/// Unique identifier for a process
pub type ProcessId = u32;

/// How a subordinate process ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubordinateExit {
    /// Exit code, if the process exited normally
    pub code: Option<i32>,
    /// Name of the signal that terminated the process (Unix only)
    pub signal: Option<String>,
}

impl SubordinateExit {
    pub fn from_code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    pub fn from_signal(signal: impl Into<String>) -> Self {
        Self {
            code: None,
            signal: Some(signal.into()),
        }
    }

    /// The subordinate returned from its runtime loop without error
    pub fn is_clean(&self) -> bool {
        self.code == Some(0)
    }
}

impl std::fmt::Display for SubordinateExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.code, &self.signal) {
            (Some(code), _) => write!(f, "exit code {code}"),
            (None, Some(signal)) => write!(f, "terminated by {signal}"),
            (None, None) => write!(f, "unknown exit status"),
        }
    }
}

/// Everything needed to launch one subordinate
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub working_directory: Option<PathBuf>,
    /// Operator-visible name, for logs and process listings
    pub process_name: String,
}

/// Trait representing a handle to a running subordinate
#[async_trait]
pub trait SubordinateHandle: Send + Sync {
    /// Get the process ID (None if process has exited)
    fn get_pid(&self) -> Option<ProcessId>;

    fn process_name(&self) -> &str;

    /// Try to get exit status without blocking
    async fn try_wait(&mut self) -> Result<Option<SubordinateExit>>;

    /// Wait for the process to exit
    async fn wait(&mut self) -> Result<SubordinateExit>;
}

/// Platform-specific process plumbing used by the supervisor and the subordinate.
///
/// Nothing here ever kills a process: shutdown is cooperative.
pub trait SubordinateLauncher: Send + Sync {
    /// The type of process handle this launcher produces
    type Handle: SubordinateHandle + 'static;

    fn new() -> Self
    where
        Self: Sized;

    /// Duplicate the owning process's standard input
    fn duplicate_stdin(&self) -> std::io::Result<DuplicatedStdin>;

    /// Start a subordinate with `stdin` as its standard input
    fn spawn(&self, spec: &LaunchSpec, stdin: Stdio) -> Result<Self::Handle, FrontendError>;

    /// Make the calling process recognisable under `name`, where the platform allows it
    fn apply_process_name(&self, name: &str) -> Result<()>;
}

/// Factory trait for creating platform-specific launchers
pub trait SubordinateLauncherFactory {
    /// The type of launcher this factory creates
    type Launcher: SubordinateLauncher;

    fn create_launcher() -> Self::Launcher;

    /// Get the platform name for logging and debugging
    fn platform_name() -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_classification() {
        assert!(SubordinateExit::from_code(0).is_clean());
        assert!(!SubordinateExit::from_code(1).is_clean());
        assert!(!SubordinateExit::from_signal("SIGSEGV").is_clean());
    }

    #[test]
    fn test_exit_display() {
        assert_eq!(SubordinateExit::from_code(3).to_string(), "exit code 3");
        assert_eq!(
            SubordinateExit::from_signal("SIGKILL").to_string(),
            "terminated by SIGKILL"
        );
        let unknown = SubordinateExit {
            code: None,
            signal: None,
        };
        assert_eq!(unknown.to_string(), "unknown exit status");
    }
}
