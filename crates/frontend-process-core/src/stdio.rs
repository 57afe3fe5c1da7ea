use crate::error::FrontendError;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

#[cfg(unix)]
pub type RawStdinHandle = std::os::fd::OwnedFd;
#[cfg(windows)]
pub type RawStdinHandle = std::os::windows::io::OwnedHandle;

/// Where the supervisor's duplicate of standard input currently lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdinState {
    /// Held locally, ready to be handed to the next subordinate
    Held,
    /// Handed to a subordinate; the local copy is closed
    Transferred,
    /// The owning process had no usable standard input
    Unavailable,
}

/// The supervisor's duplicated standard-input handle.
///
/// Ownership moves to the subordinate at spawn. Afterwards every operation
/// on the local copy is rejected with [`FrontendError::StdinTransferred`].
#[derive(Debug)]
pub struct DuplicatedStdin {
    handle: Option<RawStdinHandle>,
    state: StdinState,
}

impl DuplicatedStdin {
    pub fn new(handle: RawStdinHandle) -> Self {
        Self {
            handle: Some(handle),
            state: StdinState::Held,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            handle: None,
            state: StdinState::Unavailable,
        }
    }

    pub fn state(&self) -> StdinState {
        self.state
    }

    pub fn is_held(&self) -> bool {
        self.state == StdinState::Held
    }

    /// Borrow the handle for a child's stdin slot without giving up the local copy.
    ///
    /// A process without standard input hands the child a null stdin.
    pub fn for_child(&self) -> Result<Stdio, FrontendError> {
        match (&self.handle, self.state) {
            (Some(handle), StdinState::Held) => Ok(Stdio::from(handle.try_clone()?)),
            (_, StdinState::Unavailable) => Ok(Stdio::null()),
            _ => Err(FrontendError::StdinTransferred),
        }
    }

    /// Duplicate the local copy
    pub fn try_clone(&self) -> Result<Self, FrontendError> {
        match (&self.handle, self.state) {
            (Some(handle), StdinState::Held) => Ok(Self::new(handle.try_clone()?)),
            (_, StdinState::Unavailable) => Ok(Self::unavailable()),
            _ => Err(FrontendError::StdinTransferred),
        }
    }

    /// Close the local copy once a subordinate owns the stream
    pub fn mark_transferred(&mut self) {
        if self.state == StdinState::Unavailable {
            return;
        }
        self.handle = None;
        self.state = StdinState::Transferred;
    }
}

impl From<RawStdinHandle> for DuplicatedStdin {
    fn from(handle: RawStdinHandle) -> Self {
        DuplicatedStdin::new(handle)
    }
}

/// The input stream a frontend reads from.
///
/// Handed to the runtime explicitly and lent to every hook call, so there is
/// no process-wide "active stdin" to swap.
pub struct FrontendStdin(BufReader<Box<dyn AsyncRead + Unpin + Send>>);

impl FrontendStdin {
    pub fn new(t: Box<dyn AsyncRead + Unpin + Send>) -> FrontendStdin {
        FrontendStdin(BufReader::new(t))
    }

    /// The standard input this process was started with
    pub fn inherited() -> FrontendStdin {
        FrontendStdin::new(Box::new(tokio::io::stdin()))
    }

    pub fn empty() -> FrontendStdin {
        FrontendStdin::new(Box::new(tokio::io::empty()))
    }

    /// Read one line without its terminator; `None` at end of input
    pub async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        let mut line = String::new();
        if self.0.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    pub fn inner(&mut self) -> &mut BufReader<Box<dyn AsyncRead + Unpin + Send>> {
        &mut self.0
    }
}

impl std::fmt::Debug for FrontendStdin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrontendStdin").finish_non_exhaustive()
    }
}
