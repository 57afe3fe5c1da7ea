//! Wire pieces of the supervisor/subordinate link.
//!
//! The link is two local-socket connections. The data connection carries
//! packets as length-delimited JSON frames. The control connection carries
//! a single [`TERMINATE_BYTE`] once the termination flag is set.

use crate::error::FrontendError;
use interprocess::local_socket::tokio::prelude::*;
use interprocess::local_socket::{
    GenericFilePath, GenericNamespaced, ListenerOptions, Name, NameType, ToFsName, ToNsName,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::bytes::Bytes;
use tokio_util::codec::LengthDelimitedCodec;
use tracing::debug;

/// Written on the control connection to request termination
pub const TERMINATE_BYTE: u8 = b'T';

/// Largest accepted packet frame
pub const MAX_FRAME_LENGTH: usize = 64 * 1024 * 1024;

/// Socket names for one supervisor/subordinate lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpcEndpoint {
    base: String,
}

impl IpcEndpoint {
    /// A fresh, collision-free endpoint
    pub fn generate(prefix: &str) -> Self {
        Self {
            base: format!("{prefix}-{}", uuid::Uuid::new_v4().simple()),
        }
    }

    pub fn from_base(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn data_name(&self) -> String {
        format!("{}.data", self.base)
    }

    pub fn control_name(&self) -> String {
        format!("{}.ctl", self.base)
    }

    /// Bind both listeners. Done before the subordinate is spawned so it can connect at once.
    pub fn bind(&self) -> Result<IpcListeners, FrontendError> {
        Ok(IpcListeners {
            data: create_listener(&self.data_name())?,
            control: create_listener(&self.control_name())?,
        })
    }

    /// Connect both halves from the subordinate side
    pub async fn connect(&self) -> Result<IpcStreams, FrontendError> {
        let data = connect_stream(&self.data_name()).await?;
        let control = connect_stream(&self.control_name()).await?;
        Ok(IpcStreams { data, control })
    }
}

/// Supervisor-side listeners
pub struct IpcListeners {
    pub data: LocalSocketListener,
    pub control: LocalSocketListener,
}

impl IpcListeners {
    /// Wait for the subordinate to connect both halves
    pub async fn accept(&self) -> Result<IpcStreams, FrontendError> {
        let data = self.data.accept().await?;
        let control = self.control.accept().await?;
        Ok(IpcStreams { data, control })
    }
}

/// A connected link
pub struct IpcStreams {
    pub data: LocalSocketStream,
    pub control: LocalSocketStream,
}

fn socket_name(name: &str) -> std::io::Result<Name<'static>> {
    if GenericNamespaced::is_supported() {
        name.to_string().to_ns_name::<GenericNamespaced>()
    } else {
        std::env::temp_dir()
            .join(format!("{name}.sock"))
            .to_fs_name::<GenericFilePath>()
    }
}

fn create_listener(name: &str) -> Result<LocalSocketListener, FrontendError> {
    let socket = socket_name(name)?;
    let listener = ListenerOptions::new()
        .name(socket)
        .create_tokio()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                FrontendError::Ipc(format!("Socket address already in use: {name}"))
            } else {
                FrontendError::Ipc(format!("Failed to create listener for {name}: {e}"))
            }
        })?;
    debug!("Listening on {}", name);
    Ok(listener)
}

async fn connect_stream(name: &str) -> Result<LocalSocketStream, FrontendError> {
    let socket = socket_name(name)?;
    LocalSocketStream::connect(socket)
        .await
        .map_err(|e| FrontendError::Ipc(format!("Failed to connect to {name}: {e}")))
}

/// Length-delimited framing for the data connection
pub fn frame_codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .max_frame_length(MAX_FRAME_LENGTH)
        .new_codec()
}

/// Serialize one packet into a frame body.
///
/// The body is decoded again before it is accepted, so a packet JSON cannot
/// carry faithfully (a non-finite float, a map with non-string keys) is
/// rejected here instead of failing on the far side of the link.
pub fn encode_packet<P>(packet: &P) -> Result<Bytes, FrontendError>
where
    P: Serialize + DeserializeOwned,
{
    let body = serde_json::to_vec(packet)?;
    serde_json::from_slice::<P>(&body)?;
    Ok(Bytes::from(body))
}

pub fn decode_packet<P: DeserializeOwned>(frame: &[u8]) -> Result<P, FrontendError> {
    Ok(serde_json::from_slice(frame)?)
}
