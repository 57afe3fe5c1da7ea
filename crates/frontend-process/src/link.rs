//! Both ends of the supervisor/subordinate IPC link.

use frontend_process_core::{
    IpcEndpoint, IpcListeners, PacketReceiver, PacketSender, RuntimeConfig, TERMINATE_BYTE,
    TerminationFlag, decode_packet, frame_codec, packet_channel,
};
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::bytes::Bytes;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Supervisor side: forwards encoded packets and the termination flag to one subordinate
pub(crate) struct SupervisorLink {
    task: JoinHandle<()>,
    shutdown: CancellationToken,
}

impl SupervisorLink {
    pub(crate) fn spawn(
        listeners: IpcListeners,
        queue: Arc<Mutex<PacketReceiver<Bytes>>>,
        flag: TerminationFlag,
        process_name: String,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(forward(
            listeners,
            queue,
            flag,
            shutdown.clone(),
            process_name,
        ));
        Self { task, shutdown }
    }

    /// Stop forwarding and wait for the task to release the queue
    pub(crate) async fn close(self) {
        self.shutdown.cancel();
        if let Err(e) = self.task.await {
            error!("Supervisor link task failed: {}", e);
        }
    }
}

async fn forward(
    listeners: IpcListeners,
    queue: Arc<Mutex<PacketReceiver<Bytes>>>,
    flag: TerminationFlag,
    shutdown: CancellationToken,
    process_name: String,
) {
    // Dropping the listeners unconnected makes the subordinate see a set flag.
    let streams = tokio::select! {
        streams = listeners.accept() => match streams {
            Ok(streams) => streams,
            Err(e) => {
                error!("'{}' failed to connect: {}", process_name, e);
                return;
            }
        },
        _ = flag.wait() => {
            debug!("Termination requested before '{}' connected", process_name);
            return;
        }
        _ = shutdown.cancelled() => return,
    };
    drop(listeners);
    info!("'{}' connected", process_name);

    let mut frames = FramedWrite::new(streams.data, frame_codec());
    let mut control = streams.control;
    let mut queue = queue.lock().await;

    loop {
        tokio::select! {
            biased;
            _ = flag.wait() => {
                signal_termination(&mut control, &process_name).await;
                return;
            }
            _ = shutdown.cancelled() => return,
            frame = queue.recv() => {
                let Some(frame) = frame else {
                    debug!("Packet queue closed");
                    return;
                };
                // A frame taken off the queue is always written out whole; the
                // subordinate drains the data connection while it is alive.
                if let Err(e) = frames.send(frame).await {
                    warn!("Data link to '{}' closed: {}", process_name, e);
                    return;
                }
            }
        }
    }
}

async fn signal_termination<W>(control: &mut W, process_name: &str)
where
    W: tokio::io::AsyncWrite + Unpin,
{
    let written = async {
        control.write_all(&[TERMINATE_BYTE]).await?;
        control.flush().await
    };
    match written.await {
        Ok(()) => debug!("Sent termination to '{}'", process_name),
        // A subordinate that already went away has nothing left to stop.
        Err(e) => debug!("Could not send termination to '{}': {}", process_name, e),
    }
}

/// Subordinate side: the runtime's channel and flag, fed by reader tasks
pub(crate) struct SubordinateLink<P> {
    pub(crate) receiver: PacketReceiver<P>,
    pub(crate) flag: TerminationFlag,
    readers: Vec<JoinHandle<()>>,
}

impl<P> SubordinateLink<P>
where
    P: DeserializeOwned + Send + 'static,
{
    /// Connect to the supervisor.
    ///
    /// A link that cannot be established yields a raised flag, so the runtime
    /// goes straight to cleanup.
    pub(crate) async fn connect(endpoint: &IpcEndpoint, runtime: &RuntimeConfig) -> Self {
        match tokio::time::timeout(runtime.connect_timeout(), endpoint.connect()).await {
            Ok(Ok(streams)) => {
                let (sender, receiver) = packet_channel();
                let flag = TerminationFlag::new();
                let readers = vec![
                    tokio::spawn(read_packets(streams.data, sender)),
                    tokio::spawn(read_control(streams.control, flag.clone())),
                ];
                info!("Connected to supervisor at {}", endpoint.base());
                Self {
                    receiver,
                    flag,
                    readers,
                }
            }
            Ok(Err(e)) => {
                warn!("Supervisor unreachable, terminating: {}", e);
                Self::detached()
            }
            Err(_) => {
                warn!(
                    "Timed out connecting to supervisor at {}, terminating",
                    endpoint.base()
                );
                Self::detached()
            }
        }
    }

    /// A link with no supervisor behind it
    pub(crate) fn detached() -> Self {
        let (_, receiver) = packet_channel();
        Self {
            receiver,
            flag: TerminationFlag::raised(),
            readers: Vec::new(),
        }
    }

    pub(crate) fn into_parts(self) -> (PacketReceiver<P>, TerminationFlag, ReaderTasks) {
        (self.receiver, self.flag, ReaderTasks(self.readers))
    }
}

/// Reader tasks of a subordinate link; aborted on drop
pub(crate) struct ReaderTasks(Vec<JoinHandle<()>>);

impl Drop for ReaderTasks {
    fn drop(&mut self) {
        for task in &self.0 {
            task.abort();
        }
    }
}

async fn read_packets<R, P>(data: R, sender: PacketSender<P>)
where
    R: tokio::io::AsyncRead + Unpin,
    P: DeserializeOwned,
{
    let mut frames = FramedRead::new(data, frame_codec());
    while let Some(frame) = frames.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                error!("Data link failed: {}", e);
                return;
            }
        };
        match decode_packet::<P>(&frame) {
            Ok(packet) => {
                if sender.send(packet).is_err() {
                    return;
                }
            }
            Err(e) => warn!("Skipping undecodable packet of {} bytes: {}", frame.len(), e),
        }
    }
    debug!("Data link closed by supervisor");
}

async fn read_control<R>(mut control: R, flag: TerminationFlag)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut byte = [0u8; 1];
    loop {
        match control.read(&mut byte).await {
            Ok(0) => {
                warn!("Control link closed, treating as termination");
                break;
            }
            Ok(_) if byte[0] == TERMINATE_BYTE => {
                debug!("Termination received from supervisor");
                break;
            }
            Ok(_) => warn!("Ignoring unexpected control byte {:#04x}", byte[0]),
            Err(e) => {
                warn!("Control link failed, treating as termination: {}", e);
                break;
            }
        }
    }
    flag.set();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn runtime() -> RuntimeConfig {
        RuntimeConfig {
            connect_timeout_ms: 2_000,
            ..Default::default()
        }
    }

    fn encoded<P: serde::Serialize + DeserializeOwned>(packet: P) -> Bytes {
        frontend_process_core::encode_packet(&packet).unwrap()
    }

    #[tokio::test]
    async fn test_packets_and_flag_cross_the_link() {
        let endpoint = IpcEndpoint::generate("link-test");
        let listeners = endpoint.bind().unwrap();
        let (sender, receiver) = packet_channel::<Bytes>();
        let queue = Arc::new(Mutex::new(receiver));
        let supervisor_flag = TerminationFlag::new();

        for label in ["P1", "P2", "P3"] {
            sender.send(encoded(label.to_string())).unwrap();
        }

        let link = SupervisorLink::spawn(
            listeners,
            queue.clone(),
            supervisor_flag.clone(),
            "Test UI process".to_string(),
        );
        let subordinate = SubordinateLink::<String>::connect(&endpoint, &runtime()).await;
        let (mut receiver, flag, _readers) = subordinate.into_parts();

        let mut received = Vec::new();
        for _ in 0..3 {
            received.push(
                receiver
                    .read(true, Some(Duration::from_secs(2)))
                    .await
                    .unwrap(),
            );
        }
        assert_eq!(received, vec!["P1", "P2", "P3"]);
        assert!(!flag.is_set());

        supervisor_flag.set();
        tokio::time::timeout(Duration::from_secs(2), flag.wait())
            .await
            .expect("termination should cross the link");

        link.close().await;
        // The queue is released for the next lifecycle.
        assert!(queue.try_lock().is_ok());
    }

    #[tokio::test]
    async fn test_undecodable_frame_is_skipped() {
        let endpoint = IpcEndpoint::generate("link-skip");
        let listeners = endpoint.bind().unwrap();
        let (sender, receiver) = packet_channel::<Bytes>();
        let supervisor_flag = TerminationFlag::new();

        // What a NaN reading turns into once it has been through JSON.
        sender.send(Bytes::from_static(b"null")).unwrap();
        sender.send(encoded(1.5f64)).unwrap();
        sender.send(encoded(2.5f64)).unwrap();

        let link = SupervisorLink::spawn(
            listeners,
            Arc::new(Mutex::new(receiver)),
            supervisor_flag.clone(),
            "Test UI process".to_string(),
        );
        let subordinate = SubordinateLink::<f64>::connect(&endpoint, &runtime()).await;
        let (mut receiver, flag, _readers) = subordinate.into_parts();

        let timeout = Some(Duration::from_secs(2));
        assert_eq!(receiver.read(true, timeout).await, Ok(1.5));
        assert_eq!(receiver.read(true, timeout).await, Ok(2.5));
        assert!(!flag.is_set());

        supervisor_flag.set();
        tokio::time::timeout(Duration::from_secs(2), flag.wait())
            .await
            .expect("termination should still cross the link");
        link.close().await;
    }

    #[tokio::test]
    async fn test_termination_never_loses_a_dequeued_frame() {
        let endpoint = IpcEndpoint::generate("link-inflight");
        let listeners = endpoint.bind().unwrap();
        let (sender, receiver) = packet_channel::<Bytes>();
        let queue = Arc::new(Mutex::new(receiver));
        let supervisor_flag = TerminationFlag::new();

        // Far more than the socket buffers hold, so writes are in flight when
        // termination is requested.
        let padding = "x".repeat(4_096);
        let labels: Vec<String> = (0..2_000).map(|i| format!("{i:04}{padding}")).collect();
        for label in &labels {
            sender.send(encoded(label.clone())).unwrap();
        }

        let link = SupervisorLink::spawn(
            listeners,
            queue.clone(),
            supervisor_flag.clone(),
            "Test UI process".to_string(),
        );
        let subordinate = SubordinateLink::<String>::connect(&endpoint, &runtime()).await;
        let (mut receiver, flag, _readers) = subordinate.into_parts();

        let timeout = Some(Duration::from_secs(5));
        let mut received = vec![receiver.read(true, timeout).await.unwrap()];
        supervisor_flag.set();
        tokio::time::timeout(Duration::from_secs(5), flag.wait())
            .await
            .expect("termination should cross the link");
        link.close().await;

        // The data connection is closed now, so this drains to the end.
        while let Ok(packet) = receiver.read(true, timeout).await {
            received.push(packet);
        }

        let mut queue = queue.lock().await;
        let remaining = queue.len();
        assert_eq!(received.len() + remaining, labels.len());
        assert_eq!(received[..], labels[..received.len()]);
        if remaining > 0 {
            let next = queue.read(false, None).await.unwrap();
            let next: String = frontend_process_core::decode_packet(&next).unwrap();
            assert_eq!(next, labels[received.len()]);
        }
    }

    #[tokio::test]
    async fn test_flag_before_connect_detaches_subordinate() {
        let endpoint = IpcEndpoint::generate("link-early-stop");
        let listeners = endpoint.bind().unwrap();
        let (_sender, receiver) = packet_channel::<Bytes>();
        let flag = TerminationFlag::new();

        let link = SupervisorLink::spawn(
            listeners,
            Arc::new(Mutex::new(receiver)),
            flag.clone(),
            "Test UI process".to_string(),
        );
        flag.set();
        link.close().await;

        let subordinate = SubordinateLink::<String>::connect(&endpoint, &runtime()).await;
        let (_, sub_flag, _readers) = subordinate.into_parts();
        tokio::time::timeout(Duration::from_secs(2), sub_flag.wait())
            .await
            .expect("an unreachable supervisor means termination");
    }

    #[tokio::test]
    async fn test_detached_link_is_terminated_and_empty() {
        let (mut receiver, flag, _readers) = SubordinateLink::<u8>::detached().into_parts();
        assert!(flag.is_set());
        assert_eq!(
            receiver.read(false, None).await,
            Err(frontend_process_core::ReadError::Disconnected)
        );
    }
}
