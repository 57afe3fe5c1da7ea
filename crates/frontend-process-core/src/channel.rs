//! Unbounded FIFO packet channel.
//!
//! Both ends of the IPC link keep one of these: the supervisor queues packets
//! into it from `issue_packet`, and the subordinate's reader task refills one
//! that the runtime loop polls.

use crate::error::{FrontendError, ReadError};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError};
use tokio::time::Instant;

/// Create a connected sender/receiver pair
pub fn packet_channel<P>() -> (PacketSender<P>, PacketReceiver<P>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (PacketSender { tx }, PacketReceiver { rx })
}

/// Producing half. Sending never blocks and never applies backpressure.
#[derive(Debug)]
pub struct PacketSender<P> {
    tx: UnboundedSender<P>,
}

impl<P> Clone for PacketSender<P> {
    fn clone(&self) -> Self {
        PacketSender {
            tx: self.tx.clone(),
        }
    }
}

impl<P> PacketSender<P> {
    pub fn send(&self, packet: P) -> Result<(), FrontendError> {
        self.tx.send(packet).map_err(|_| FrontendError::ChannelClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consuming half
#[derive(Debug)]
pub struct PacketReceiver<P> {
    rx: UnboundedReceiver<P>,
}

impl<P> PacketReceiver<P> {
    /// Wait for the next packet; `None` once every sender is gone and the queue is drained
    pub async fn recv(&mut self) -> Option<P> {
        self.rx.recv().await
    }

    /// Remove one packet.
    ///
    /// Non-blocking reads return immediately. Blocking reads wait up to
    /// `timeout`, or forever when it is `None`. A disconnected channel with a
    /// bounded wait still waits out the window before reporting, so a caller
    /// polling in a loop never spins.
    pub async fn read(
        &mut self,
        blocking: bool,
        timeout: Option<Duration>,
    ) -> Result<P, ReadError> {
        if !blocking {
            return match self.rx.try_recv() {
                Ok(packet) => Ok(packet),
                Err(TryRecvError::Empty) => Err(ReadError::Empty),
                Err(TryRecvError::Disconnected) => Err(ReadError::Disconnected),
            };
        }

        let Some(limit) = timeout else {
            return self.rx.recv().await.ok_or(ReadError::Disconnected);
        };

        let deadline = Instant::now() + limit;
        match tokio::time::timeout_at(deadline, self.rx.recv()).await {
            Ok(Some(packet)) => Ok(packet),
            Ok(None) => {
                tokio::time::sleep_until(deadline).await;
                Err(ReadError::Disconnected)
            }
            Err(_) => Err(ReadError::Empty),
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_order() {
        let (tx, mut rx) = packet_channel();
        for n in 0..100u32 {
            tx.send(n).unwrap();
        }
        for n in 0..100u32 {
            assert_eq!(rx.read(false, None).await, Ok(n));
        }
        assert_eq!(rx.read(false, None).await, Err(ReadError::Empty));
    }

    #[tokio::test]
    async fn test_empty_after_timeout() {
        let (_tx, mut rx) = packet_channel::<String>();
        let timeout = Duration::from_millis(30);

        let started = std::time::Instant::now();
        let result = rx.read(true, Some(timeout)).await;

        assert_eq!(result, Err(ReadError::Empty));
        assert!(started.elapsed() >= timeout);
    }

    #[tokio::test]
    async fn test_non_blocking_read_returns_immediately() {
        let (_tx, mut rx) = packet_channel::<String>();

        let started = std::time::Instant::now();
        assert_eq!(
            rx.read(false, Some(Duration::from_secs(5))).await,
            Err(ReadError::Empty)
        );
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_blocking_read_wakes_on_send() {
        let (tx, mut rx) = packet_channel();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            tx.send("late".to_string()).unwrap();
        });

        let packet = rx.read(true, Some(Duration::from_secs(5))).await;
        assert_eq!(packet.as_deref(), Ok("late"));
    }

    #[tokio::test]
    async fn test_disconnected_drains_then_reports() {
        let (tx, mut rx) = packet_channel();
        tx.send(1u8).unwrap();
        drop(tx);

        assert_eq!(rx.read(true, Some(Duration::from_millis(5))).await, Ok(1));

        let timeout = Duration::from_millis(20);
        let started = std::time::Instant::now();
        assert_eq!(
            rx.read(true, Some(timeout)).await,
            Err(ReadError::Disconnected)
        );
        assert!(started.elapsed() >= timeout);
        assert_eq!(rx.read(true, None).await, Err(ReadError::Disconnected));
    }

    #[tokio::test]
    async fn test_send_after_receiver_dropped() {
        let (tx, rx) = packet_channel::<u8>();
        drop(rx);
        assert!(tx.is_closed());
        assert!(matches!(tx.send(1), Err(FrontendError::ChannelClosed)));
    }
}
