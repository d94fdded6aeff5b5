//! Outbound queue between the console reader and the client.
//!
//! Unbounded, FIFO, one producer and one consumer. Neither half is `Clone`,
//! so the single-producer/single-consumer discipline is enforced by the types.

use pipecho_core::Message;
use tokio::sync::mpsc;

use crate::error::IpcError;

/// Create a connected sender/receiver pair.
#[must_use]
pub fn outbound() -> (QueueSender, QueueReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (QueueSender { tx }, QueueReceiver { rx })
}

/// Producing half, held by the coordinator.
#[derive(Debug)]
pub struct QueueSender {
    tx: mpsc::UnboundedSender<Message>,
}

impl QueueSender {
    /// Append a message. Never blocks.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::QueueClosed`] with the rejected message if the
    /// receiver has been dropped.
    pub fn push(&self, message: Message) -> Result<(), IpcError> {
        self.tx
            .send(message)
            .map_err(|e| IpcError::QueueClosed(e.0))
    }
}

/// Consuming half, held by the client.
#[derive(Debug)]
pub struct QueueReceiver {
    rx: mpsc::UnboundedReceiver<Message>,
}

impl QueueReceiver {
    /// Wait for the next message.
    ///
    /// Returns `None` once the sender is dropped and the queue is drained.
    pub async fn take(&mut self) -> Option<Message> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn msg(text: &str) -> Message {
        Message::new(text).unwrap()
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let (tx, mut rx) = outbound();
        for text in ["a", "b", "c"] {
            tx.push(msg(text)).unwrap();
        }

        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(rx.take().await.unwrap().into_inner());
        }
        assert_eq!(seen, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_take_blocks_until_push() {
        let (tx, mut rx) = outbound();

        let consumer = tokio::spawn(async move { rx.take().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!consumer.is_finished());

        tx.push(msg("late")).unwrap();
        assert_eq!(consumer.await.unwrap(), Some(msg("late")));
    }

    #[tokio::test]
    async fn test_drained_after_sender_drop() {
        let (tx, mut rx) = outbound();
        tx.push(msg("last")).unwrap();
        drop(tx);

        assert_eq!(rx.take().await, Some(msg("last")));
        assert_eq!(rx.take().await, None);
    }

    #[test]
    fn test_push_after_receiver_drop() {
        let (tx, rx) = outbound();
        drop(rx);

        match tx.push(msg("orphan")) {
            Err(IpcError::QueueClosed(m)) => assert_eq!(m.as_str(), "orphan"),
            other => panic!("Expected QueueClosed, got {other:?}"),
        }
    }
}
