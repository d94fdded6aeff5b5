//! Echo client: forwards queued lines to the server and logs each reply.

use pipecho_core::{Config, Sentinel};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::codec::LineStream;
use crate::error::IpcError;
use crate::queue::QueueReceiver;
use crate::report::{ClientReport, EndedBy};
use crate::transport::{self, Endpoint};

/// The connecting peer.
#[derive(Debug, Clone)]
pub struct EchoClient {
    config: Config,
    endpoint: Endpoint,
}

impl EchoClient {
    /// Create a client for the configured channel name.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let endpoint = Endpoint::from_name(&config.channel_name);
        Self { config, endpoint }
    }

    /// Override the resolved channel address.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Attach to the server, then forward queued messages until the sentinel.
    ///
    /// Failing to attach within the connect timeout is logged and reported as
    /// [`EndedBy::ConnectTimeout`], not returned as an error.
    ///
    /// # Errors
    ///
    /// Returns any other connect or transport failure.
    pub async fn run(self, queue: QueueReceiver) -> Result<ClientReport, IpcError> {
        tracing::info!("Client: Waiting for server connection...");

        let stream = match transport::connect(&self.endpoint, self.config.connect_timeout()).await {
            Ok(stream) => stream,
            Err(IpcError::ConnectTimeout(timeout)) => {
                tracing::warn!("Client failed to connect to server within timeout");
                tracing::debug!("Gave up on {} after {:?}", self.endpoint, timeout);
                return Ok(ClientReport::empty(EndedBy::ConnectTimeout));
            }
            Err(e) => return Err(e),
        };
        tracing::info!("Client: Connected");

        drive_session(LineStream::new(stream), queue, self.config.sentinel()).await
    }
}

/// Run the send/await-reply loop on an attached stream.
///
/// Each message is written and flushed. The sentinel ends the loop without
/// waiting for a reply; any other message waits for exactly one reply line.
///
/// # Errors
///
/// Returns the first transport failure.
pub async fn drive_session<S>(
    mut stream: LineStream<S>,
    mut queue: QueueReceiver,
    sentinel: Sentinel,
) -> Result<ClientReport, IpcError>
where
    S: AsyncRead + AsyncWrite,
{
    let mut report = ClientReport::empty(EndedBy::QueueClosed);

    loop {
        let Some(message) = queue.take().await else {
            tracing::debug!("Client: Outbound queue closed");
            return Ok(report);
        };

        stream.write_line(message.as_str()).await?;

        if sentinel.matches(message.as_str()) {
            tracing::info!("Client: Exiting...");
            report.sent.push(message);
            report.ended_by = EndedBy::Sentinel;
            return Ok(report);
        }
        report.sent.push(message);

        match stream.read_line().await? {
            Some(reply) => {
                tracing::info!("Client: Received '{}'", reply);
                report.replies.push(reply);
            }
            None => {
                tracing::warn!("Client: Server closed the channel");
                report.ended_by = EndedBy::PeerClosed;
                return Ok(report);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::outbound;
    use crate::server::serve_session;
    use pipecho_core::Message;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio::io::duplex;

    fn msg(text: &str) -> Message {
        Message::new(text).unwrap()
    }

    #[tokio::test]
    async fn test_round_trip_against_server_loop() {
        let (a, b) = duplex(1024);
        let server = tokio::spawn(serve_session(LineStream::new(a), Sentinel::default()));

        let (tx, rx) = outbound();
        for text in ["hello", "ab", "cd", "QUIT"] {
            tx.push(msg(text)).unwrap();
        }

        let report = drive_session(LineStream::new(b), rx, Sentinel::default())
            .await
            .unwrap();

        assert_eq!(report.replies, vec!["olleh", "ba", "dc"]);
        assert_eq!(report.sent.len(), 4);
        assert_eq!(report.ended_by, EndedBy::Sentinel);

        let server_report = server.await.unwrap().unwrap();
        assert_eq!(server_report.received, vec!["hello", "ab", "cd"]);
        assert_eq!(server_report.ended_by, EndedBy::Sentinel);
    }

    #[tokio::test]
    async fn test_sentinel_does_not_wait_for_reply() {
        // Nobody ever answers on the far side.
        let (_far, b) = duplex(1024);
        let (tx, rx) = outbound();
        tx.push(msg("quit")).unwrap();

        let report = tokio::time::timeout(
            Duration::from_secs(1),
            drive_session(LineStream::new(b), rx, Sentinel::default()),
        )
        .await
        .expect("client waited for a reply to the sentinel")
        .unwrap();

        assert_eq!(report.ended_by, EndedBy::Sentinel);
        assert!(report.replies.is_empty());
    }

    #[tokio::test]
    async fn test_queue_closed_ends_session() {
        let (_far, b) = duplex(1024);
        let (tx, rx) = outbound();
        drop(tx);

        let report = drive_session(LineStream::new(b), rx, Sentinel::default())
            .await
            .unwrap();
        assert_eq!(report.ended_by, EndedBy::QueueClosed);
    }

    #[tokio::test]
    async fn test_server_hangup_while_awaiting_reply() {
        let (far, b) = duplex(1024);
        let (tx, rx) = outbound();
        tx.push(msg("hello")).unwrap();

        let hangup = tokio::spawn(async move {
            let mut far = LineStream::new(far);
            far.read_line().await.unwrap()
        });

        let report = drive_session(LineStream::new(b), rx, Sentinel::default())
            .await
            .unwrap();

        assert_eq!(hangup.await.unwrap().as_deref(), Some("hello"));
        assert_eq!(report.ended_by, EndedBy::PeerClosed);
        assert!(report.replies.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_connect_timeout_is_not_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            connect_timeout_ms: 100,
            ..Default::default()
        };
        let client =
            EchoClient::new(config).with_endpoint(Endpoint::at(temp.path().join("absent.sock")));

        let (_tx, rx) = outbound();
        let report = client.run(rx).await.unwrap();

        assert_eq!(report.ended_by, EndedBy::ConnectTimeout);
        assert!(report.sent.is_empty());
    }
}
