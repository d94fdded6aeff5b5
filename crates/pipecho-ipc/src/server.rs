//! Echo server: listens on the channel and answers each line with its reversal.

use pipecho_core::{Config, Sentinel, reverse};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::codec::LineStream;
use crate::error::IpcError;
use crate::report::{EndedBy, ServerReport};
use crate::transport::{Endpoint, Listener};

/// The listening peer.
///
/// Serves exactly one session: once its client is attached no other peer can
/// reach it, and it does not listen again after the session ends.
#[derive(Debug, Clone)]
pub struct EchoServer {
    config: Config,
    endpoint: Endpoint,
}

impl EchoServer {
    /// Create a server on the configured channel name.
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

    /// Bind, wait for the client, then echo until the sentinel arrives.
    ///
    /// The accept wait has no deadline.
    ///
    /// # Errors
    ///
    /// Returns any bind, accept or transport failure. The channel is
    /// released on every path.
    pub async fn run(self) -> Result<ServerReport, IpcError> {
        let listener = Listener::bind(&self.endpoint, self.config.max_server_instances).await?;

        tracing::info!("Server: Waiting for client connection...");
        let stream = listener.accept().await?;
        tracing::info!("Server: Connected");

        serve_session(LineStream::new(stream), self.config.sentinel()).await
    }
}

/// Run the per-message loop on an attached stream.
///
/// Empty lines are ignored. The sentinel stops the loop without a reply.
/// Every other line is logged and answered with its reversal.
///
/// # Errors
///
/// Returns the first transport failure.
pub async fn serve_session<S>(
    mut stream: LineStream<S>,
    sentinel: Sentinel,
) -> Result<ServerReport, IpcError>
where
    S: AsyncRead + AsyncWrite,
{
    let mut received = Vec::new();

    loop {
        let Some(line) = stream.read_line().await? else {
            tracing::warn!("Server: Client closed the channel without '{}'", sentinel);
            return Ok(ServerReport {
                received,
                ended_by: EndedBy::PeerClosed,
            });
        };

        if line.is_empty() {
            continue;
        }

        if sentinel.matches(&line) {
            tracing::info!("Server: Exiting...");
            return Ok(ServerReport {
                received,
                ended_by: EndedBy::Sentinel,
            });
        }

        tracing::info!("Server: Received '{}'", line);
        stream.write_line(&reverse(&line)).await?;
        received.push(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncWriteExt, duplex};

    #[tokio::test]
    async fn test_echoes_reversed_lines() {
        let (a, b) = duplex(1024);
        let server = tokio::spawn(serve_session(LineStream::new(a), Sentinel::default()));
        let mut peer = LineStream::new(b);

        peer.write_line("hello").await.unwrap();
        assert_eq!(peer.read_line().await.unwrap().as_deref(), Some("olleh"));

        peer.write_line("quit").await.unwrap();
        let report = server.await.unwrap().unwrap();

        assert_eq!(report.received, vec!["hello"]);
        assert_eq!(report.ended_by, EndedBy::Sentinel);
    }

    #[tokio::test]
    async fn test_sentinel_gets_no_reply() {
        let (a, b) = duplex(1024);
        let server = tokio::spawn(serve_session(LineStream::new(a), Sentinel::default()));
        let mut peer = LineStream::new(b);

        peer.write_line("Quit").await.unwrap();
        server.await.unwrap().unwrap();

        // Server side is dropped; nothing but end of stream remains.
        assert_eq!(peer.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_lines_are_ignored() {
        let (a, mut raw) = duplex(1024);
        let server = tokio::spawn(serve_session(LineStream::new(a), Sentinel::default()));

        raw.write_all(b"\n\r\nab\nQUIT\n").await.unwrap();
        let report = server.await.unwrap().unwrap();

        assert_eq!(report.received, vec!["ab"]);
    }

    #[tokio::test]
    async fn test_whitespace_line_is_echoed() {
        let (a, b) = duplex(1024);
        let server = tokio::spawn(serve_session(LineStream::new(a), Sentinel::default()));
        let mut peer = LineStream::new(b);

        peer.write_line("   ").await.unwrap();
        assert_eq!(peer.read_line().await.unwrap().as_deref(), Some("   "));

        peer.write_line("QUIT").await.unwrap();
        let report = server.await.unwrap().unwrap();
        assert_eq!(report.received, vec!["   "]);
    }

    #[tokio::test]
    async fn test_pipelined_replies_keep_order() {
        let (a, b) = duplex(1024);
        let server = tokio::spawn(serve_session(LineStream::new(a), Sentinel::default()));
        let mut peer = LineStream::new(b);

        peer.write_line("ab").await.unwrap();
        peer.write_line("cd").await.unwrap();

        assert_eq!(peer.read_line().await.unwrap().as_deref(), Some("ba"));
        assert_eq!(peer.read_line().await.unwrap().as_deref(), Some("dc"));

        peer.write_line("QUIT").await.unwrap();
        let report = server.await.unwrap().unwrap();
        assert_eq!(report.received, vec!["ab", "cd"]);
    }

    #[tokio::test]
    async fn test_peer_hangup_ends_session() {
        let (a, b) = duplex(1024);
        let server = tokio::spawn(serve_session(LineStream::new(a), Sentinel::default()));
        let mut peer = LineStream::new(b);

        peer.write_line("x").await.unwrap();
        assert_eq!(peer.read_line().await.unwrap().as_deref(), Some("x"));
        drop(peer);

        let report = server.await.unwrap().unwrap();
        assert_eq!(report.ended_by, EndedBy::PeerClosed);
    }

    #[tokio::test]
    async fn test_transport_fault_propagates() {
        let (a, mut raw) = duplex(1024);
        let server = tokio::spawn(serve_session(LineStream::new(a), Sentinel::default()));

        raw.write_all(&[0xc3, 0x28, b'\n']).await.unwrap();

        assert!(matches!(
            server.await.unwrap(),
            Err(IpcError::InvalidUtf8)
        ));
    }

    #[tokio::test]
    async fn test_custom_sentinel() {
        let (a, b) = duplex(1024);
        let sentinel = Sentinel::new("bye");
        let server = tokio::spawn(serve_session(LineStream::new(a), sentinel));
        let mut peer = LineStream::new(b);

        peer.write_line("quit").await.unwrap();
        assert_eq!(peer.read_line().await.unwrap().as_deref(), Some("tiuq"));

        peer.write_line("BYE").await.unwrap();
        assert_eq!(server.await.unwrap().unwrap().ended_by, EndedBy::Sentinel);
    }
}
