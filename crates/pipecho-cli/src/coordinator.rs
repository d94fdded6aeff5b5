//! Coordinator: starts both peers, forwards console lines, and joins the
//! peers with bounded waits once the sentinel has been sent.

use std::time::Duration;

use pipecho_core::{Config, Message};
use pipecho_ipc::{
    ClientReport, EchoClient, EchoServer, Endpoint, IpcError, QueueSender, ServerReport, outbound,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinHandle;

/// How a unit of work finished, as seen by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitStatus<T> {
    /// Finished within the shutdown timeout.
    Completed(T),
    /// Finished with a transport or setup error.
    Failed(String),
    /// The task panicked.
    Panicked(String),
    /// Still running when the shutdown timeout expired. It was not stopped.
    TimedOut,
}

impl<T> UnitStatus<T> {
    /// The report, if the unit completed.
    #[must_use]
    pub const fn completed(&self) -> Option<&T> {
        match self {
            Self::Completed(report) => Some(report),
            _ => None,
        }
    }
}

/// Final state of both peers after shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Client outcome.
    pub client: UnitStatus<ClientReport>,
    /// Server outcome.
    pub server: UnitStatus<ServerReport>,
}

/// Drives one run of the demo.
#[derive(Debug, Clone)]
pub struct Coordinator {
    config: Config,
    endpoint: Endpoint,
}

impl Coordinator {
    /// Create a coordinator for the configured channel name.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let endpoint = Endpoint::from_name(&config.channel_name);
        Self { config, endpoint }
    }

    /// Override the channel address used by both peers.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Run until the sentinel is read from `input`, then wait for both peers.
    ///
    /// The server is started first and given the configured warm-up delay
    /// before the client starts. End of input counts as the sentinel.
    pub async fn run<R>(&self, input: R) -> ShutdownReport
    where
        R: AsyncBufRead + Unpin,
    {
        let (queue, outbound_rx) = outbound();

        let server = EchoServer::new(self.config.clone()).with_endpoint(self.endpoint.clone());
        let server = tokio::spawn(server.run());

        tokio::time::sleep(self.config.warmup_delay()).await;

        let client = EchoClient::new(self.config.clone()).with_endpoint(self.endpoint.clone());
        let client = tokio::spawn(client.run(outbound_rx));

        self.forward_input(input, &queue).await;

        let timeout = self.config.shutdown_timeout();
        let client = wait_bounded("Client", client, timeout).await;
        let server = wait_bounded("Server", server, timeout).await;

        ShutdownReport { client, server }
    }

    /// Push console lines onto the queue until the sentinel has been pushed.
    async fn forward_input<R>(&self, input: R, queue: &QueueSender)
    where
        R: AsyncBufRead + Unpin,
    {
        let sentinel = self.config.sentinel();
        let mut lines = input.lines();

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    tracing::info!("Input closed, sending '{}'", sentinel);
                    break;
                }
                Err(e) => {
                    tracing::error!("Failed to read input: {}", e);
                    break;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            let Some(message) = Message::new(line.as_str()) else {
                tracing::debug!("Dropping malformed input line {:?}", line);
                continue;
            };

            let done = sentinel.matches(message.as_str());
            forward(queue, message);
            if done {
                return;
            }
        }

        if let Some(message) = sentinel.message() {
            forward(queue, message);
        }
    }
}

fn forward(queue: &QueueSender, message: Message) {
    if let Err(e) = queue.push(message) {
        tracing::debug!("Client is not running: {}", e);
    }
}

/// Wait up to `timeout` for a unit of work.
///
/// Expiry is logged as `"<role> failed to shut down within timeout"` and the
/// task is left running; the handle is detached, not aborted.
pub async fn wait_bounded<T>(
    role: &str,
    handle: JoinHandle<Result<T, IpcError>>,
    timeout: Duration,
) -> UnitStatus<T> {
    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(Ok(report))) => UnitStatus::Completed(report),
        Ok(Ok(Err(e))) => {
            tracing::error!("{} failed: {}", role, e);
            UnitStatus::Failed(e.to_string())
        }
        Ok(Err(e)) => {
            tracing::error!("{} panicked: {}", role, e);
            UnitStatus::Panicked(e.to_string())
        }
        Err(_) => {
            tracing::warn!("{} failed to shut down within timeout", role);
            UnitStatus::TimedOut
        }
    }
}
