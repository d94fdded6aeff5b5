//! Named-channel transport.
//!
//! On Unix the channel is a Unix domain socket file under the user's runtime
//! directory; on Windows it is a named pipe in the `\\.\pipe\` namespace.
//! Either way the channel carries exactly one session: one listener, one peer.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};
#[cfg(windows)]
use tokio::net::windows::named_pipe::{ClientOptions, NamedPipeClient, NamedPipeServer, ServerOptions};

use crate::error::IpcError;

/// Pause between attach attempts while the server is not yet listening.
const RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Stream handed to the server once its peer attaches.
#[cfg(unix)]
pub type ServerStream = UnixStream;
/// Stream handed to the client once it attaches.
#[cfg(unix)]
pub type ClientStream = UnixStream;

/// Stream handed to the server once its peer attaches.
#[cfg(windows)]
pub type ServerStream = NamedPipeServer;
/// Stream handed to the client once it attaches.
#[cfg(windows)]
pub type ClientStream = NamedPipeClient;

/// Platform address of a named channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    path: PathBuf,
}

impl Endpoint {
    /// Resolve a channel name to its platform address.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        #[cfg(unix)]
        {
            let dir = dirs::runtime_dir().unwrap_or_else(std::env::temp_dir);
            Self {
                path: dir.join(format!("{name}.sock")),
            }
        }

        #[cfg(windows)]
        {
            Self {
                path: PathBuf::from(format!(r"\\.\pipe\{name}")),
            }
        }
    }

    /// Use an explicit socket path or pipe name.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The resolved address.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// The bound, listening end of a channel.
///
/// Dropping the listener releases the name. [`Listener::accept`] consumes it,
/// so the name is released as soon as the single peer is attached.
#[derive(Debug)]
pub struct Listener {
    endpoint: Endpoint,
    #[cfg(unix)]
    inner: UnixListener,
    #[cfg(windows)]
    inner: NamedPipeServer,
}

impl Listener {
    /// Claim the channel name.
    ///
    /// On Unix a leftover socket file with nobody listening behind it is
    /// replaced.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::AddressInUse`] if a live server already owns the
    /// name, or an I/O error if the name cannot be bound.
    #[cfg(unix)]
    pub async fn bind(endpoint: &Endpoint, max_instances: u32) -> Result<Self, IpcError> {
        tracing::debug!(
            "Binding {} (max {} instance{})",
            endpoint,
            max_instances,
            if max_instances == 1 { "" } else { "s" }
        );

        let inner = match UnixListener::bind(&endpoint.path) {
            Ok(listener) => listener,
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                if UnixStream::connect(&endpoint.path).await.is_ok() {
                    return Err(IpcError::AddressInUse(endpoint.to_string()));
                }
                tracing::debug!("Removing stale socket {}", endpoint);
                std::fs::remove_file(&endpoint.path)?;
                UnixListener::bind(&endpoint.path)?
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            endpoint: endpoint.clone(),
            inner,
        })
    }

    /// Claim the pipe name.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::AddressInUse`] if another server already created the
    /// pipe, or an I/O error if the pipe cannot be created.
    #[cfg(windows)]
    #[allow(clippy::unused_async)]
    pub async fn bind(endpoint: &Endpoint, max_instances: u32) -> Result<Self, IpcError> {
        tracing::debug!("Creating pipe {} (max {} instances)", endpoint, max_instances);

        let inner = ServerOptions::new()
            .first_pipe_instance(true)
            .max_instances(max_instances as usize)
            .create(&endpoint.path)
            .map_err(|e| {
                if e.kind() == io::ErrorKind::PermissionDenied {
                    IpcError::AddressInUse(endpoint.to_string())
                } else {
                    IpcError::Io(e)
                }
            })?;

        Ok(Self {
            endpoint: endpoint.clone(),
            inner,
        })
    }

    /// Wait, without a deadline, for the one peer this channel serves.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if accepting fails.
    #[cfg(unix)]
    pub async fn accept(self) -> Result<ServerStream, IpcError> {
        let (stream, _) = self.inner.accept().await?;
        Ok(stream)
    }

    /// Wait, without a deadline, for the one peer this channel serves.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the pipe connection fails.
    #[cfg(windows)]
    pub async fn accept(self) -> Result<ServerStream, IpcError> {
        self.inner.connect().await?;
        Ok(self.inner)
    }

    /// Address this listener is bound to.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

#[cfg(unix)]
impl Drop for Listener {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.endpoint.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::debug!("Failed to remove socket {}: {}", self.endpoint, e);
            }
        }
    }
}

/// Attach to a channel, retrying until `timeout` elapses.
///
/// A missing name, a refused connection or a busy pipe are all treated as
/// "server not ready yet" and retried.
///
/// # Errors
///
/// Returns [`IpcError::ConnectTimeout`] when the deadline passes, or the
/// first I/O error that is not a readiness condition.
pub async fn connect(endpoint: &Endpoint, timeout: Duration) -> Result<ClientStream, IpcError> {
    tokio::time::timeout(timeout, connect_with_retry(endpoint))
        .await
        .map_err(|_| IpcError::ConnectTimeout(timeout))?
}

async fn connect_with_retry(endpoint: &Endpoint) -> Result<ClientStream, IpcError> {
    loop {
        match try_connect(endpoint).await {
            Ok(stream) => return Ok(stream),
            Err(e) if is_not_ready(&e) => {
                tracing::trace!("{} not ready: {}", endpoint, e);
                tokio::time::sleep(RETRY_INTERVAL).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(unix)]
async fn try_connect(endpoint: &Endpoint) -> io::Result<ClientStream> {
    UnixStream::connect(&endpoint.path).await
}

#[cfg(windows)]
#[allow(clippy::unused_async)]
async fn try_connect(endpoint: &Endpoint) -> io::Result<ClientStream> {
    ClientOptions::new().open(&endpoint.path)
}

#[cfg(unix)]
fn is_not_ready(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused
    )
}

#[cfg(windows)]
fn is_not_ready(e: &io::Error) -> bool {
    const ERROR_PIPE_BUSY: i32 = 231;
    e.kind() == io::ErrorKind::NotFound || e.raw_os_error() == Some(ERROR_PIPE_BUSY)
}
