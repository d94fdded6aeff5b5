//! IPC errors.

use pipecho_core::Message;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the transport, framing and queue layers.
#[derive(Error, Debug)]
pub enum IpcError {
    /// Underlying I/O failure on the channel.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Another live server already owns the channel name.
    #[error("Channel {0} is already in use")]
    AddressInUse(String),

    /// The client could not attach before its deadline.
    #[error("Failed to connect within {0:?}")]
    ConnectTimeout(Duration),

    /// A received line was not valid UTF-8.
    #[error("Received line is not valid UTF-8")]
    InvalidUtf8,

    /// A received line exceeded the framing limit.
    #[error("Received line exceeds {0} bytes")]
    LineTooLong(usize),

    /// The consumer side of the outbound queue is gone.
    #[error("Outbound queue closed, dropped '{0}'")]
    QueueClosed(Message),
}
