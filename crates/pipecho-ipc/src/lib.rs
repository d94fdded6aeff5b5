//! # pipecho IPC
//!
//! Line-oriented echo over a local named channel.
//!
//! A single [`EchoServer`] listens on the channel and answers every line with
//! its reversal; a single [`EchoClient`] attaches within a deadline and feeds
//! the server from an [`outbound`] queue. The configured sentinel ends both
//! sides cooperatively.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod codec;
pub mod error;
pub mod queue;
pub mod report;
pub mod server;
pub mod transport;

pub use client::EchoClient;
pub use codec::LineStream;
pub use error::IpcError;
pub use queue::{QueueReceiver, QueueSender, outbound};
pub use report::{ClientReport, EndedBy, ServerReport};
pub use server::EchoServer;
pub use transport::{Endpoint, Listener, connect};
