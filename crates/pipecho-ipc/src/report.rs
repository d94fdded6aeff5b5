//! Outcome summaries returned by the server and client units.

use pipecho_core::Message;

/// Why a unit of work stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndedBy {
    /// The sentinel was sent or received.
    Sentinel,
    /// The peer closed the channel first.
    PeerClosed,
    /// The outbound queue was closed with nothing left to send.
    QueueClosed,
    /// The client never attached to the channel.
    ConnectTimeout,
}

/// What the server saw during its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerReport {
    /// Echoed lines, in arrival order. The sentinel is not included.
    pub received: Vec<String>,
    /// How the session ended.
    pub ended_by: EndedBy,
}

/// What the client sent and got back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientReport {
    /// Messages written to the channel, in order, sentinel included.
    pub sent: Vec<Message>,
    /// Replies read from the channel, in order.
    pub replies: Vec<String>,
    /// How the session ended.
    pub ended_by: EndedBy,
}

impl ClientReport {
    pub(crate) const fn empty(ended_by: EndedBy) -> Self {
        Self {
            sent: Vec::new(),
            replies: Vec::new(),
            ended_by,
        }
    }
}
