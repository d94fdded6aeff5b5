//! Core types exchanged over the channel.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One line of text travelling between the peers.
///
/// A `Message` is never blank and never carries a line terminator; both are
/// enforced at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Message(String);

impl Message {
    /// Build a message from a raw console or wire line.
    ///
    /// A single trailing `\n` or `\r\n` is stripped. Returns `None` for blank
    /// text or text with an embedded line terminator.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let mut text = text.into();
        if text.ends_with('\n') {
            text.pop();
            if text.ends_with('\r') {
                text.pop();
            }
        }

        if text.trim().is_empty() || text.contains(['\r', '\n']) {
            return None;
        }

        Some(Self(text))
    }

    /// Borrow the text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the inner text.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Message {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Message {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value.clone()).ok_or_else(|| format!("not a valid message line: {value:?}"))
    }
}

impl From<Message> for String {
    fn from(message: Message) -> Self {
        message.0
    }
}

/// The reserved message that ends a session.
///
/// Matching is an exact, case-insensitive comparison; surrounding whitespace
/// is significant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentinel {
    text: String,
    folded: String,
}

impl Sentinel {
    /// Create a sentinel matcher for `text`.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let folded = text.to_lowercase();
        Self { text, folded }
    }

    /// Whether `line` is the sentinel in any casing.
    #[must_use]
    pub fn matches(&self, line: &str) -> bool {
        line.eq_ignore_ascii_case(&self.text) || line.to_lowercase() == self.folded
    }

    /// The sentinel as a message, for forwarding to the peer.
    ///
    /// Returns `None` only if the sentinel text itself is blank or multi-line,
    /// which validated configuration rules out.
    #[must_use]
    pub fn message(&self) -> Option<Message> {
        Message::new(self.text.clone())
    }

    /// The configured sentinel text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl Default for Sentinel {
    fn default() -> Self {
        Self::new("QUIT")
    }
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Reverse a line character by character.
///
/// Operates on Unicode scalar values, so multi-byte characters stay intact.
#[must_use]
pub fn reverse(line: &str) -> String {
    line.chars().rev().collect()
}
