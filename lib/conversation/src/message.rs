//! Message types for conversations.

use serde::{Deserialize, Serialize};

/// A message embedded in a conversation.
///
/// All fields are free-form; `sender` is not checked against the
/// conversation's participants and `timestamp` is stored as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message body.
    pub text: String,
    /// Display name of the sender.
    pub sender: String,
    /// When the message was sent, as supplied by the client.
    pub timestamp: String,
}

impl Message {
    /// Creates a new message.
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        sender: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            sender: sender.into(),
            timestamp: timestamp.into(),
        }
    }
}
