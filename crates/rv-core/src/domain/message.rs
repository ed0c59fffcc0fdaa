//! The message value handed from the dispatch loop to the application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One inbound bus message.
///
/// Built by the callback trampoline at the moment the native library
/// dispatches the message, then moved into the output channel.  Nothing
/// mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedMessage {
    /// Wall-clock time the trampoline ran.
    pub timestamp: DateTime<Utc>,
    /// Subject the publisher sent to.
    pub send_subject: String,
    /// Reply subject set by the publisher; empty when there is none.
    pub reply_subject: String,
    /// Text rendering of the message body produced by the native library.
    pub message: String,
}

impl ReceivedMessage {
    /// Builds a message stamped with the current time.
    pub fn now(
        send_subject: impl Into<String>,
        reply_subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            send_subject: send_subject.into(),
            reply_subject: reply_subject.into(),
            message: message.into(),
        }
    }

    /// `true` when the publisher expects a reply.
    pub fn has_reply_subject(&self) -> bool {
        !self.reply_subject.is_empty()
    }
}
