//! Error type for the application layer.

use rv_core::Status;
use thiserror::Error;

/// A failure while bringing up or running the bridge.
///
/// The library never terminates the process; the binary decides what is
/// fatal.  Every native failure carries the status and the library's text
/// for it.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to initialise the RV machinery: {text}")]
    MachineryInit { status: Status, text: String },

    #[error("failed to open RV: {text}")]
    SessionOpen { status: Status, text: String },

    #[error("failed to close RV: {text}")]
    SessionClose { status: Status, text: String },

    #[error("the native RV library is already initialised in this process")]
    AlreadyInitialized,

    #[error("no subjects configured")]
    NoSubjects,

    #[error("failed to initialize transport for subjects {subjects:?}: {text}")]
    TransportCreate {
        subjects: Vec<String>,
        status: Status,
        text: String,
    },

    #[error("failed to listen to subject '{subject}': {text}")]
    ListenerCreate {
        subject: String,
        status: Status,
        text: String,
    },

    #[error("failed while reading messages: {text}")]
    Dispatch { status: Status, text: String },

    #[error("could not start the dispatch thread: {0}")]
    Thread(#[source] std::io::Error),

    #[error("the dispatch thread panicked")]
    DispatchPanicked,
}

impl BridgeError {
    /// The native status behind this error, if there is one.
    pub fn status(&self) -> Option<Status> {
        match self {
            BridgeError::MachineryInit { status, .. }
            | BridgeError::SessionOpen { status, .. }
            | BridgeError::SessionClose { status, .. }
            | BridgeError::TransportCreate { status, .. }
            | BridgeError::ListenerCreate { status, .. }
            | BridgeError::Dispatch { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_message_lists_subjects_and_text() {
        let err = BridgeError::TransportCreate {
            subjects: vec!["A.B".to_string()],
            status: Status::DAEMON_NOT_FOUND,
            text: "Daemon not found".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("A.B"));
        assert!(text.contains("Daemon not found"));
        assert_eq!(err.status(), Some(Status::DAEMON_NOT_FOUND));
    }

    #[test]
    fn test_no_subjects_has_no_status() {
        assert_eq!(BridgeError::NoSubjects.status(), None);
    }
}
