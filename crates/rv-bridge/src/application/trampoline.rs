//! The callback trampoline: one native delivery in, one channel message out.
//!
//! The native library invokes the registered [`Handler`] synchronously from
//! inside `timed_dispatch`, on the dispatch thread.  The handler reads three
//! strings off the native message, stamps the current time, and sends the
//! result into the subscription's output channel.
//!
//! # Backpressure
//!
//! The send blocks while the channel is full.  Blocking here stalls the
//! dispatch loop, which in turn lets the native queue back up: a slow
//! consumer throttles delivery instead of losing messages.

use std::sync::Arc;

use rv_core::{Handler, MessageView, ReceivedMessage, Status};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Builds a [`ReceivedMessage`] from a native message.
///
/// A field the library fails to render becomes an empty string so that
/// every delivery still yields exactly one message.
pub fn translate(view: &dyn MessageView) -> ReceivedMessage {
    let send_subject = field_or_empty("send subject", view.send_subject());
    let reply_subject = field_or_empty("reply subject", view.reply_subject())
        .unwrap_or_default();
    let message = field_or_empty("message body", view.body_text());

    ReceivedMessage::now(send_subject, reply_subject, message)
}

fn field_or_empty<T: Default>(field: &str, value: Result<T, Status>) -> T {
    value.unwrap_or_else(|status| {
        warn!("could not read {field} from RV message: {status}");
        T::default()
    })
}

/// Returns a handler that forwards every delivery into `sender`'s channel.
///
/// The handler holds a weak sender: the dispatch thread owns the strong
/// one, so the channel closes when the dispatch loop ends even though the
/// native library may still hold the handler.
///
/// Must be invoked from a thread outside the Tokio runtime, as the
/// dispatch thread is.
pub fn channel_handler(sender: mpsc::WeakSender<ReceivedMessage>) -> Handler {
    Arc::new(move |view: &dyn MessageView| {
        let message = translate(view);
        let Some(sender) = sender.upgrade() else {
            debug!(subject = %message.send_subject, "dispatch loop ended, message dropped");
            return;
        };
        debug!(subject = %message.send_subject, "delivering RV message");
        if sender.blocking_send(message).is_err() {
            debug!("output channel closed, message dropped");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    struct FakeMessage {
        send: Result<String, Status>,
        reply: Result<Option<String>, Status>,
        body: Result<String, Status>,
    }

    impl FakeMessage {
        fn new(send: &str, reply: Option<&str>, body: &str) -> Self {
            Self {
                send: Ok(send.to_string()),
                reply: Ok(reply.map(str::to_string)),
                body: Ok(body.to_string()),
            }
        }
    }

    impl MessageView for FakeMessage {
        fn send_subject(&self) -> Result<String, Status> {
            self.send.clone()
        }
        fn reply_subject(&self) -> Result<Option<String>, Status> {
            self.reply.clone()
        }
        fn body_text(&self) -> Result<String, Status> {
            self.body.clone()
        }
    }

    #[test]
    fn test_translate_maps_fields_and_stamps_time() {
        // Arrange
        let before = Utc::now();
        let view = FakeMessage::new("A", Some("B"), "C");

        // Act
        let msg = translate(&view);
        let after = Utc::now();

        // Assert
        assert_eq!(msg.send_subject, "A");
        assert_eq!(msg.reply_subject, "B");
        assert_eq!(msg.message, "C");
        assert!(msg.timestamp >= before && msg.timestamp <= after);
    }

    #[test]
    fn test_translate_missing_reply_subject_is_empty() {
        let msg = translate(&FakeMessage::new("A", None, "C"));
        assert_eq!(msg.reply_subject, "");
    }

    #[test]
    fn test_translate_unreadable_body_still_produces_message() {
        let view = FakeMessage {
            body: Err(Status::CONVERSION_FAILED),
            ..FakeMessage::new("A", Some("B"), "ignored")
        };

        let msg = translate(&view);

        assert_eq!(msg.send_subject, "A");
        assert_eq!(msg.reply_subject, "B");
        assert_eq!(msg.message, "");
    }

    #[test]
    fn test_translate_unreadable_reply_subject_is_empty() {
        let view = FakeMessage {
            reply: Err(Status::INVALID_MSG),
            ..FakeMessage::new("A", None, "C")
        };
        assert_eq!(translate(&view).reply_subject, "");
    }

    #[test]
    fn test_channel_handler_delivers_in_call_order() {
        // Arrange
        let (tx, mut rx) = mpsc::channel(8);
        let handler = channel_handler(tx.downgrade());

        // Act
        for i in 0..5 {
            handler(&FakeMessage::new(&format!("S.{i}"), None, "body"));
        }

        // Assert
        for i in 0..5 {
            let msg = rx.blocking_recv().expect("message");
            assert_eq!(msg.send_subject, format!("S.{i}"));
        }
        drop(tx);
    }

    #[test]
    fn test_channel_handler_blocks_until_consumer_receives() {
        // Arrange: capacity 1, so the second send must wait for the consumer.
        let (tx, mut rx) = mpsc::channel(1);
        let handler = channel_handler(tx.downgrade());

        // Act
        let producer = std::thread::spawn(move || {
            let _keep_alive = tx;
            handler(&FakeMessage::new("FIRST", None, "1"));
            handler(&FakeMessage::new("SECOND", None, "2"));
        });

        // Assert
        assert_eq!(rx.blocking_recv().unwrap().send_subject, "FIRST");
        assert_eq!(rx.blocking_recv().unwrap().send_subject, "SECOND");
        producer.join().expect("producer thread");
        assert!(rx.blocking_recv().is_none(), "channel closes with the sender");
    }

    #[test]
    fn test_channel_handler_after_sender_dropped_does_not_panic() {
        let (tx, mut rx) = mpsc::channel::<ReceivedMessage>(1);
        let handler = channel_handler(tx.downgrade());
        drop(tx);

        handler(&FakeMessage::new("A", None, "C"));

        assert!(rx.blocking_recv().is_none());
    }

    #[test]
    fn test_channel_handler_after_receiver_dropped_does_not_panic() {
        let (tx, rx) = mpsc::channel::<ReceivedMessage>(1);
        let handler = channel_handler(tx.downgrade());
        drop(rx);

        handler(&FakeMessage::new("A", None, "C"));
    }
}
