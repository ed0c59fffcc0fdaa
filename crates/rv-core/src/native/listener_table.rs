//! Capability table mapping listener ids to Rust handlers.
//!
//! Used by bus implementations that deliver by event id, such as the
//! in-process simulation.  The native adapter passes each listener its own
//! handler slot instead (see [`CallbackSlots`](super::CallbackSlots)).

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{Handler, ListenerId, MessageView};

/// Thread-safe `ListenerId → Handler` map.
#[derive(Default)]
pub struct ListenerTable {
    handlers: RwLock<HashMap<ListenerId, Handler>>,
}

impl ListenerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `id`, returning the handler it replaced.
    pub fn register(&self, id: ListenerId, handler: Handler) -> Option<Handler> {
        self.handlers.write().insert(id, handler)
    }

    /// Removes the handler for `id`.
    pub fn remove(&self, id: ListenerId) -> Option<Handler> {
        self.handlers.write().remove(&id)
    }

    /// Invokes the handler registered for `id`.
    ///
    /// Returns `false` when no handler is registered.  The lock is released
    /// before the handler runs, since handlers may block on a full channel.
    pub fn dispatch(&self, id: ListenerId, message: &dyn MessageView) -> bool {
        let handler = self.handlers.read().get(&id).cloned();
        match handler {
            Some(handler) => {
                handler(message);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.handlers.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}

impl std::fmt::Debug for ListenerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.handlers.read().keys().copied().collect();
        ids.sort_by_key(|id| id.0);
        f.debug_struct("ListenerTable").field("listeners", &ids).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::native::Status;

    struct FixedMessage;

    impl MessageView for FixedMessage {
        fn send_subject(&self) -> Result<String, Status> {
            Ok("A".to_string())
        }
        fn reply_subject(&self) -> Result<Option<String>, Status> {
            Ok(None)
        }
        fn body_text(&self) -> Result<String, Status> {
            Ok("{}".to_string())
        }
    }

    fn counting_handler(counter: Arc<AtomicUsize>) -> Handler {
        Arc::new(move |_msg: &dyn MessageView| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_dispatch_invokes_registered_handler() {
        // Arrange
        let table = ListenerTable::new();
        let counter = Arc::new(AtomicUsize::new(0));
        table.register(ListenerId(7), counting_handler(Arc::clone(&counter)));

        // Act
        let found = table.dispatch(ListenerId(7), &FixedMessage);

        // Assert
        assert!(found);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatch_unknown_id_returns_false() {
        let table = ListenerTable::new();
        assert!(!table.dispatch(ListenerId(1), &FixedMessage));
    }

    #[test]
    fn test_remove_stops_delivery() {
        let table = ListenerTable::new();
        let counter = Arc::new(AtomicUsize::new(0));
        table.register(ListenerId(3), counting_handler(Arc::clone(&counter)));

        assert!(table.remove(ListenerId(3)).is_some());

        assert!(!table.dispatch(ListenerId(3), &FixedMessage));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn test_register_same_id_replaces_handler() {
        let table = ListenerTable::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        assert!(table
            .register(ListenerId(1), counting_handler(Arc::clone(&first)))
            .is_none());
        assert!(table
            .register(ListenerId(1), counting_handler(Arc::clone(&second)))
            .is_some());
        table.dispatch(ListenerId(1), &FixedMessage);

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_handler_may_reenter_table() {
        // A handler that inspects the table must not deadlock on the read lock.
        let table = Arc::new(ListenerTable::new());
        let inner = Arc::clone(&table);
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        table.register(
            ListenerId(9),
            Arc::new(move |_msg: &dyn MessageView| {
                if inner.contains(ListenerId(9)) {
                    seen_clone.fetch_add(1, Ordering::SeqCst);
                }
            }),
        );

        table.dispatch(ListenerId(9), &FixedMessage);

        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
