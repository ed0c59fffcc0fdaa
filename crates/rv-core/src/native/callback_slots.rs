//! Per-listener handler slots used as native closure arguments.
//!
//! The native library hands every callback the opaque closure pointer that
//! was given to `tibrvEvent_CreateListener`.  Giving each listener the
//! address of its own boxed [`Handler`] means a callback never has to look
//! anything up, so a message delivered while `create_listener` is still
//! returning (another subscription may already be dispatching the shared
//! queue) reaches its handler.
//!
//! ```text
//! PendingSlot::new(handler) ── closure() ──▶ tibrvEvent_CreateListener
//!        │                                        │ event id
//!        └──────────── CallbackSlots::commit(id) ◀┘
//!                      CallbackSlots::retire(id)   after tibrvEvent_Destroy
//! ```

use std::collections::HashMap;
use std::ffi::c_void;

use parking_lot::Mutex;

use super::{Handler, ListenerId, MessageView};

/// A handler at a fixed heap address, not yet tied to a listener id.
pub struct PendingSlot(Box<Handler>);

impl PendingSlot {
    pub fn new(handler: Handler) -> Self {
        Self(Box::new(handler))
    }

    /// The address to pass as the native closure argument.
    ///
    /// Stays valid while this slot, or the [`CallbackSlots`] it is committed
    /// to, is alive.
    pub fn closure(&self) -> *const c_void {
        let handler: &Handler = &self.0;
        (handler as *const Handler).cast()
    }
}

/// Owner of every handler slot handed to the native library.
#[derive(Default)]
pub struct CallbackSlots {
    live: Mutex<HashMap<ListenerId, Box<Handler>>>,
    /// Slots of destroyed listeners.  A callback may still be running on the
    /// dispatch thread, so their addresses stay valid until `self` drops.
    retired: Mutex<Vec<Box<Handler>>>,
}

impl CallbackSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ties `slot` to the listener the library created with its closure.
    pub fn commit(&self, id: ListenerId, slot: PendingSlot) {
        if let Some(previous) = self.live.lock().insert(id, slot.0) {
            self.retired.lock().push(previous);
        }
    }

    /// Marks the slot of a destroyed listener as retired.
    ///
    /// Returns `false` when `id` has no live slot.
    pub fn retire(&self, id: ListenerId) -> bool {
        match self.live.lock().remove(&id) {
            Some(slot) => {
                self.retired.lock().push(slot);
                true
            }
            None => false,
        }
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }
}

impl std::fmt::Debug for CallbackSlots {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackSlots")
            .field("live", &self.live.lock().len())
            .field("retired", &self.retired.lock().len())
            .finish()
    }
}

/// Runs the handler behind a native closure argument.
///
/// # Safety
///
/// `closure` must come from [`PendingSlot::closure`] on a slot that is still
/// alive, either on its own or committed to a live [`CallbackSlots`].
pub unsafe fn invoke_closure(closure: *const c_void, message: &dyn MessageView) {
    // SAFETY: guaranteed by the caller; the slot never moves its handler.
    let handler = unsafe { &*closure.cast::<Handler>() };
    handler(message);
}
