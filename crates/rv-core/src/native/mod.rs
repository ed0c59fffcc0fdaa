//! The boundary between RV-Bridge and the native Rendezvous library.
//!
//! # Why a trait? (for beginners)
//!
//! The real library is a closed-source C shared object.  Describing it as
//! the [`BusLibrary`] trait means:
//!
//! - the application layer is written once against the trait;
//! - the production adapter (`rv-bridge`, feature `tibrv`) implements the
//!   trait with `extern "C"` calls;
//! - tests and the default build use an in-process simulation.
//!
//! # Callback flow
//!
//! ```text
//! BusLibrary::timed_dispatch()          (dispatch thread)
//!   └─ native library picks an event off the queue
//!        └─ extern "C" trampoline(event_id, msg_handle, closure)
//!             └─ invoke_closure(closure, &dyn MessageView)
//!                  └─ Handler boxed by create_listener (CallbackSlots)
//! ```
//!
//! In-process implementations that know the event id keep their handlers in
//! a [`ListenerTable`] instead.
//!
//! Handlers run synchronously inside `timed_dispatch` on the calling thread.

use std::sync::Arc;
use std::time::Duration;

mod callback_slots;
mod listener_table;
mod marshal;
mod status;

pub use callback_slots::{invoke_closure, CallbackSlots, PendingSlot};
pub use listener_table::ListenerTable;
pub use marshal::{CStringArray, MarshalError};
pub use status::Status;

// ── Handles ───────────────────────────────────────────────────────────────────

/// Native transport handle (`tibrvTransport`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransportHandle(pub u32);

/// Native dispatch queue handle (`tibrvQueue`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueHandle(pub u32);

impl QueueHandle {
    /// The library's process-wide default queue (`TIBRV_DEFAULT_QUEUE`).
    pub const DEFAULT: QueueHandle = QueueHandle(1);
}

/// Native listener event handle (`tibrvEvent`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u32);

/// How long a single dispatch call may wait for an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DispatchTimeout {
    /// Block until an event arrives (`TIBRV_WAIT_FOREVER`).
    Forever,
    /// Return immediately when the queue is empty (`TIBRV_NO_WAIT`).
    NoWait,
    /// Wait at most this long, then fail with [`Status::TIMEOUT`].
    After(Duration),
}

impl DispatchTimeout {
    /// The timeout in the native `tibrv_f64` seconds convention.
    pub fn as_native_seconds(self) -> f64 {
        match self {
            DispatchTimeout::Forever => -1.0,
            DispatchTimeout::NoWait => 0.0,
            DispatchTimeout::After(d) => d.as_secs_f64(),
        }
    }

    /// `None` for [`Forever`](Self::Forever), otherwise the wait duration.
    pub fn as_duration(self) -> Option<Duration> {
        match self {
            DispatchTimeout::Forever => None,
            DispatchTimeout::NoWait => Some(Duration::ZERO),
            DispatchTimeout::After(d) => Some(d),
        }
    }
}

// ── Message access ────────────────────────────────────────────────────────────

/// Read access to an inbound native message handle.
///
/// Only valid for the duration of the callback that received it.
pub trait MessageView {
    /// Subject the message was published to.
    fn send_subject(&self) -> Result<String, Status>;
    /// Reply subject, `None` when the publisher did not set one.
    fn reply_subject(&self) -> Result<Option<String>, Status>;
    /// Library-specific text rendering of the whole message.
    fn body_text(&self) -> Result<String, Status>;
}

/// A Rust callback registered for one listener.
pub type Handler = Arc<dyn Fn(&dyn MessageView) + Send + Sync>;

// ── Library boundary ──────────────────────────────────────────────────────────

/// The native Rendezvous client library, one method per C entry point used.
pub trait BusLibrary: Send + Sync {
    /// Brings up the in-process machinery (`tibrv_IsIPM` check).
    fn init_machinery(&self) -> Result<(), Status>;

    /// Injects startup flags (`tibrv_SetRVParameters`).
    fn set_parameters(&self, params: &CStringArray) -> Result<(), Status>;

    /// Opens the library (`tibrv_Open`).
    fn open(&self) -> Result<(), Status>;

    /// Closes the library (`tibrv_Close`).
    fn close(&self) -> Result<(), Status>;

    /// Creates a transport (`tibrvTransport_Create`).
    fn create_transport(
        &self,
        service: &str,
        network: &str,
        daemon: &str,
    ) -> Result<TransportHandle, Status>;

    /// Destroys a transport (`tibrvTransport_Destroy`).
    fn destroy_transport(&self, transport: TransportHandle) -> Result<(), Status>;

    /// Creates a listener whose messages are delivered to `handler`
    /// (`tibrvEvent_CreateListener`).
    fn create_listener(
        &self,
        queue: QueueHandle,
        transport: TransportHandle,
        subject: &str,
        handler: Handler,
    ) -> Result<ListenerId, Status>;

    /// Destroys a listener (`tibrvEvent_Destroy`).
    fn destroy_listener(&self, listener: ListenerId) -> Result<(), Status>;

    /// Waits for one event on `queue` and runs its callback
    /// (`tibrvQueue_TimedDispatch`).
    fn timed_dispatch(&self, queue: QueueHandle, timeout: DispatchTimeout) -> Result<(), Status>;

    /// Human-readable text for `status` (`tibrvStatus_GetText`).
    fn status_text(&self, status: Status) -> String {
        status.description().to_string()
    }
}
