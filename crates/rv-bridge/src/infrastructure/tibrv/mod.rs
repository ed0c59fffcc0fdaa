//! Native Rendezvous adapter.
//!
//! Implements [`BusLibrary`] on top of the C API declared in [`ffi`].  Only
//! compiled with the `tibrv` feature, which also makes `build.rs` link
//! `libtibrv64` (`tibrv.lib` on Windows).
//!
//! # Callbacks
//!
//! Every listener is created with the same `extern "C"` function,
//! [`on_native_message`].  Its closure argument is the address of that
//! listener's own boxed handler ([`PendingSlot`]), so a callback that fires
//! before `create_listener` returns still finds its handler.
//!
//! # Safety
//!
//! This module uses `unsafe` code exclusively for the FFI calls.
//! All `unsafe` blocks are annotated with `// SAFETY:` comments.

pub mod ffi;

use std::ffi::{c_char, c_void, CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};

use rv_core::{
    invoke_closure, BusLibrary, CStringArray, CallbackSlots, DispatchTimeout, Handler, ListenerId,
    MessageView, PendingSlot, QueueHandle, Status, TransportHandle,
};
use tracing::{debug, error, warn};

use crate::application::BridgeError;

/// Set once a [`NativeBus`] exists; the native library state is per process.
static CREATED: AtomicBool = AtomicBool::new(false);

/// The native Rendezvous library.
pub struct NativeBus {
    /// Owns the handler behind every closure handed to the library.
    slots: CallbackSlots,
}

impl NativeBus {
    /// Creates the process's only adapter.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::AlreadyInitialized`] on a second call.
    pub fn new() -> Result<Self, BridgeError> {
        if CREATED.swap(true, Ordering::SeqCst) {
            return Err(BridgeError::AlreadyInitialized);
        }
        Ok(Self {
            slots: CallbackSlots::new(),
        })
    }
}

fn check(code: ffi::tibrv_status) -> Result<(), Status> {
    Status::check(code as u32)
}

/// `None` for an empty string, which the library reads as "use the default".
fn optional_c_string(value: &str) -> Result<Option<CString>, Status> {
    if value.is_empty() {
        return Ok(None);
    }
    CString::new(value).map(Some).map_err(|_| Status::INVALID_ARG)
}

fn as_ptr_or_null(value: &Option<CString>) -> *const c_char {
    value.as_ref().map_or(ptr::null(), |s| s.as_ptr())
}

impl BusLibrary for NativeBus {
    fn init_machinery(&self) -> Result<(), Status> {
        // SAFETY: no arguments; only reports how the library was linked.
        let ipm = unsafe { ffi::tibrv_IsIPM() } == ffi::TIBRV_TRUE;
        debug!(ipm, "RV library mode");
        Ok(())
    }

    fn set_parameters(&self, params: &CStringArray) -> Result<(), Status> {
        // SAFETY: `params` owns `count()` valid C strings and outlives the call.
        check(unsafe { ffi::tibrv_SetRVParameters(params.count(), params.as_ptr()) })
    }

    fn open(&self) -> Result<(), Status> {
        // SAFETY: no arguments.
        check(unsafe { ffi::tibrv_Open() })
    }

    fn close(&self) -> Result<(), Status> {
        // SAFETY: no arguments.
        check(unsafe { ffi::tibrv_Close() })
    }

    fn create_transport(
        &self,
        service: &str,
        network: &str,
        daemon: &str,
    ) -> Result<TransportHandle, Status> {
        let service = optional_c_string(service)?;
        let network = optional_c_string(network)?;
        let daemon = optional_c_string(daemon)?;
        let mut handle: ffi::tibrvTransport = 0;

        // SAFETY: `handle` is a valid out-pointer; the strings are either null
        // or NUL-terminated and live until the call returns.
        check(unsafe {
            ffi::tibrvTransport_Create(
                &mut handle,
                as_ptr_or_null(&service),
                as_ptr_or_null(&network),
                as_ptr_or_null(&daemon),
            )
        })?;
        Ok(TransportHandle(handle))
    }

    fn destroy_transport(&self, transport: TransportHandle) -> Result<(), Status> {
        // SAFETY: plain handle argument.
        check(unsafe { ffi::tibrvTransport_Destroy(transport.0) })
    }

    fn create_listener(
        &self,
        queue: QueueHandle,
        transport: TransportHandle,
        subject: &str,
        handler: Handler,
    ) -> Result<ListenerId, Status> {
        let subject = CString::new(subject).map_err(|_| Status::INVALID_SUBJECT)?;
        let slot = PendingSlot::new(handler);
        let mut event: ffi::tibrvEvent = 0;

        // SAFETY: `event` is a valid out-pointer, `subject` is NUL-terminated,
        // and the closure points at `slot`'s handler, which lives here until
        // it moves into `self.slots` and is never freed before `self` drops.
        check(unsafe {
            ffi::tibrvEvent_CreateListener(
                &mut event,
                queue.0,
                on_native_message,
                transport.0,
                subject.as_ptr(),
                slot.closure(),
            )
        })?;

        let id = ListenerId(event);
        self.slots.commit(id, slot);
        Ok(id)
    }

    fn destroy_listener(&self, listener: ListenerId) -> Result<(), Status> {
        // SAFETY: plain handle argument.
        check(unsafe { ffi::tibrvEvent_Destroy(listener.0) })?;
        if !self.slots.retire(listener) {
            warn!(event = listener.0, "RV listener had no handler slot");
        }
        Ok(())
    }

    fn timed_dispatch(&self, queue: QueueHandle, timeout: DispatchTimeout) -> Result<(), Status> {
        // SAFETY: plain arguments; callbacks run on this thread before return.
        check(unsafe { ffi::tibrvQueue_TimedDispatch(queue.0, timeout.as_native_seconds()) })
    }

    fn status_text(&self, status: Status) -> String {
        // SAFETY: returns a pointer to a static string owned by the library.
        let text = unsafe { ffi::tibrvStatus_GetText(status.0 as ffi::tibrv_status) };
        if text.is_null() {
            return status.description().to_string();
        }
        // SAFETY: non-null, NUL-terminated, static.
        unsafe { CStr::from_ptr(text) }.to_string_lossy().into_owned()
    }
}

/// A native message handle, valid for the duration of one callback.
struct NativeMessage {
    handle: ffi::tibrvMsg,
}

impl NativeMessage {
    /// Calls a `tibrvMsg_Get*` style accessor and copies the string out.
    fn read(
        &self,
        accessor: unsafe extern "C" fn(ffi::tibrvMsg, *mut *const c_char) -> ffi::tibrv_status,
    ) -> Result<Option<String>, Status> {
        let mut out: *const c_char = ptr::null();
        // SAFETY: `handle` is live for this callback and `out` is a valid
        // out-pointer.
        check(unsafe { accessor(self.handle, &mut out) })?;
        if out.is_null() {
            return Ok(None);
        }
        // SAFETY: the library returned a NUL-terminated string owned by the
        // message; it is copied before the callback returns.
        Ok(Some(unsafe { CStr::from_ptr(out) }.to_string_lossy().into_owned()))
    }
}

impl MessageView for NativeMessage {
    fn send_subject(&self) -> Result<String, Status> {
        Ok(self.read(ffi::tibrvMsg_GetSendSubject)?.unwrap_or_default())
    }

    fn reply_subject(&self) -> Result<Option<String>, Status> {
        match self.read(ffi::tibrvMsg_GetReplySubject) {
            Err(Status::NOT_FOUND) => Ok(None),
            other => other,
        }
    }

    fn body_text(&self) -> Result<String, Status> {
        Ok(self.read(ffi::tibrvMsg_ConvertToString)?.unwrap_or_default())
    }
}

/// The single native entry point for every listener.
///
/// # Safety
///
/// Called by the library from inside `tibrvQueue_TimedDispatch` with the
/// closure pointer given to `tibrvEvent_CreateListener`.
unsafe extern "C" fn on_native_message(
    event: ffi::tibrvEvent,
    message: ffi::tibrvMsg,
    closure: *mut c_void,
) {
    if closure.is_null() {
        warn!(event, "RV message without a handler slot");
        return;
    }
    let view = NativeMessage { handle: message };

    // Unwinding across the C boundary is undefined behaviour.
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        // SAFETY: every listener is created with `PendingSlot::closure`, and
        // the adapter keeps that slot alive for its own lifetime.
        unsafe { invoke_closure(closure.cast_const(), &view) }
    }));
    if outcome.is_err() {
        error!(event, "RV listener handler panicked");
    }
}
