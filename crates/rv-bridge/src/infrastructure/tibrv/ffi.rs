//! Raw declarations for the subset of the Rendezvous C API used here.
//!
//! Mirrors `tibrv.h`.  The library itself is linked by `build.rs`.

#![allow(non_camel_case_types)]

use std::ffi::{c_char, c_int, c_void};

pub type tibrv_status = c_int;
pub type tibrv_u32 = u32;
pub type tibrv_f64 = f64;
pub type tibrv_bool = c_int;

pub type tibrvEvent = tibrv_u32;
pub type tibrvQueue = tibrv_u32;
pub type tibrvTransport = tibrv_u32;

/// Opaque message handle (`struct __tibrvMsgStruct*`).
#[repr(C)]
pub struct tibrvMsgStruct {
    _private: [u8; 0],
}
pub type tibrvMsg = *mut tibrvMsgStruct;

pub type tibrvEventCallback =
    unsafe extern "C" fn(event: tibrvEvent, message: tibrvMsg, closure: *mut c_void);

pub const TIBRV_TRUE: tibrv_bool = 1;

extern "C" {
    pub fn tibrv_IsIPM() -> tibrv_bool;
    pub fn tibrv_SetRVParameters(argc: tibrv_u32, argv: *const *const c_char) -> tibrv_status;
    pub fn tibrv_Open() -> tibrv_status;
    pub fn tibrv_Close() -> tibrv_status;

    pub fn tibrvTransport_Create(
        transport: *mut tibrvTransport,
        service: *const c_char,
        network: *const c_char,
        daemon: *const c_char,
    ) -> tibrv_status;
    pub fn tibrvTransport_Destroy(transport: tibrvTransport) -> tibrv_status;

    pub fn tibrvEvent_CreateListener(
        event: *mut tibrvEvent,
        queue: tibrvQueue,
        callback: tibrvEventCallback,
        transport: tibrvTransport,
        subject: *const c_char,
        closure: *const c_void,
    ) -> tibrv_status;
    pub fn tibrvEvent_Destroy(event: tibrvEvent) -> tibrv_status;

    pub fn tibrvQueue_TimedDispatch(queue: tibrvQueue, timeout: tibrv_f64) -> tibrv_status;

    pub fn tibrvMsg_GetSendSubject(message: tibrvMsg, subject: *mut *const c_char)
        -> tibrv_status;
    pub fn tibrvMsg_GetReplySubject(
        message: tibrvMsg,
        subject: *mut *const c_char,
    ) -> tibrv_status;
    pub fn tibrvMsg_ConvertToString(message: tibrvMsg, string: *mut *const c_char)
        -> tibrv_status;

    pub fn tibrvStatus_GetText(status: tibrv_status) -> *const c_char;
}
