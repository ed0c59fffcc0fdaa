//! Application layer for rv-bridge.
//!
//! Everything here is written against the [`rv_core::BusLibrary`] trait and
//! never calls the native library directly, so the same code runs against
//! the real library and against the simulated bus used in tests.
//!
//! # Sub-modules
//!
//! - **`session`**    – one-time library initialization.
//! - **`subscribe`**  – transport + listeners + the dispatch loop thread.
//! - **`trampoline`** – turns one native delivery into one channel message.
//! - **`error`**      – [`BridgeError`], returned instead of exiting.

pub mod error;
pub mod session;
pub mod subscribe;
pub mod trampoline;

pub use error::BridgeError;
pub use session::BusSession;
pub use subscribe::{start_subscriptions, DispatchOptions, StopHandle, Subscription};
