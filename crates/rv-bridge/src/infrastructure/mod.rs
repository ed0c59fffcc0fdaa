//! Infrastructure layer for rv-bridge.
//!
//! Contains the adapters behind [`rv_core::BusLibrary`] (the native library
//! and an in-process simulation), configuration file storage, and logging
//! setup.
//!
//! **Dependency rule**: this layer may depend on `application` and `rv_core`,
//! but MUST NOT be imported by non-test code in the `application` layer.

pub mod logging;
pub mod simulated;
pub mod storage;

#[cfg(feature = "tibrv")]
pub mod tibrv;
