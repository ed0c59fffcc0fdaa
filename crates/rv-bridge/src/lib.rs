//! rv-bridge library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does rv-bridge do? (for beginners)
//!
//! The native Rendezvous library delivers messages by calling a C function
//! pointer from inside its own dispatch call.  rv-bridge turns that into an
//! ordinary Rust channel:
//!
//! 1. [`application::session::BusSession::initialize`] brings up the
//!    library once per process.
//! 2. [`application::subscribe::start_subscriptions`] creates a transport
//!    and one listener per subject, then runs the dispatch loop on its own
//!    thread.
//! 3. Each delivery runs the [`application::trampoline`], which builds a
//!    [`rv_core::ReceivedMessage`] and pushes it into the channel returned
//!    to the caller.

/// Application layer: initializer, starter, trampoline.
pub mod application;

/// Infrastructure layer: native adapter, simulated bus, config, logging.
pub mod infrastructure;
