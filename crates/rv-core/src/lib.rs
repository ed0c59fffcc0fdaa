//! # rv-core
//!
//! Shared types for RV-Bridge: the bus parameters handed to the subscription
//! starter, the message value delivered to the application, the subject
//! rules of the Rendezvous bus, and the boundary between Rust code and the
//! native Rendezvous client library.
//!
//! This crate performs no I/O of its own.  Everything that talks to the
//! native library or to the file system lives in `rv-bridge`.
//!
//! # Architecture overview (for beginners)
//!
//! TIBCO Rendezvous ("RV") is a message bus.  Publishers send messages to a
//! *subject* such as `ORDERS.NEW`; every process that has a *listener* on a
//! matching subject receives a copy.  The heavy lifting (reliable multicast,
//! talking to the local `rvd` daemon, queueing) is done by a closed-source C
//! library.  RV-Bridge only has to:
//!
//! - **`domain`** – describe what the caller configures ([`BusParams`]) and
//!   what it gets back ([`ReceivedMessage`]).
//!
//! - **`native`** – describe the C library as a Rust trait
//!   ([`BusLibrary`]), convert Rust strings into the `char**` array the
//!   library expects ([`CStringArray`]), and route native callbacks to Rust
//!   handlers ([`CallbackSlots`], [`ListenerTable`]).
//!
//! - **`subject`** – validate subject patterns and evaluate RV wildcards.

pub mod domain;
pub mod native;
pub mod subject;

pub use domain::message::ReceivedMessage;
pub use domain::params::BusParams;
pub use native::{
    invoke_closure, BusLibrary, CStringArray, CallbackSlots, DispatchTimeout, Handler, ListenerId,
    ListenerTable, MarshalError, MessageView, PendingSlot, QueueHandle, Status, TransportHandle,
};
pub use subject::{subject_matches, validate_subject, SubjectError};
