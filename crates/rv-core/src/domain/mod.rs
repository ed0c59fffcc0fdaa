//! Domain types for RV-Bridge.
//!
//! Plain data with no dependency on the native library or on any runtime:
//!
//! - [`params::BusParams`] – where to connect and what to listen to.
//! - [`message::ReceivedMessage`] – one inbound bus message as seen by the
//!   application.

pub mod message;
pub mod params;
