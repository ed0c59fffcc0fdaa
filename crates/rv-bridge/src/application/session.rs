//! One-time initialization of the native library.
//!
//! # Order of operations
//!
//! ```text
//! init_machinery()   failure → BridgeError::MachineryInit
//! set_parameters()   failure → warning, library keeps its defaults
//! open()             failure → BridgeError::SessionOpen
//! ```
//!
//! A [`BusSession`] can only be obtained from [`BusSession::initialize`],
//! and [`start_subscriptions`](super::subscribe::start_subscriptions) takes
//! one, so the library is always open before any transport is created.

use std::sync::Arc;

use rv_core::{BusLibrary, CStringArray};
use tracing::{debug, info, warn};

use super::BridgeError;

/// An initialized native library.
pub struct BusSession {
    bus: Arc<dyn BusLibrary>,
    parameters_accepted: bool,
}

impl BusSession {
    /// Initializes `bus` with the given startup flags (e.g.
    /// `["-reliability", "3"]`).
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::MachineryInit`] or [`BridgeError::SessionOpen`]
    /// when the corresponding native call fails.  A rejected parameter list
    /// is only logged.
    pub fn initialize(
        bus: Arc<dyn BusLibrary>,
        parameters: &[String],
    ) -> Result<Self, BridgeError> {
        info!("creating the internal RV machinery");
        bus.init_machinery()
            .map_err(|status| BridgeError::MachineryInit {
                status,
                text: bus.status_text(status),
            })?;

        let parameters_accepted = apply_parameters(bus.as_ref(), parameters);

        info!("opening RV");
        bus.open().map_err(|status| BridgeError::SessionOpen {
            status,
            text: bus.status_text(status),
        })?;

        Ok(Self {
            bus,
            parameters_accepted,
        })
    }

    /// The library this session was opened on.
    pub fn bus(&self) -> &Arc<dyn BusLibrary> {
        &self.bus
    }

    /// `false` when the library rejected the startup parameters.
    pub fn parameters_accepted(&self) -> bool {
        self.parameters_accepted
    }

    /// Closes the native library.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::SessionClose`] if the native close fails.
    pub fn close(self) -> Result<(), BridgeError> {
        info!("closing RV");
        self.bus.close().map_err(|status| BridgeError::SessionClose {
            status,
            text: self.bus.status_text(status),
        })
    }
}

impl std::fmt::Debug for BusSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusSession")
            .field("parameters_accepted", &self.parameters_accepted)
            .finish_non_exhaustive()
    }
}

fn apply_parameters(bus: &dyn BusLibrary, parameters: &[String]) -> bool {
    if parameters.is_empty() {
        debug!("no RV parameters configured");
        return true;
    }

    info!("setting RV parameters: {parameters:?}");
    let array = match CStringArray::new(parameters) {
        Ok(array) => array,
        Err(e) => {
            warn!("failed to set RV parameters: {e}; continuing with library defaults");
            return false;
        }
    };

    match bus.set_parameters(&array) {
        Ok(()) => true,
        Err(status) => {
            warn!(
                "failed to set RV parameters: {}; continuing with library defaults",
                bus.status_text(status)
            );
            false
        }
    }
}
