//! Bus parameters: the service/network/daemon triple plus the subject list.
//!
//! # What do the three identifiers mean? (for beginners)
//!
//! An RV *transport* is configured by three strings:
//!
//! | Field     | Example            | Meaning                                   |
//! |-----------|--------------------|-------------------------------------------|
//! | `service` | `"7500"`           | UDP service (port) the bus traffic uses   |
//! | `network` | `";239.1.1.1"`     | Interface and multicast group             |
//! | `daemon`  | `"tcp:7500"`       | Where the local `rvd` daemon listens      |
//!
//! An empty string asks the native library for its built-in default, which
//! is why none of the fields is validated here.

use serde::{Deserialize, Serialize};

/// Connection and subscription parameters for one transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusParams {
    /// RV service identifier.
    #[serde(default)]
    pub service: String,
    /// RV network identifier.
    #[serde(default)]
    pub network: String,
    /// RV daemon address.
    #[serde(default)]
    pub daemon: String,
    /// Subject patterns to listen to, subscribed in this order.
    #[serde(default)]
    pub subjects: Vec<String>,
}

impl BusParams {
    /// Creates parameters for the given transport triple with no subjects.
    pub fn new(
        service: impl Into<String>,
        network: impl Into<String>,
        daemon: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            network: network.into(),
            daemon: daemon.into(),
            subjects: Vec::new(),
        }
    }

    /// Appends a subject pattern and returns `self` for chaining.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subjects.push(subject.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_subject_preserves_insertion_order() {
        let params = BusParams::new("7500", ";239.1.1.1", "tcp:7500")
            .with_subject("B.TWO")
            .with_subject("A.ONE");

        assert_eq!(params.subjects, vec!["B.TWO", "A.ONE"]);
    }

    #[test]
    fn test_default_params_are_library_defaults() {
        let params = BusParams::default();
        assert!(params.service.is_empty());
        assert!(params.network.is_empty());
        assert!(params.daemon.is_empty());
        assert!(params.subjects.is_empty());
    }
}
