//! Native status codes.
//!
//! Every RV C API call returns a `tibrv_status` integer.  `0` means success;
//! anything else identifies the failure.  [`Status`] wraps that integer so it
//! cannot be confused with other numbers, and carries a built-in text table
//! used when the native `tibrvStatus_GetText` lookup is not available (for
//! example with the simulated bus).

use std::fmt;

/// A native library status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub u32);

impl Status {
    pub const OK: Status = Status(0);
    pub const INIT_FAILURE: Status = Status(1);
    pub const INVALID_TRANSPORT: Status = Status(2);
    pub const INVALID_ARG: Status = Status(3);
    pub const NOT_INITIALIZED: Status = Status(4);
    pub const ARG_CONFLICT: Status = Status(5);
    pub const SERVICE_NOT_FOUND: Status = Status(16);
    pub const NETWORK_NOT_FOUND: Status = Status(17);
    pub const DAEMON_NOT_FOUND: Status = Status(18);
    pub const NO_MEMORY: Status = Status(19);
    pub const INVALID_SUBJECT: Status = Status(20);
    pub const DAEMON_NOT_CONNECTED: Status = Status(21);
    pub const NOT_FOUND: Status = Status(35);
    pub const CONVERSION_FAILED: Status = Status(38);
    pub const INVALID_MSG: Status = Status(42);
    pub const TIMEOUT: Status = Status(50);
    pub const INVALID_EVENT: Status = Status(60);
    pub const INVALID_CALLBACK: Status = Status(61);
    pub const INVALID_QUEUE: Status = Status(62);
    pub const IPM_ONLY: Status = Status(117);

    /// `true` for [`Status::OK`].
    pub fn is_ok(self) -> bool {
        self == Status::OK
    }

    /// Converts a raw return code into `Ok(())` or `Err(status)`.
    pub fn check(code: u32) -> Result<(), Status> {
        let status = Status(code);
        if status.is_ok() {
            Ok(())
        } else {
            Err(status)
        }
    }

    /// Built-in description of the code.
    pub fn description(self) -> &'static str {
        match self {
            Status::OK => "Success",
            Status::INIT_FAILURE => "Initialization failed",
            Status::INVALID_TRANSPORT => "Invalid transport",
            Status::INVALID_ARG => "Invalid argument",
            Status::NOT_INITIALIZED => "Rendezvous not initialized",
            Status::ARG_CONFLICT => "Conflicting arguments",
            Status::SERVICE_NOT_FOUND => "Service not found",
            Status::NETWORK_NOT_FOUND => "Network not found",
            Status::DAEMON_NOT_FOUND => "Daemon not found",
            Status::NO_MEMORY => "Out of memory",
            Status::INVALID_SUBJECT => "Invalid subject",
            Status::DAEMON_NOT_CONNECTED => "Daemon not connected",
            Status::NOT_FOUND => "Not found",
            Status::CONVERSION_FAILED => "Conversion failed",
            Status::INVALID_MSG => "Invalid message",
            Status::TIMEOUT => "Timeout",
            Status::INVALID_EVENT => "Invalid event",
            Status::INVALID_CALLBACK => "Invalid callback",
            Status::INVALID_QUEUE => "Invalid queue",
            Status::IPM_ONLY => "Operation only valid in IPM mode",
            _ => "Unknown status",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (status {})", self.description(), self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_zero_is_ok() {
        assert_eq!(Status::check(0), Ok(()));
    }

    #[test]
    fn test_check_nonzero_is_err() {
        assert_eq!(Status::check(18), Err(Status::DAEMON_NOT_FOUND));
    }

    #[test]
    fn test_unknown_code_has_generic_description() {
        assert_eq!(Status(9999).description(), "Unknown status");
    }

    #[test]
    fn test_display_includes_code() {
        assert_eq!(Status::TIMEOUT.to_string(), "Timeout (status 50)");
    }
}
