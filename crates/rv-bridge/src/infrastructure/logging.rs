//! `tracing` subscriber setup for the binary.
//!
//! `RUST_LOG` wins when it is set; otherwise the configured level applies.
//! Log lines go to stderr so that stdout carries only received messages.

use tracing_subscriber::EnvFilter;

/// Picks the filter directive: `RUST_LOG` if present and non-empty, else
/// `configured`.
pub fn filter_directive(rust_log: Option<String>, configured: &str) -> String {
    match rust_log {
        Some(value) if !value.trim().is_empty() => value,
        _ => configured.to_string(),
    }
}

/// Installs the global fmt subscriber.  Call once, from `main`.
pub fn init_logging(configured_level: &str) {
    let directive = filter_directive(std::env::var("RUST_LOG").ok(), configured_level);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
