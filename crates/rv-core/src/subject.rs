//! Rendezvous subject names and wildcard matching.
//!
//! A subject is a dot-separated list of elements, e.g. `ORDERS.EU.NEW`.
//! Listeners may use two wildcards, each standing for whole elements only:
//!
//! | Pattern        | Matches                              | Does not match      |
//! |----------------|--------------------------------------|---------------------|
//! | `ORDERS.*.NEW` | `ORDERS.EU.NEW`                      | `ORDERS.NEW`        |
//! | `ORDERS.>`     | `ORDERS.EU`, `ORDERS.EU.NEW`         | `ORDERS`            |
//!
//! `>` is only allowed as the last element.  Published subjects never
//! contain wildcards; that distinction is left to the native library.

use thiserror::Error;

/// Longest subject the bus accepts, in bytes.
pub const MAX_SUBJECT_LEN: usize = 255;

/// Error type for subject validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubjectError {
    #[error("subject is empty")]
    Empty,
    #[error("subject is {len} bytes long, limit is {MAX_SUBJECT_LEN}")]
    TooLong { len: usize },
    #[error("subject '{subject}' has an empty element")]
    EmptyElement { subject: String },
    #[error("subject '{subject}' uses a wildcard inside an element")]
    PartialWildcard { subject: String },
    #[error("subject '{subject}' has '>' before the last element")]
    TrailingWildcardNotLast { subject: String },
}

/// Checks that `subject` is a well-formed subject or listener pattern.
///
/// # Errors
///
/// Returns the first [`SubjectError`] found.
pub fn validate_subject(subject: &str) -> Result<(), SubjectError> {
    if subject.is_empty() {
        return Err(SubjectError::Empty);
    }
    if subject.len() > MAX_SUBJECT_LEN {
        return Err(SubjectError::TooLong { len: subject.len() });
    }

    let elements: Vec<&str> = subject.split('.').collect();
    let last = elements.len() - 1;
    for (i, element) in elements.iter().enumerate() {
        if element.is_empty() {
            return Err(SubjectError::EmptyElement {
                subject: subject.to_string(),
            });
        }
        let has_wildcard = element.contains('*') || element.contains('>');
        if has_wildcard && *element != "*" && *element != ">" {
            return Err(SubjectError::PartialWildcard {
                subject: subject.to_string(),
            });
        }
        if *element == ">" && i != last {
            return Err(SubjectError::TrailingWildcardNotLast {
                subject: subject.to_string(),
            });
        }
    }
    Ok(())
}

/// `true` when the published `subject` is selected by listener `pattern`.
pub fn subject_matches(pattern: &str, subject: &str) -> bool {
    let mut pattern_elems = pattern.split('.');
    let mut subject_elems = subject.split('.');

    loop {
        match (pattern_elems.next(), subject_elems.next()) {
            (Some(">"), Some(_)) => return true,
            (Some("*"), Some(_)) => continue,
            (Some(p), Some(s)) if p == s => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}
