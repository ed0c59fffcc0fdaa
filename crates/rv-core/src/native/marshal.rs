//! Conversion of Rust strings into a C `char**` array.
//!
//! `tibrv_SetRVParameters(argc, argv)` takes its startup flags the way a C
//! `main` takes command-line arguments: a count plus a pointer to an array of
//! pointers, each pointing at a NUL-terminated string.
//!
//! # Ownership (for beginners)
//!
//! [`CStringArray`] owns every string it hands out.  The pointer array stays
//! valid for as long as the `CStringArray` value is alive and is released
//! automatically when it is dropped, so the caller never frees anything by
//! hand.  Moving the value is fine: a `CString` keeps its bytes on the heap,
//! so moving the `Vec` does not move the bytes the pointers refer to.

use std::ffi::{c_char, CStr, CString, NulError};
use std::ptr;

use thiserror::Error;

/// Error type for string marshaling.
#[derive(Debug, Error)]
pub enum MarshalError {
    /// A value contained a NUL byte, which C strings cannot represent.
    #[error("value at index {index} contains an interior NUL byte")]
    InteriorNul {
        index: usize,
        #[source]
        source: NulError,
    },
}

/// An owned array of C strings plus the matching `char*` pointer array.
///
/// The pointer array carries one extra trailing null pointer, like `argv`,
/// which is not counted by [`len`](Self::len).
#[derive(Debug)]
pub struct CStringArray {
    strings: Vec<CString>,
    pointers: Vec<*const c_char>,
}

impl CStringArray {
    /// Marshals `values` in order.
    ///
    /// # Errors
    ///
    /// Returns [`MarshalError::InteriorNul`] for the first value containing a
    /// NUL byte.
    pub fn new<I, S>(values: I) -> Result<Self, MarshalError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let strings = values
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                CString::new(value.as_ref())
                    .map_err(|source| MarshalError::InteriorNul { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let pointers = strings
            .iter()
            .map(|s| s.as_ptr())
            .chain(std::iter::once(ptr::null()))
            .collect();

        Ok(Self { strings, pointers })
    }

    /// Number of strings (the `argc` value).
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Length as the native `tibrv_u32`.
    pub fn count(&self) -> u32 {
        u32::try_from(self.strings.len()).unwrap_or(u32::MAX)
    }

    /// Pointer to the first element of the `char*` array.
    ///
    /// Valid while `self` is alive.
    pub fn as_ptr(&self) -> *const *const c_char {
        self.pointers.as_ptr()
    }

    /// Returns the `i`-th string.
    pub fn get(&self, index: usize) -> Option<&CStr> {
        self.strings.get(index).map(CString::as_c_str)
    }

    /// Iterates the strings in order.
    pub fn iter(&self) -> impl Iterator<Item = &CStr> {
        self.strings.iter().map(CString::as_c_str)
    }
}
