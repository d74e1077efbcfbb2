//! Supporting type used in error structures.

use std::fmt;

#[derive(Debug, PartialEq, Eq, Clone)]
/// Error payload indicating an expected value was not found.
pub struct Mismatch<T> {
    /// Value expected.
    pub expected: T,
    /// Value found.
    pub found: Option<T>,
}

impl<T> Mismatch<T> {
    /// Creates a mismatch with both `expected` and `found` values.
    pub fn new(expected: T, found: T) -> Self {
        Self {
            expected,
            found: Some(found),
        }
    }

    /// Creates a mismatch when the `found` value is missing.
    pub fn expected(expected: T) -> Self {
        Self {
            expected,
            found: None,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Mismatch<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_fmt(format_args!("expected {}", self.expected))?;
        match &self.found {
            Some(found) => f.write_fmt(format_args!(", found {found}")),
            None => Ok(()),
        }
    }
}
