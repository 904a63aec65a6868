//! Errors for fallible entry points.

use core::fmt;

use traits::{InvalidKeyLength, InvalidOutputLength};

/// Parameter validation error for entry points with more than one failure
/// mode (e.g. slice-keyed extendable output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum HashError {
  /// The supplied key was not exactly 32 bytes.
  KeyLength(InvalidKeyLength),
  /// The requested output length is unsupported (empty output buffer).
  OutputLength(InvalidOutputLength),
}

impl From<InvalidKeyLength> for HashError {
  #[inline]
  fn from(err: InvalidKeyLength) -> Self {
    Self::KeyLength(err)
  }
}

impl From<InvalidOutputLength> for HashError {
  #[inline]
  fn from(err: InvalidOutputLength) -> Self {
    Self::OutputLength(err)
  }
}

impl fmt::Display for HashError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::KeyLength(err) => err.fmt(f),
      Self::OutputLength(err) => err.fmt(f),
    }
  }
}

impl core::error::Error for HashError {
  fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
    match self {
      Self::KeyLength(err) => Some(err),
      Self::OutputLength(err) => Some(err),
    }
  }
}

#[cfg(test)]
mod tests {
  extern crate alloc;

  use alloc::string::ToString;

  use super::*;

  #[test]
  fn display_delegates_to_inner() {
    let err: HashError = InvalidKeyLength::new().into();
    assert_eq!(err.to_string(), "invalid key length");

    let err: HashError = InvalidOutputLength::new().into();
    assert_eq!(err.to_string(), "invalid output length");
  }

  #[test]
  fn source_is_inner_error() {
    use core::error::Error;

    let err: HashError = InvalidKeyLength::new().into();
    assert!(err.source().is_some());
  }
}
