//! Error types for hashing operations.
//!
//! Minimal parameter-validation errors. Individual crates may define
//! additional errors as needed.

use core::fmt;

/// A slice key did not have the required length.
///
/// Returned by slice-keyed entry points when the supplied key is not exactly
/// the algorithm's key size. Fixed-size (`&[u8; N]`) entry points cannot fail
/// and do not use this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub struct InvalidKeyLength;

impl InvalidKeyLength {
  /// Create a new key-length error.
  #[inline]
  #[must_use]
  pub const fn new() -> Self {
    Self
  }
}

impl Default for InvalidKeyLength {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Display for InvalidKeyLength {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("invalid key length")
  }
}

impl core::error::Error for InvalidKeyLength {}

/// An unsupported output length was requested.
///
/// Returned when the caller asks for zero output bytes. Extendable-output
/// functions place no upper bound on the output length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub struct InvalidOutputLength;

impl InvalidOutputLength {
  /// Create a new output-length error.
  #[inline]
  #[must_use]
  pub const fn new() -> Self {
    Self
  }
}

impl Default for InvalidOutputLength {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Display for InvalidOutputLength {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("invalid output length")
  }
}

impl core::error::Error for InvalidOutputLength {}

#[cfg(test)]
mod tests {
  extern crate alloc;

  use alloc::string::ToString;

  use super::*;

  #[test]
  fn display_messages() {
    assert_eq!(InvalidKeyLength::new().to_string(), "invalid key length");
    assert_eq!(InvalidOutputLength::new().to_string(), "invalid output length");
  }

  #[test]
  fn equality_and_copy() {
    let a = InvalidKeyLength::new();
    let b = a;
    assert_eq!(a, b);

    let c = InvalidOutputLength::new();
    let d = c;
    assert_eq!(c, d);
  }

  #[test]
  fn default_impls() {
    assert_eq!(InvalidKeyLength::default(), InvalidKeyLength::new());
    assert_eq!(InvalidOutputLength::default(), InvalidOutputLength::new());
  }

  #[test]
  fn error_trait_impls() {
    use core::error::Error;

    assert!(InvalidKeyLength::new().source().is_none());
    assert!(InvalidOutputLength::new().source().is_none());
  }

  #[test]
  fn zero_sized() {
    assert_eq!(core::mem::size_of::<InvalidKeyLength>(), 0);
    assert_eq!(core::mem::size_of::<InvalidOutputLength>(), 0);
  }
}
