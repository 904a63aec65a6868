//! CPU capability representation.
//!
//! [`Caps`] is a compact bitset of available ISA features. Each architecture
//! uses its own region of the bitset, so a single type covers every target
//! with a uniform API.

/// Feature bitset.
///
/// Kernels declare required capabilities as `Caps` values; dispatch checks
/// containment with [`Caps::has`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Caps(u32);

impl Caps {
  /// Empty set (portable code only).
  pub const NONE: Self = Self(0);

  /// Create a capability set with a single feature bit set.
  #[inline]
  #[must_use]
  pub const fn from_bit(bit: u32) -> Self {
    Self(1 << bit)
  }

  /// Check if all features in `other` are present in `self`.
  #[inline]
  #[must_use]
  pub const fn has(self, other: Self) -> bool {
    (self.0 & other.0) == other.0
  }

  /// Union of two capability sets.
  #[inline]
  #[must_use]
  pub const fn union(self, other: Self) -> Self {
    Self(self.0 | other.0)
  }

  /// Check if the set is empty.
  #[inline]
  #[must_use]
  pub const fn is_empty(self) -> bool {
    self.0 == 0
  }
}

impl core::ops::BitOr for Caps {
  type Output = Self;

  #[inline]
  fn bitor(self, rhs: Self) -> Self::Output {
    self.union(rhs)
  }
}

impl core::ops::BitOrAssign for Caps {
  #[inline]
  fn bitor_assign(&mut self, rhs: Self) {
    *self = self.union(rhs);
  }
}

/// x86_64 feature bits (bits 0..8).
pub mod x86 {
  use super::Caps;

  /// SSE2: baseline 128-bit integer SIMD. Guaranteed on every x86_64 target,
  /// detected anyway so forced-portable test configurations stay honest.
  pub const SSE2: Caps = Caps::from_bit(0);
}

/// aarch64 feature bits (bits 8..16).
pub mod aarch64 {
  use super::Caps;

  /// NEON: 128-bit Advanced SIMD.
  pub const NEON: Caps = Caps::from_bit(8);
}
