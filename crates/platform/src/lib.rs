//! CPU capability detection for the baobab workspace.
//!
//! This crate answers one question: "which SIMD kernels can legally run on
//! this machine?" Algorithms query [`caps()`] instead of doing ad-hoc
//! feature detection.
//!
//! # Design
//!
//! 1. **One API**: [`caps()`] returns a [`Caps`] bitset; kernels declare the
//!    bits they require and dispatch checks containment.
//! 2. **Zero-cost when possible**: features guaranteed by the compilation
//!    target are reported via `cfg!(target_feature)` without runtime work.
//! 3. **Cached otherwise**: runtime detection runs once and is cached in a
//!    `OnceLock` (requires the `std` feature).
//! 4. **Miri-safe**: under Miri, [`caps()`] reports no SIMD capabilities so
//!    interpreted runs stay on portable code.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::indexing_slicing))]
#![no_std]

#[cfg(feature = "std")]
extern crate std;

pub mod caps;
mod detect;

pub use caps::Caps;

/// Get the detected CPU capabilities.
///
/// With `std`, the result is cached after the first call. Without `std`,
/// only compile-time-guaranteed features are reported, which is free.
#[inline]
#[must_use]
pub fn caps() -> Caps {
  detect::caps()
}
