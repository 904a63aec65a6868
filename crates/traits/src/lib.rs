//! Core hashing traits for the baobab workspace.
//!
//! This crate provides the trait surface the hash implementations conform to.
//! It is `no_std` compatible and has zero dependencies.
//!
//! # Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`Digest`] | Cryptographic hash functions with streaming updates |
//! | [`Xof`] | Extendable-output functions (arbitrary-length output) |
//!
//! # Error Types
//!
//! - [`InvalidKeyLength`] - a slice key was not exactly the required length
//! - [`InvalidOutputLength`] - an unsupported output length was requested
//!
//! # Fallibility Discipline
//!
//! This crate denies `unwrap`, `expect`, and indexing in non-test code to
//! ensure all error paths are handled explicitly.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::indexing_slicing))]
#![no_std]

#[cfg(feature = "std")]
extern crate std;

mod digest;
pub mod error;
mod xof;

pub use digest::Digest;
pub use error::{InvalidKeyLength, InvalidOutputLength};
pub use xof::Xof;
