//! BLAKE3 hashing (hash, keyed hash, key derivation, XOF).
//!
//! The hot paths are a scalar single-block compressor and 4-way SIMD batch
//! kernels (SSE2 on x86_64, NEON on aarch64) selected at runtime through
//! [`platform`] capability detection. The Merkle tree reduction uses a fixed
//! chaining-value stack, so hashing allocates nothing.
//!
//! # One-shot API
//!
//! - [`hash`] / [`hash_into`]
//! - [`keyed_hash`] / [`keyed_hash_into`]
//! - [`derive_key`] / [`derive_key_into`]
//!
//! The `_into` variants produce extendable output of any non-zero length.
//!
//! # Streaming API
//!
//! [`Blake3`] implements [`traits::Digest`]; [`Blake3::finalize_xof`] returns
//! a [`Blake3Xof`] implementing [`traits::Xof`].
//!
//! # Parallel API
//!
//! With the `rayon` feature, `hash_rayon` and friends split the chunk range
//! across the Rayon pool and produce bit-identical digests.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![allow(clippy::indexing_slicing)] // Fixed-size arrays + internal block parsing
#![no_std]

#[cfg(feature = "std")]
extern crate std;

use core::{cmp::min, mem::MaybeUninit};

#[cfg(target_arch = "aarch64")]
pub(crate) mod aarch64;
mod dispatch;
pub mod error;
pub(crate) mod kernels;
#[cfg(feature = "rayon")]
mod parallel;
#[cfg(target_arch = "x86_64")]
pub(crate) mod x86_64;

#[cfg(test)]
mod kernel_test;

pub use error::HashError;
#[cfg(feature = "rayon")]
pub use parallel::{hash_rayon, hash_rayon_into, keyed_hash_rayon};
pub use traits::{Digest, InvalidKeyLength, InvalidOutputLength, Xof};

use self::kernels::Kernel;

/// Digest size in bytes.
pub const OUT_LEN: usize = 32;
/// Key size in bytes for the keyed mode.
pub const KEY_LEN: usize = 32;

pub(crate) const BLOCK_LEN: usize = 64;
pub(crate) const CHUNK_LEN: usize = 1024;
const OUTPUT_BLOCK_LEN: usize = 2 * OUT_LEN;

/// A chaining-value stack of 54 entries covers inputs up to 2^64 bytes:
/// the stack holds one subtree per set bit of the completed chunk count.
const CV_STACK_LEN: usize = 54;

pub(crate) const CHUNK_START: u32 = 1 << 0;
pub(crate) const CHUNK_END: u32 = 1 << 1;
pub(crate) const PARENT: u32 = 1 << 2;
pub(crate) const ROOT: u32 = 1 << 3;
const KEYED_HASH: u32 = 1 << 4;
const DERIVE_KEY_CONTEXT: u32 = 1 << 5;
const DERIVE_KEY_MATERIAL: u32 = 1 << 6;

pub(crate) const IV: [u32; 8] = [
  0x6A09_E667,
  0xBB67_AE85,
  0x3C6E_F372,
  0xA54F_F53A,
  0x510E_527F,
  0x9B05_688C,
  0x1F83_D9AB,
  0x5BE0_CD19,
];

/// BLAKE3 message schedule.
///
/// `MSG_SCHEDULE[round][i]` is the message word consumed by position `i` of
/// round `round`; each row is the base permutation applied to the previous
/// row.
pub(crate) const MSG_SCHEDULE: [[usize; 16]; 7] = [
  [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
  [2, 6, 3, 10, 7, 0, 4, 13, 1, 11, 12, 5, 9, 14, 15, 8],
  [3, 4, 10, 12, 13, 2, 7, 14, 6, 5, 9, 0, 11, 15, 8, 1],
  [10, 7, 12, 9, 14, 3, 13, 15, 4, 0, 11, 2, 5, 8, 1, 6],
  [12, 13, 9, 11, 15, 10, 14, 8, 7, 2, 5, 3, 0, 1, 6, 4],
  [9, 14, 11, 5, 8, 12, 15, 1, 13, 3, 0, 10, 2, 6, 4, 7],
  [11, 15, 5, 0, 1, 9, 8, 6, 14, 10, 2, 12, 3, 4, 7, 13],
];

// ─────────────────────────────────────────────────────────────────────────────
// Word/byte conversion (little-endian contract, host-LE fast path)
// ─────────────────────────────────────────────────────────────────────────────

#[inline(always)]
pub(crate) const fn counter_low(counter: u64) -> u32 {
  counter as u32
}

#[inline(always)]
pub(crate) const fn counter_high(counter: u64) -> u32 {
  (counter >> 32) as u32
}

#[inline(always)]
pub(crate) fn words8_from_le_bytes_32(bytes: &[u8; 32]) -> [u32; 8] {
  let mut words = [0u32; 8];
  if cfg!(target_endian = "little") {
    // SAFETY: `bytes` is exactly 32 bytes and `words` is 8 u32s = 32 bytes;
    // byte order matches the wire format on little-endian hosts.
    unsafe { core::ptr::copy_nonoverlapping(bytes.as_ptr(), words.as_mut_ptr().cast::<u8>(), 32) };
  } else {
    for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
      *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
  }
  words
}

#[inline(always)]
pub(crate) fn words16_from_le_bytes_64(bytes: &[u8; BLOCK_LEN]) -> [u32; 16] {
  let mut words = [0u32; 16];
  if cfg!(target_endian = "little") {
    // SAFETY: `bytes` is exactly 64 bytes and `words` is 16 u32s = 64 bytes.
    unsafe { core::ptr::copy_nonoverlapping(bytes.as_ptr(), words.as_mut_ptr().cast::<u8>(), BLOCK_LEN) };
  } else {
    for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
      *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
  }
  words
}

#[inline(always)]
pub(crate) fn words8_to_le_bytes(words: &[u32; 8]) -> [u8; OUT_LEN] {
  let mut out = [0u8; OUT_LEN];
  if cfg!(target_endian = "little") {
    // SAFETY: `words` is 8 u32s = 32 bytes, and `out` is 32 bytes.
    unsafe { core::ptr::copy_nonoverlapping(words.as_ptr().cast::<u8>(), out.as_mut_ptr(), OUT_LEN) };
  } else {
    for (chunk, word) in out.chunks_exact_mut(4).zip(words.iter()) {
      chunk.copy_from_slice(&word.to_le_bytes());
    }
  }
  out
}

#[inline(always)]
pub(crate) fn words16_to_le_bytes(words: &[u32; 16]) -> [u8; OUTPUT_BLOCK_LEN] {
  let mut out = [0u8; OUTPUT_BLOCK_LEN];
  if cfg!(target_endian = "little") {
    // SAFETY: `words` is 16 u32s = 64 bytes, and `out` is 64 bytes.
    unsafe { core::ptr::copy_nonoverlapping(words.as_ptr().cast::<u8>(), out.as_mut_ptr(), OUTPUT_BLOCK_LEN) };
  } else {
    for (chunk, word) in out.chunks_exact_mut(4).zip(words.iter()) {
      chunk.copy_from_slice(&word.to_le_bytes());
    }
  }
  out
}

// ─────────────────────────────────────────────────────────────────────────────
// Single-block compression
// ─────────────────────────────────────────────────────────────────────────────

/// The BLAKE3 compression function.
///
/// Returns the full 16-word state; the first 8 words are the truncated form
/// (the chaining value), the second 8 are only meaningful for extended root
/// output. State and message words are held as independent locals so the
/// compiler keeps them in registers through all seven rounds.
#[inline]
pub(crate) fn compress(
  chaining_value: &[u32; 8],
  block_words: &[u32; 16],
  counter: u64,
  block_len: u32,
  flags: u32,
) -> [u32; 16] {
  let m0 = block_words[0];
  let m1 = block_words[1];
  let m2 = block_words[2];
  let m3 = block_words[3];
  let m4 = block_words[4];
  let m5 = block_words[5];
  let m6 = block_words[6];
  let m7 = block_words[7];
  let m8 = block_words[8];
  let m9 = block_words[9];
  let m10 = block_words[10];
  let m11 = block_words[11];
  let m12 = block_words[12];
  let m13 = block_words[13];
  let m14 = block_words[14];
  let m15 = block_words[15];

  let mut s0 = chaining_value[0];
  let mut s1 = chaining_value[1];
  let mut s2 = chaining_value[2];
  let mut s3 = chaining_value[3];
  let mut s4 = chaining_value[4];
  let mut s5 = chaining_value[5];
  let mut s6 = chaining_value[6];
  let mut s7 = chaining_value[7];
  let mut s8 = IV[0];
  let mut s9 = IV[1];
  let mut s10 = IV[2];
  let mut s11 = IV[3];
  let mut s12 = counter_low(counter);
  let mut s13 = counter_high(counter);
  let mut s14 = block_len;
  let mut s15 = flags;

  macro_rules! g {
    ($a:ident, $b:ident, $c:ident, $d:ident, $mx:expr, $my:expr) => {{
      $a = $a.wrapping_add($b).wrapping_add($mx);
      $d = ($d ^ $a).rotate_right(16);
      $c = $c.wrapping_add($d);
      $b = ($b ^ $c).rotate_right(12);
      $a = $a.wrapping_add($b).wrapping_add($my);
      $d = ($d ^ $a).rotate_right(8);
      $c = $c.wrapping_add($d);
      $b = ($b ^ $c).rotate_right(7);
    }};
  }

  // One full round: four column G's, then four diagonal G's. The message
  // schedule is spelled out per round so no indirect indexing survives into
  // the hot loop.
  macro_rules! round {
    (
      $x0:expr, $y0:expr, $x1:expr, $y1:expr, $x2:expr, $y2:expr, $x3:expr, $y3:expr,
      $x4:expr, $y4:expr, $x5:expr, $y5:expr, $x6:expr, $y6:expr, $x7:expr, $y7:expr
    ) => {{
      g!(s0, s4, s8, s12, $x0, $y0);
      g!(s1, s5, s9, s13, $x1, $y1);
      g!(s2, s6, s10, s14, $x2, $y2);
      g!(s3, s7, s11, s15, $x3, $y3);

      g!(s0, s5, s10, s15, $x4, $y4);
      g!(s1, s6, s11, s12, $x5, $y5);
      g!(s2, s7, s8, s13, $x6, $y6);
      g!(s3, s4, s9, s14, $x7, $y7);
    }};
  }

  round!(m0, m1, m2, m3, m4, m5, m6, m7, m8, m9, m10, m11, m12, m13, m14, m15);
  round!(m2, m6, m3, m10, m7, m0, m4, m13, m1, m11, m12, m5, m9, m14, m15, m8);
  round!(m3, m4, m10, m12, m13, m2, m7, m14, m6, m5, m9, m0, m11, m15, m8, m1);
  round!(m10, m7, m12, m9, m14, m3, m13, m15, m4, m0, m11, m2, m5, m8, m1, m6);
  round!(m12, m13, m9, m11, m15, m10, m14, m8, m7, m2, m5, m3, m0, m1, m6, m4);
  round!(m9, m14, m11, m5, m8, m12, m15, m1, m13, m3, m0, m10, m2, m6, m4, m7);
  round!(m11, m15, m5, m0, m1, m9, m8, m6, m14, m10, m2, m12, m3, m4, m7, m13);

  s0 ^= s8;
  s1 ^= s9;
  s2 ^= s10;
  s3 ^= s11;
  s4 ^= s12;
  s5 ^= s13;
  s6 ^= s14;
  s7 ^= s15;

  s8 ^= chaining_value[0];
  s9 ^= chaining_value[1];
  s10 ^= chaining_value[2];
  s11 ^= chaining_value[3];
  s12 ^= chaining_value[4];
  s13 ^= chaining_value[5];
  s14 ^= chaining_value[6];
  s15 ^= chaining_value[7];

  [s0, s1, s2, s3, s4, s5, s6, s7, s8, s9, s10, s11, s12, s13, s14, s15]
}

#[inline(always)]
pub(crate) fn first_8_words(words: [u32; 16]) -> [u32; 8] {
  [
    words[0], words[1], words[2], words[3], words[4], words[5], words[6], words[7],
  ]
}

/// Parent node compression: `block = [left, right]`, counter 0, full block.
#[inline]
pub(crate) fn parent_cv(
  left_child_cv: [u32; 8],
  right_child_cv: [u32; 8],
  key_words: [u32; 8],
  flags: u32,
) -> [u32; 8] {
  let mut block_words = [0u32; 16];
  block_words[..8].copy_from_slice(&left_child_cv);
  block_words[8..].copy_from_slice(&right_child_cv);
  first_8_words(compress(&key_words, &block_words, 0, BLOCK_LEN as u32, PARENT | flags))
}

// ─────────────────────────────────────────────────────────────────────────────
// Chaining-value stack
// ─────────────────────────────────────────────────────────────────────────────

/// Fixed-capacity subtree stack.
///
/// Entry heights strictly decrease from bottom to top; after N completed
/// non-final chunks the contents mirror the binary representation of N.
#[derive(Clone, Copy)]
pub(crate) struct CvStack {
  cvs: [MaybeUninit<[u32; 8]>; CV_STACK_LEN],
  len: usize,
}

impl CvStack {
  #[inline]
  pub(crate) fn new() -> Self {
    Self {
      // SAFETY: an array of `MaybeUninit` is valid uninitialized.
      cvs: unsafe { MaybeUninit::<[MaybeUninit<[u32; 8]>; CV_STACK_LEN]>::uninit().assume_init() },
      len: 0,
    }
  }

  #[inline]
  pub(crate) fn is_empty(&self) -> bool {
    self.len == 0
  }

  #[inline]
  pub(crate) fn push(&mut self, cv: [u32; 8]) {
    debug_assert!(self.len < CV_STACK_LEN);
    self.cvs[self.len].write(cv);
    self.len += 1;
  }

  #[inline]
  pub(crate) fn pop(&mut self) -> [u32; 8] {
    debug_assert!(self.len > 0);
    self.len -= 1;
    // SAFETY: `len` counts initialized entries; entry `len` was written by a
    // prior `push`.
    unsafe { self.cvs[self.len].assume_init_read() }
  }
}

/// Commit a completed, non-final chunk CV to the stack.
///
/// `total_chunks` is the number of completed chunks including this one.
/// Equal-height neighbors merge while the low bit is zero, which reserves
/// the final parent merge (and thus ROOT) for finalization.
#[inline]
pub(crate) fn push_chunk_cv(stack: &mut CvStack, cv: [u32; 8], total_chunks: u64, key_words: [u32; 8], flags: u32) {
  let mut cv = cv;
  let mut total = total_chunks;
  while total & 1 == 0 {
    cv = parent_cv(stack.pop(), cv, key_words, flags);
    total >>= 1;
  }
  stack.push(cv);
}

// ─────────────────────────────────────────────────────────────────────────────
// Output states
// ─────────────────────────────────────────────────────────────────────────────

/// A compression with its inputs captured but ROOT not yet decided.
///
/// Holding the final block this way is what guarantees that exactly one
/// compression in a hashing run carries ROOT, and that it runs last.
#[derive(Clone, Copy)]
pub(crate) struct OutputState {
  kernel: Kernel,
  input_chaining_value: [u32; 8],
  block_words: [u32; 16],
  counter: u64,
  block_len: u32,
  flags: u32,
}

impl OutputState {
  /// Non-root chaining value of this node.
  #[inline]
  fn chaining_value(&self) -> [u32; 8] {
    first_8_words(compress(
      &self.input_chaining_value,
      &self.block_words,
      self.counter,
      self.block_len,
      self.flags,
    ))
  }

  /// Root hash words (first output block, truncated).
  #[inline]
  fn root_hash_words(&self) -> [u32; 8] {
    first_8_words(compress(
      &self.input_chaining_value,
      &self.block_words,
      0,
      self.block_len,
      self.flags | ROOT,
    ))
  }

  #[inline]
  fn root_hash_bytes(&self) -> [u8; OUT_LEN] {
    words8_to_le_bytes(&self.root_hash_words())
  }

  /// Fill `out` (a multiple of 64 bytes) with root output blocks starting at
  /// `output_block_counter`.
  fn root_output_blocks_into(&self, mut output_block_counter: u64, mut out: &mut [u8]) {
    debug_assert!(out.len().is_multiple_of(OUTPUT_BLOCK_LEN));
    let flags = self.flags | ROOT;

    // Batches of four output blocks go through the 4-way kernel.
    while out.len() >= 4 * OUTPUT_BLOCK_LEN {
      // SAFETY: dispatch only selects kernels whose required CPU features are
      // present, and `out` has at least 4 * 64 writable bytes.
      unsafe {
        (self.kernel.root_output_blocks4)(
          &self.input_chaining_value,
          &self.block_words,
          output_block_counter,
          self.block_len,
          flags,
          out.as_mut_ptr(),
        );
      }
      output_block_counter = output_block_counter.wrapping_add(4);
      out = &mut out[4 * OUTPUT_BLOCK_LEN..];
    }

    while !out.is_empty() {
      let words = compress(
        &self.input_chaining_value,
        &self.block_words,
        output_block_counter,
        self.block_len,
        flags,
      );
      out[..OUTPUT_BLOCK_LEN].copy_from_slice(&words16_to_le_bytes(&words));
      output_block_counter = output_block_counter.wrapping_add(1);
      out = &mut out[OUTPUT_BLOCK_LEN..];
    }
  }
}

#[inline]
fn parent_output(
  kernel: Kernel,
  left_child_cv: [u32; 8],
  right_child_cv: [u32; 8],
  key_words: [u32; 8],
  flags: u32,
) -> OutputState {
  let mut block_words = [0u32; 16];
  block_words[..8].copy_from_slice(&left_child_cv);
  block_words[8..].copy_from_slice(&right_child_cv);
  OutputState {
    kernel,
    input_chaining_value: key_words,
    block_words,
    counter: 0,
    block_len: BLOCK_LEN as u32,
    flags: PARENT | flags,
  }
}

/// Compress a whole chunk of up to `CHUNK_LEN` bytes, holding back the final
/// block (possibly empty) as an [`OutputState`].
pub(crate) fn single_chunk_output(
  kernel: Kernel,
  key_words: [u32; 8],
  chunk_counter: u64,
  flags: u32,
  input: &[u8],
) -> OutputState {
  debug_assert!(input.len() <= CHUNK_LEN);

  let last_block_start = if input.is_empty() {
    0
  } else {
    (input.len() - 1) / BLOCK_LEN * BLOCK_LEN
  };

  let mut chaining_value = key_words;
  let mut blocks_compressed = 0u8;
  let mut offset = 0usize;
  while offset < last_block_start {
    let mut block = [0u8; BLOCK_LEN];
    block.copy_from_slice(&input[offset..offset + BLOCK_LEN]);
    let start = if blocks_compressed == 0 { CHUNK_START } else { 0 };
    chaining_value = first_8_words(compress(
      &chaining_value,
      &words16_from_le_bytes_64(&block),
      chunk_counter,
      BLOCK_LEN as u32,
      flags | start,
    ));
    blocks_compressed = blocks_compressed.wrapping_add(1);
    offset += BLOCK_LEN;
  }

  // The empty input still yields one block: length 0, zero-padded.
  let last_len = input.len() - last_block_start;
  let mut last_block = [0u8; BLOCK_LEN];
  last_block[..last_len].copy_from_slice(&input[last_block_start..]);
  let start = if blocks_compressed == 0 { CHUNK_START } else { 0 };

  OutputState {
    kernel,
    input_chaining_value: chaining_value,
    block_words: words16_from_le_bytes_64(&last_block),
    counter: chunk_counter,
    block_len: last_len as u32,
    flags: flags | start | CHUNK_END,
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// One-shot tree engine
// ─────────────────────────────────────────────────────────────────────────────

/// Hash `count` whole chunks starting at chunk index `first_chunk` and commit
/// their CVs to the stack. Every chunk committed here must be non-final.
pub(crate) fn hash_chunks_into_stack(
  kernel: Kernel,
  stack: &mut CvStack,
  input: &[u8],
  first_chunk: usize,
  count: usize,
  key_words: [u32; 8],
  flags: u32,
) {
  let mut out = [0u8; kernels::MAX_SIMD_DEGREE * OUT_LEN];
  let mut done = 0usize;
  while done < count {
    let chunk_index = first_chunk + done;
    let batch = min(count - done, kernel.simd_degree);
    // SAFETY: `input` holds at least `(chunk_index + batch) * CHUNK_LEN`
    // bytes (the caller only commits whole chunks), `out` holds `batch`
    // 32-byte CVs, and dispatch validated the kernel's CPU features.
    unsafe {
      (kernel.hash_many_contiguous)(
        input.as_ptr().add(chunk_index * CHUNK_LEN),
        batch,
        &key_words,
        chunk_index as u64,
        flags,
        out.as_mut_ptr(),
      );
    }
    for i in 0..batch {
      let mut cv_bytes = [0u8; OUT_LEN];
      cv_bytes.copy_from_slice(&out[i * OUT_LEN..(i + 1) * OUT_LEN]);
      push_chunk_cv(
        stack,
        words8_from_le_bytes_32(&cv_bytes),
        (chunk_index + i) as u64 + 1,
        key_words,
        flags,
      );
    }
    done += batch;
  }
}

/// Reduce the committed stack plus the final chunk/subtree CV to the root
/// output state. The last parent merge is the one that will carry ROOT.
pub(crate) fn fold_stack_to_root(
  kernel: Kernel,
  stack: &mut CvStack,
  right_cv: [u32; 8],
  key_words: [u32; 8],
  flags: u32,
) -> OutputState {
  debug_assert!(!stack.is_empty());
  let mut output = parent_output(kernel, stack.pop(), right_cv, key_words, flags);
  while !stack.is_empty() {
    output = parent_output(kernel, stack.pop(), output.chaining_value(), key_words, flags);
  }
  output
}

/// Build the root output state for a fully materialized input.
pub(crate) fn root_output_oneshot(kernel: Kernel, key_words: [u32; 8], flags: u32, input: &[u8]) -> OutputState {
  // Single-chunk fast path: the chunk itself is the root.
  if input.len() <= CHUNK_LEN {
    return single_chunk_output(kernel, key_words, 0, flags, input);
  }

  let full_chunks = input.len() / CHUNK_LEN;
  let remainder = input.len() % CHUNK_LEN;

  // Commit every chunk except the final one; a trailing whole chunk becomes
  // the right child of the root parent instead of entering the stack.
  let commit_chunks = if remainder == 0 { full_chunks - 1 } else { full_chunks };

  let mut stack = CvStack::new();
  hash_chunks_into_stack(kernel, &mut stack, input, 0, commit_chunks, key_words, flags);

  let right_cv = single_chunk_output(
    kernel,
    key_words,
    commit_chunks as u64,
    flags,
    &input[commit_chunks * CHUNK_LEN..],
  )
  .chaining_value();

  fold_stack_to_root(kernel, &mut stack, right_cv, key_words, flags)
}

#[inline]
pub(crate) fn digest_oneshot_words(kernel: Kernel, key_words: [u32; 8], flags: u32, input: &[u8]) -> [u32; 8] {
  root_output_oneshot(kernel, key_words, flags, input).root_hash_words()
}

#[inline]
fn digest_oneshot(kernel: Kernel, key_words: [u32; 8], flags: u32, input: &[u8]) -> [u8; OUT_LEN] {
  words8_to_le_bytes(&digest_oneshot_words(kernel, key_words, flags, input))
}

// ─────────────────────────────────────────────────────────────────────────────
// One-shot public API
// ─────────────────────────────────────────────────────────────────────────────

/// Hash `input`, returning a 32-byte digest.
#[must_use]
pub fn hash(input: &[u8]) -> [u8; OUT_LEN] {
  digest_oneshot(dispatch::active(), IV, 0, input)
}

/// Hash `input`, filling `out` with extendable output.
///
/// # Errors
///
/// Returns [`InvalidOutputLength`] if `out` is empty.
pub fn hash_into(input: &[u8], out: &mut [u8]) -> Result<(), InvalidOutputLength> {
  if out.is_empty() {
    return Err(InvalidOutputLength::new());
  }
  let mut xof = Blake3Xof::new(root_output_oneshot(dispatch::active(), IV, 0, input));
  xof.squeeze(out);
  Ok(())
}

/// Keyed hash of `input` under a 32-byte `key`.
///
/// # Errors
///
/// Returns [`InvalidKeyLength`] if `key` is not exactly 32 bytes.
pub fn keyed_hash(key: &[u8], input: &[u8]) -> Result<[u8; OUT_LEN], InvalidKeyLength> {
  let key: &[u8; KEY_LEN] = key.try_into().map_err(|_| InvalidKeyLength::new())?;
  let key_words = words8_from_le_bytes_32(key);
  Ok(digest_oneshot(dispatch::active(), key_words, KEYED_HASH, input))
}

/// Keyed hash of `input` under a 32-byte `key`, filling `out` with
/// extendable output.
///
/// # Errors
///
/// Returns [`HashError`] if `key` is not exactly 32 bytes or `out` is empty.
pub fn keyed_hash_into(key: &[u8], input: &[u8], out: &mut [u8]) -> Result<(), HashError> {
  let key: &[u8; KEY_LEN] = key.try_into().map_err(|_| InvalidKeyLength::new())?;
  if out.is_empty() {
    return Err(InvalidOutputLength::new().into());
  }
  let key_words = words8_from_le_bytes_32(key);
  let mut xof = Blake3Xof::new(root_output_oneshot(dispatch::active(), key_words, KEYED_HASH, input));
  xof.squeeze(out);
  Ok(())
}

/// Derive a 32-byte key for `key_material` in the given `context`.
///
/// The context string should be hardcoded, globally unique, and
/// application-specific. It may be arbitrarily long; it is hashed through
/// the full tree in a subordinate run.
#[must_use]
pub fn derive_key(context: &str, key_material: &[u8]) -> [u8; OUT_LEN] {
  let kernel = dispatch::active();
  let context_key_words = digest_oneshot_words(kernel, IV, DERIVE_KEY_CONTEXT, context.as_bytes());
  digest_oneshot(kernel, context_key_words, DERIVE_KEY_MATERIAL, key_material)
}

/// Derive key material of any non-zero length.
///
/// # Errors
///
/// Returns [`InvalidOutputLength`] if `out` is empty.
pub fn derive_key_into(context: &str, key_material: &[u8], out: &mut [u8]) -> Result<(), InvalidOutputLength> {
  if out.is_empty() {
    return Err(InvalidOutputLength::new());
  }
  let kernel = dispatch::active();
  let context_key_words = digest_oneshot_words(kernel, IV, DERIVE_KEY_CONTEXT, context.as_bytes());
  let mut xof = Blake3Xof::new(root_output_oneshot(kernel, context_key_words, DERIVE_KEY_MATERIAL, key_material));
  xof.squeeze(out);
  Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Streaming chunk state
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
struct ChunkState {
  chaining_value: [u32; 8],
  chunk_counter: u64,
  block: [u8; BLOCK_LEN],
  block_len: u8,
  blocks_compressed: u8,
  flags: u32,
}

impl ChunkState {
  #[inline]
  fn new(key_words: [u32; 8], chunk_counter: u64, flags: u32) -> Self {
    Self {
      chaining_value: key_words,
      chunk_counter,
      block: [0u8; BLOCK_LEN],
      block_len: 0,
      blocks_compressed: 0,
      flags,
    }
  }

  #[inline]
  fn len(&self) -> usize {
    BLOCK_LEN * self.blocks_compressed as usize + self.block_len as usize
  }

  #[inline]
  fn start_flag(&self) -> u32 {
    if self.blocks_compressed == 0 { CHUNK_START } else { 0 }
  }

  fn update(&mut self, mut input: &[u8]) {
    while !input.is_empty() {
      // A buffered full block is only compressed once more input arrives, so
      // the terminal block of the chunk always stays buffered for output().
      if self.block_len as usize == BLOCK_LEN {
        let block_words = words16_from_le_bytes_64(&self.block);
        self.chaining_value = first_8_words(compress(
          &self.chaining_value,
          &block_words,
          self.chunk_counter,
          BLOCK_LEN as u32,
          self.flags | self.start_flag(),
        ));
        self.blocks_compressed = self.blocks_compressed.wrapping_add(1);
        self.block = [0u8; BLOCK_LEN];
        self.block_len = 0;
      }

      let want = BLOCK_LEN - self.block_len as usize;
      let take = min(want, input.len());
      self.block[self.block_len as usize..][..take].copy_from_slice(&input[..take]);
      self.block_len = self.block_len.wrapping_add(take as u8);
      input = &input[take..];
    }
  }

  #[inline]
  fn output(&self, kernel: Kernel) -> OutputState {
    let mut block = self.block;
    block[self.block_len as usize..].fill(0);
    OutputState {
      kernel,
      input_chaining_value: self.chaining_value,
      block_words: words16_from_le_bytes_64(&block),
      counter: self.chunk_counter,
      block_len: self.block_len as u32,
      flags: self.flags | self.start_flag() | CHUNK_END,
    }
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Streaming hasher
// ─────────────────────────────────────────────────────────────────────────────

/// An incremental BLAKE3 hasher.
///
/// Buffers at most one block; whole chunks stream through the batched kernel
/// at chunk boundaries. The digest is independent of how the input is split
/// across `update` calls.
#[derive(Clone)]
pub struct Blake3 {
  kernel: Kernel,
  chunk_state: ChunkState,
  key_words: [u32; 8],
  cv_stack: CvStack,
  flags: u32,
}

impl Blake3 {
  /// Construct a new hasher for the keyed hash function.
  #[must_use]
  #[inline]
  pub fn new_keyed(key: &[u8; KEY_LEN]) -> Self {
    let key_words = words8_from_le_bytes_32(key);
    Self::new_internal(key_words, KEYED_HASH)
  }

  /// Construct a new hasher for the key derivation function.
  #[must_use]
  #[inline]
  pub fn new_derive_key(context: &str) -> Self {
    let kernel = dispatch::active();
    let key_words = digest_oneshot_words(kernel, IV, DERIVE_KEY_CONTEXT, context.as_bytes());
    Self::new_internal(key_words, DERIVE_KEY_MATERIAL)
  }

  #[inline]
  fn new_internal(key_words: [u32; 8], flags: u32) -> Self {
    Self {
      kernel: dispatch::active(),
      chunk_state: ChunkState::new(key_words, 0, flags),
      key_words,
      cv_stack: CvStack::new(),
      flags,
    }
  }

  #[inline]
  fn add_chunk_chaining_value(&mut self, cv: [u32; 8], total_chunks: u64) {
    push_chunk_cv(&mut self.cv_stack, cv, total_chunks, self.key_words, self.flags);
  }

  fn root_output(&self) -> OutputState {
    let mut stack = self.cv_stack;
    let mut output = self.chunk_state.output(self.kernel);
    while !stack.is_empty() {
      output = parent_output(self.kernel, stack.pop(), output.chaining_value(), self.key_words, self.flags);
    }
    output
  }

  /// Finalize into an extendable output state (XOF).
  #[must_use]
  #[inline]
  pub fn finalize_xof(&self) -> Blake3Xof {
    Blake3Xof::new(self.root_output())
  }
}

impl Default for Blake3 {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}

impl Digest for Blake3 {
  const OUTPUT_SIZE: usize = OUT_LEN;
  type Output = [u8; OUT_LEN];

  #[inline]
  fn new() -> Self {
    Self::new_internal(IV, 0)
  }

  fn update(&mut self, mut input: &[u8]) {
    while !input.is_empty() {
      // A finished chunk with more input pending cannot be the final chunk;
      // commit it to the tree.
      if self.chunk_state.len() == CHUNK_LEN {
        let chunk_cv = self.chunk_state.output(self.kernel).chaining_value();
        let total_chunks = self.chunk_state.chunk_counter + 1;
        self.add_chunk_chaining_value(chunk_cv, total_chunks);
        self.chunk_state = ChunkState::new(self.key_words, total_chunks, self.flags);
      }

      // At a chunk boundary, whole chunks with at least one byte beyond them
      // stream through the batched kernel.
      if self.chunk_state.len() == 0 && input.len() > CHUNK_LEN {
        let available = (input.len() - 1) / CHUNK_LEN;
        let batch = min(available, self.kernel.simd_degree);
        let base = self.chunk_state.chunk_counter;

        let mut out = [0u8; kernels::MAX_SIMD_DEGREE * OUT_LEN];
        // SAFETY: `input` has at least `batch * CHUNK_LEN` bytes, `out` has
        // room for `batch` CVs, and dispatch validated the kernel's CPU
        // features.
        unsafe {
          (self.kernel.hash_many_contiguous)(input.as_ptr(), batch, &self.key_words, base, self.flags, out.as_mut_ptr());
        }
        for i in 0..batch {
          let mut cv_bytes = [0u8; OUT_LEN];
          cv_bytes.copy_from_slice(&out[i * OUT_LEN..(i + 1) * OUT_LEN]);
          self.add_chunk_chaining_value(words8_from_le_bytes_32(&cv_bytes), base + i as u64 + 1);
        }
        self.chunk_state = ChunkState::new(self.key_words, base + batch as u64, self.flags);
        input = &input[batch * CHUNK_LEN..];
        continue;
      }

      let want = CHUNK_LEN - self.chunk_state.len();
      let take = min(want, input.len());
      self.chunk_state.update(&input[..take]);
      input = &input[take..];
    }
  }

  #[inline]
  fn finalize(&self) -> Self::Output {
    self.root_output().root_hash_bytes()
  }

  #[inline]
  fn reset(&mut self) {
    *self = Self::new_internal(self.key_words, self.flags);
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Extendable output
// ─────────────────────────────────────────────────────────────────────────────

/// Extendable output reader produced by [`Blake3::finalize_xof`].
#[derive(Clone)]
pub struct Blake3Xof {
  output: OutputState,
  block_counter: u64,
  buf: [u8; OUTPUT_BLOCK_LEN],
  buf_pos: usize,
}

impl Blake3Xof {
  #[inline]
  fn new(output: OutputState) -> Self {
    Self {
      output,
      block_counter: 0,
      buf: [0u8; OUTPUT_BLOCK_LEN],
      buf_pos: OUTPUT_BLOCK_LEN,
    }
  }

  #[inline]
  fn refill(&mut self) {
    self.output.root_output_blocks_into(self.block_counter, &mut self.buf);
    self.block_counter = self.block_counter.wrapping_add(1);
    self.buf_pos = 0;
  }
}

impl Xof for Blake3Xof {
  fn squeeze(&mut self, mut out: &mut [u8]) {
    if out.is_empty() {
      return;
    }

    // Drain buffered bytes first.
    if self.buf_pos != self.buf.len() {
      let take = min(self.buf.len() - self.buf_pos, out.len());
      out[..take].copy_from_slice(&self.buf[self.buf_pos..self.buf_pos + take]);
      self.buf_pos += take;
      out = &mut out[take..];
      if out.is_empty() {
        return;
      }
    }

    // Whole output blocks go directly into the caller's buffer.
    let full = out.len() / OUTPUT_BLOCK_LEN * OUTPUT_BLOCK_LEN;
    if full != 0 {
      let blocks = (full / OUTPUT_BLOCK_LEN) as u64;
      self.output.root_output_blocks_into(self.block_counter, &mut out[..full]);
      self.block_counter = self.block_counter.wrapping_add(blocks);
      out = &mut out[full..];
    }

    // Tail: refill once and copy what is needed.
    if !out.is_empty() {
      self.refill();
      let take = out.len();
      out.copy_from_slice(&self.buf[..take]);
      self.buf_pos = take;
    }
  }
}

#[cfg(test)]
mod tests;
