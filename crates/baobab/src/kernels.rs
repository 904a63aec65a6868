//! Kernel table: the per-backend function pointers the engine dispatches on.

use platform::Caps;
#[cfg(target_arch = "aarch64")]
use platform::caps::aarch64;
#[cfg(target_arch = "x86_64")]
use platform::caps::x86;

use crate::{
  BLOCK_LEN, CHUNK_END, CHUNK_LEN, CHUNK_START, OUT_LEN, OUTPUT_BLOCK_LEN, compress, first_8_words,
  words8_to_le_bytes, words16_from_le_bytes_64, words16_to_le_bytes,
};

/// Widest batch any kernel processes at once.
pub(crate) const MAX_SIMD_DEGREE: usize = 4;

/// Hash whole contiguous chunks, one CV (32 bytes) per chunk.
///
/// # Safety
///
/// - `input` must point to at least `CHUNK_LEN * num_chunks` readable bytes.
/// - `out` must point to at least `OUT_LEN * num_chunks` writable bytes.
/// - The kernel's required CPU features must be present.
pub(crate) type HashManyContiguousFn =
  unsafe fn(input: *const u8, num_chunks: usize, key: &[u32; 8], counter: u64, flags: u32, out: *mut u8);

/// Produce four consecutive 64-byte root output blocks (counters
/// `counter..counter + 4`).
///
/// # Safety
///
/// - `out` must point to at least `4 * 64` writable bytes.
/// - The kernel's required CPU features must be present.
pub(crate) type RootOutputBlocks4Fn =
  unsafe fn(chaining_value: &[u32; 8], block_words: &[u32; 16], counter: u64, block_len: u32, flags: u32, out: *mut u8);

#[derive(Clone, Copy)]
pub(crate) struct Kernel {
  /// Kernel identity, read by the cross-kernel test harness.
  #[allow(dead_code)]
  pub(crate) id: KernelId,
  /// Multi-chunk throughput primitive.
  pub(crate) hash_many_contiguous: HashManyContiguousFn,
  /// Batched root output for the XOF.
  pub(crate) root_output_blocks4: RootOutputBlocks4Fn,
  /// Chunks per `hash_many_contiguous` batch: 1 for portable, 4 for SIMD.
  pub(crate) simd_degree: usize,
  /// Kernel name for debugging.
  #[allow(dead_code)]
  pub(crate) name: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum KernelId {
  Portable = 0,
  #[cfg(target_arch = "x86_64")]
  X86Sse2 = 1,
  #[cfg(target_arch = "aarch64")]
  Aarch64Neon = 2,
}

/// Every kernel this build knows about, for cross-verification.
#[allow(dead_code)]
pub(crate) const ALL: &[KernelId] = &[
  KernelId::Portable,
  #[cfg(target_arch = "x86_64")]
  KernelId::X86Sse2,
  #[cfg(target_arch = "aarch64")]
  KernelId::Aarch64Neon,
];

impl KernelId {
  #[inline]
  #[must_use]
  pub(crate) const fn as_str(self) -> &'static str {
    match self {
      Self::Portable => "portable",
      #[cfg(target_arch = "x86_64")]
      Self::X86Sse2 => "x86_64/sse2",
      #[cfg(target_arch = "aarch64")]
      Self::Aarch64Neon => "aarch64/neon",
    }
  }
}

#[must_use]
pub(crate) fn kernel(id: KernelId) -> Kernel {
  match id {
    KernelId::Portable => Kernel {
      id,
      hash_many_contiguous: hash_many_contiguous_portable,
      root_output_blocks4: root_output_blocks4_portable,
      simd_degree: 1,
      name: id.as_str(),
    },
    #[cfg(target_arch = "x86_64")]
    KernelId::X86Sse2 => Kernel {
      id,
      hash_many_contiguous: hash_many_contiguous_sse2_wrapper,
      root_output_blocks4: root_output_blocks4_sse2_wrapper,
      simd_degree: 4,
      name: id.as_str(),
    },
    #[cfg(target_arch = "aarch64")]
    KernelId::Aarch64Neon => Kernel {
      id,
      hash_many_contiguous: hash_many_contiguous_neon_wrapper,
      root_output_blocks4: root_output_blocks4_neon_wrapper,
      simd_degree: 4,
      name: id.as_str(),
    },
  }
}

#[inline]
#[must_use]
pub(crate) const fn required_caps(id: KernelId) -> Caps {
  match id {
    KernelId::Portable => Caps::NONE,
    #[cfg(target_arch = "x86_64")]
    KernelId::X86Sse2 => x86::SSE2,
    #[cfg(target_arch = "aarch64")]
    KernelId::Aarch64Neon => aarch64::NEON,
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Portable implementations
// ─────────────────────────────────────────────────────────────────────────────

unsafe fn hash_many_contiguous_portable(
  input: *const u8,
  num_chunks: usize,
  key: &[u32; 8],
  counter: u64,
  flags: u32,
  out: *mut u8,
) {
  debug_assert!(num_chunks != 0);

  for chunk_idx in 0..num_chunks {
    let chunk_counter = counter.wrapping_add(chunk_idx as u64);
    let mut cv = *key;

    for block_idx in 0..(CHUNK_LEN / BLOCK_LEN) {
      let mut block = [0u8; BLOCK_LEN];
      // SAFETY: the caller guarantees `input` is valid for
      // `num_chunks * CHUNK_LEN` bytes.
      unsafe {
        let src = input.add(chunk_idx * CHUNK_LEN + block_idx * BLOCK_LEN);
        core::ptr::copy_nonoverlapping(src, block.as_mut_ptr(), BLOCK_LEN);
      }

      let start = if block_idx == 0 { CHUNK_START } else { 0 };
      let end = if block_idx + 1 == CHUNK_LEN / BLOCK_LEN { CHUNK_END } else { 0 };
      cv = first_8_words(compress(
        &cv,
        &words16_from_le_bytes_64(&block),
        chunk_counter,
        BLOCK_LEN as u32,
        flags | start | end,
      ));
    }

    let cv_bytes = words8_to_le_bytes(&cv);
    // SAFETY: the caller guarantees `out` is valid for `num_chunks * OUT_LEN`
    // bytes.
    unsafe { core::ptr::copy_nonoverlapping(cv_bytes.as_ptr(), out.add(chunk_idx * OUT_LEN), OUT_LEN) };
  }
}

unsafe fn root_output_blocks4_portable(
  chaining_value: &[u32; 8],
  block_words: &[u32; 16],
  counter: u64,
  block_len: u32,
  flags: u32,
  out: *mut u8,
) {
  for i in 0..4usize {
    let words = compress(chaining_value, block_words, counter.wrapping_add(i as u64), block_len, flags);
    let bytes = words16_to_le_bytes(&words);
    // SAFETY: the caller guarantees `out` is valid for `4 * 64` bytes.
    unsafe { core::ptr::copy_nonoverlapping(bytes.as_ptr(), out.add(i * OUTPUT_BLOCK_LEN), OUTPUT_BLOCK_LEN) };
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// x86_64 SSE2 wrappers
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(target_arch = "x86_64")]
unsafe fn hash_many_contiguous_sse2_wrapper(
  input: *const u8,
  num_chunks: usize,
  key: &[u32; 8],
  counter: u64,
  flags: u32,
  out: *mut u8,
) {
  // SAFETY: this wrapper is only reachable through dispatch, which checked
  // that SSE2 is available; the buffer contracts are forwarded unchanged.
  unsafe { crate::x86_64::hash_many_contiguous_sse2(input, num_chunks, key, counter, flags, out) }
}

#[cfg(target_arch = "x86_64")]
unsafe fn root_output_blocks4_sse2_wrapper(
  chaining_value: &[u32; 8],
  block_words: &[u32; 16],
  counter: u64,
  block_len: u32,
  flags: u32,
  out: *mut u8,
) {
  // SAFETY: this wrapper is only reachable through dispatch, which checked
  // that SSE2 is available; the buffer contracts are forwarded unchanged.
  unsafe { crate::x86_64::root_output_blocks4_sse2(chaining_value, block_words, counter, block_len, flags, out) }
}

// ─────────────────────────────────────────────────────────────────────────────
// aarch64 NEON wrappers
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(target_arch = "aarch64")]
unsafe fn hash_many_contiguous_neon_wrapper(
  input: *const u8,
  num_chunks: usize,
  key: &[u32; 8],
  counter: u64,
  flags: u32,
  out: *mut u8,
) {
  // SAFETY: this wrapper is only reachable through dispatch, which checked
  // that NEON is available; the buffer contracts are forwarded unchanged.
  unsafe { crate::aarch64::hash_many_contiguous_neon(input, num_chunks, key, counter, flags, out) }
}

#[cfg(target_arch = "aarch64")]
unsafe fn root_output_blocks4_neon_wrapper(
  chaining_value: &[u32; 8],
  block_words: &[u32; 16],
  counter: u64,
  block_len: u32,
  flags: u32,
  out: *mut u8,
) {
  // SAFETY: this wrapper is only reachable through dispatch, which checked
  // that NEON is available; the buffer contracts are forwarded unchanged.
  unsafe { crate::aarch64::root_output_blocks4_neon(chaining_value, block_words, counter, block_len, flags, out) }
}
