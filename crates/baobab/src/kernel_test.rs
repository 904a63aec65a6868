//! Cross-kernel agreement tests.
//!
//! Every capability-supported kernel must produce the same bytes as the
//! portable kernel and as the official `blake3` crate, over one-shot,
//! streaming, keyed, derive-key, and XOF paths.

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;

use traits::{Digest as _, Xof as _};

use crate::kernels::{ALL, KernelId, kernel as kernel_for_id, required_caps};
use crate::{Blake3, CHUNK_LEN, IV, OUT_LEN, digest_oneshot_words, words8_to_le_bytes};

const KEY: &[u8; 32] = b"whats the Elvish word for friend";
const CONTEXT: &str = "BLAKE3 2019-12-27 16:29:52 test vectors context";

fn pattern(len: usize) -> Vec<u8> {
  (0..len).map(|i| (i % 251) as u8).collect()
}

fn supported(id: KernelId) -> bool {
  platform::caps().has(required_caps(id))
}

fn forced_hasher(mut h: Blake3, id: KernelId) -> Blake3 {
  h.kernel = kernel_for_id(id);
  h
}

fn digest_with_kernel(id: KernelId, data: &[u8]) -> [u8; OUT_LEN] {
  let mut h = forced_hasher(Blake3::new(), id);
  h.update(data);
  h.finalize()
}

#[test]
fn all_kernels_match_official_crate_and_streaming_splits() {
  let lens = [
    0usize, 1, 2, 3, 63, 64, 65, 1023, 1024, 1025, 2047, 2048, 2049, 4096, 8192, 10_000, 16_384,
  ];

  for &id in ALL {
    if !supported(id) {
      continue;
    }

    for &len in &lens {
      let msg = pattern(len);

      let expected = *blake3::hash(&msg).as_bytes();
      let oneshot = words8_to_le_bytes(&digest_oneshot_words(kernel_for_id(id), IV, 0, &msg));
      assert_eq!(oneshot, expected, "oneshot mismatch kernel={} len={len}", id.as_str());

      let streamed = digest_with_kernel(id, &msg);
      assert_eq!(streamed, expected, "streaming mismatch kernel={} len={len}", id.as_str());

      for &chunk in &[1usize, 31, 64, 65, 1024, 4096] {
        let mut h = forced_hasher(Blake3::new(), id);
        for part in msg.chunks(chunk) {
          h.update(part);
        }
        assert_eq!(
          h.finalize(),
          expected,
          "split mismatch kernel={} len={len} chunk={chunk}",
          id.as_str()
        );
      }
    }
  }
}

#[test]
fn keyed_and_derive_match_official_crate_per_kernel() {
  let lens = [0usize, 1, 64, 1024, 1025, 4096, 10_000];

  for &id in ALL {
    if !supported(id) {
      continue;
    }

    for &len in &lens {
      let msg = pattern(len);

      let mut h = forced_hasher(Blake3::new_keyed(KEY), id);
      for part in msg.chunks(63) {
        h.update(part);
      }
      let expected = *blake3::keyed_hash(KEY, &msg).as_bytes();
      assert_eq!(h.finalize(), expected, "keyed mismatch kernel={} len={len}", id.as_str());

      let mut h = forced_hasher(Blake3::new_derive_key(CONTEXT), id);
      for part in msg.chunks(65) {
        h.update(part);
      }
      let expected = blake3::derive_key(CONTEXT, &msg);
      assert_eq!(h.finalize(), expected, "derive mismatch kernel={} len={len}", id.as_str());
    }
  }
}

#[test]
fn xof_matches_official_crate_per_kernel() {
  let data = pattern(1234);

  let mut expected = [0u8; 131];
  let mut ref_hasher = blake3::Hasher::new();
  ref_hasher.update(&data);
  ref_hasher.finalize_xof().fill(&mut expected);

  for &id in ALL {
    if !supported(id) {
      continue;
    }

    let mut h = forced_hasher(Blake3::new(), id);
    h.update(&data);
    let mut xof = h.finalize_xof();
    let mut ours = [0u8; 131];
    xof.squeeze(&mut ours[..50]);
    xof.squeeze(&mut ours[50..]);
    assert_eq!(ours, expected, "xof mismatch kernel={}", id.as_str());
  }
}

#[test]
fn hash_many_kernels_agree_with_portable() {
  // 1..=9 chunks covers sub-degree tails, exact batches, and batch + tail.
  for num_chunks in 1usize..=9 {
    let mut input = vec![0u8; num_chunks * CHUNK_LEN];
    for (chunk_idx, chunk) in input.chunks_mut(CHUNK_LEN).enumerate() {
      for (i, byte) in chunk.iter_mut().enumerate() {
        *byte = ((i % 251) as u8).wrapping_add(chunk_idx as u8);
      }
    }

    let portable = kernel_for_id(KernelId::Portable);
    let mut reference = vec![0u8; num_chunks * OUT_LEN];
    // SAFETY: `input` holds `num_chunks` full chunks and `reference` has room
    // for the CVs.
    unsafe { (portable.hash_many_contiguous)(input.as_ptr(), num_chunks, &IV, 7, 0, reference.as_mut_ptr()) };

    for &id in ALL {
      if id == KernelId::Portable || !supported(id) {
        continue;
      }
      let k = kernel_for_id(id);
      let mut out = vec![0u8; num_chunks * OUT_LEN];
      // SAFETY: same buffer contracts as above; the kernel is supported.
      unsafe { (k.hash_many_contiguous)(input.as_ptr(), num_chunks, &IV, 7, 0, out.as_mut_ptr()) };
      assert_eq!(
        out,
        reference,
        "hash_many mismatch kernel={} num_chunks={num_chunks}",
        id.as_str()
      );
    }
  }
}

#[test]
fn four_way_root_output_matches_scalar_compress() {
  // Build a realistic root state from a two-chunk input, then check each of
  // the four batched output blocks against the scalar compression.
  let data = pattern(2 * CHUNK_LEN);
  let output = crate::root_output_oneshot(kernel_for_id(KernelId::Portable), IV, 0, &data);
  let flags = output.flags | crate::ROOT;

  for &id in ALL {
    if !supported(id) {
      continue;
    }
    let k = kernel_for_id(id);

    let mut out4 = [0u8; 4 * 64];
    // SAFETY: `out4` has 256 writable bytes; the kernel is supported.
    unsafe {
      (k.root_output_blocks4)(
        &output.input_chaining_value,
        &output.block_words,
        5,
        output.block_len,
        flags,
        out4.as_mut_ptr(),
      );
    }

    for lane in 0..4u64 {
      let words = crate::compress(
        &output.input_chaining_value,
        &output.block_words,
        5 + lane,
        output.block_len,
        flags,
      );
      assert_eq!(
        out4[lane as usize * 64..][..64],
        crate::words16_to_le_bytes(&words),
        "root block mismatch kernel={} lane={lane}",
        id.as_str()
      );
    }
  }
}

/// Four lane-packed copies of the same input must produce four identical
/// outputs equal to the scalar result.
#[test]
fn four_identical_lanes_match_single_compression() {
  let chunk = pattern(CHUNK_LEN);
  let expected = crate::single_chunk_output(kernel_for_id(KernelId::Portable), IV, 42, 0, &chunk).chaining_value();
  let expected_bytes = words8_to_le_bytes(&expected);

  #[cfg(target_arch = "x86_64")]
  if supported(KernelId::X86Sse2) {
    let ptrs = [chunk.as_ptr(); 4];
    let mut out = [0u8; 4 * OUT_LEN];
    // SAFETY: SSE2 is supported; all four pointers cover one full chunk and
    // `out` has room for four CVs.
    unsafe {
      crate::x86_64::hash4(
        &ptrs,
        CHUNK_LEN / crate::BLOCK_LEN,
        &IV,
        42,
        false,
        0,
        crate::CHUNK_START,
        crate::CHUNK_END,
        out.as_mut_ptr(),
      );
    }
    for lane in 0..4 {
      assert_eq!(out[lane * OUT_LEN..][..OUT_LEN], expected_bytes, "sse2 lane={lane}");
    }
  }

  #[cfg(target_arch = "aarch64")]
  if supported(KernelId::Aarch64Neon) {
    let ptrs = [chunk.as_ptr(); 4];
    let mut out = [0u8; 4 * OUT_LEN];
    // SAFETY: NEON is supported; all four pointers cover one full chunk and
    // `out` has room for four CVs.
    unsafe {
      crate::aarch64::hash4(
        &ptrs,
        CHUNK_LEN / crate::BLOCK_LEN,
        &IV,
        42,
        false,
        0,
        crate::CHUNK_START,
        crate::CHUNK_END,
        out.as_mut_ptr(),
      );
    }
    for lane in 0..4 {
      assert_eq!(out[lane * OUT_LEN..][..OUT_LEN], expected_bytes, "neon lane={lane}");
    }
  }

  let _ = expected_bytes;
}
