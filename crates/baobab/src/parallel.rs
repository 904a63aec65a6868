//! Rayon-parallel one-shot hashing.
//!
//! The leading whole chunks are partitioned into contiguous ranges and each
//! range's chunk CVs are computed on the Rayon pool by a pure function of its
//! subslice. The coordinator collects the results in range order and feeds
//! them through the same subtree-stack fold as the serial engine, so the
//! digest is bit-identical for any worker count or interleaving.

use core::cmp::min;
use std::vec::Vec;

use rayon::prelude::*;
use traits::{InvalidKeyLength, InvalidOutputLength, Xof as _};

use crate::{
  Blake3Xof, CHUNK_LEN, CvStack, IV, KEY_LEN, KEYED_HASH, OUT_LEN, OutputState, dispatch, fold_stack_to_root,
  kernels::{Kernel, MAX_SIMD_DEGREE},
  push_chunk_cv, root_output_oneshot, single_chunk_output, words8_from_le_bytes_32, words8_to_le_bytes,
};

/// Chunks per worker task (128 KiB of input).
const RANGE_CHUNKS: usize = 128;

/// Inputs below this many whole chunks hash serially; task setup would
/// otherwise dominate.
const MIN_PARALLEL_CHUNKS: usize = 2 * RANGE_CHUNKS;

/// Hash `input` on the Rayon pool, returning a 32-byte digest.
///
/// Produces exactly the same digest as [`crate::hash`].
#[must_use]
pub fn hash_rayon(input: &[u8]) -> [u8; OUT_LEN] {
  words8_to_le_bytes(&root_output_parallel(dispatch::active(), IV, 0, input).root_hash_words())
}

/// Hash `input` on the Rayon pool, filling `out` with extendable output.
///
/// # Errors
///
/// Returns [`InvalidOutputLength`] if `out` is empty.
pub fn hash_rayon_into(input: &[u8], out: &mut [u8]) -> Result<(), InvalidOutputLength> {
  if out.is_empty() {
    return Err(InvalidOutputLength::new());
  }
  let mut xof = Blake3Xof::new(root_output_parallel(dispatch::active(), IV, 0, input));
  xof.squeeze(out);
  Ok(())
}

/// Keyed hash of `input` on the Rayon pool.
///
/// # Errors
///
/// Returns [`InvalidKeyLength`] if `key` is not exactly 32 bytes.
pub fn keyed_hash_rayon(key: &[u8], input: &[u8]) -> Result<[u8; OUT_LEN], InvalidKeyLength> {
  let key: &[u8; KEY_LEN] = key.try_into().map_err(|_| InvalidKeyLength::new())?;
  let key_words = words8_from_le_bytes_32(key);
  let output = root_output_parallel(dispatch::active(), key_words, KEYED_HASH, input);
  Ok(words8_to_le_bytes(&output.root_hash_words()))
}

fn root_output_parallel(kernel: Kernel, key_words: [u32; 8], flags: u32, input: &[u8]) -> OutputState {
  let full_chunks = input.len() / CHUNK_LEN;
  if full_chunks < MIN_PARALLEL_CHUNKS {
    return root_output_oneshot(kernel, key_words, flags, input);
  }

  let remainder = input.len() % CHUNK_LEN;
  // Same commit rule as the serial engine: the final chunk never enters the
  // stack, so ROOT stays on the last compression.
  let commit_chunks = if remainder == 0 { full_chunks - 1 } else { full_chunks };

  // Workers are pure over their subslice; collect preserves range order.
  let cv_lists: Vec<Vec<[u32; 8]>> = (0..commit_chunks)
    .into_par_iter()
    .step_by(RANGE_CHUNKS)
    .map(|start| {
      let count = min(RANGE_CHUNKS, commit_chunks - start);
      range_chunk_cvs(kernel, input, start, count, key_words, flags)
    })
    .collect();

  let mut stack = CvStack::new();
  let mut total_chunks = 0u64;
  for cvs in &cv_lists {
    for &cv in cvs {
      total_chunks += 1;
      push_chunk_cv(&mut stack, cv, total_chunks, key_words, flags);
    }
  }
  debug_assert_eq!(total_chunks, commit_chunks as u64);

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

/// Chunk CVs for `count` whole chunks starting at `first_chunk`, in order.
fn range_chunk_cvs(
  kernel: Kernel,
  input: &[u8],
  first_chunk: usize,
  count: usize,
  key_words: [u32; 8],
  flags: u32,
) -> Vec<[u32; 8]> {
  let mut cvs = Vec::with_capacity(count);
  let mut out = [0u8; MAX_SIMD_DEGREE * OUT_LEN];
  let mut done = 0usize;
  while done < count {
    let chunk_index = first_chunk + done;
    let batch = min(count - done, kernel.simd_degree);
    // SAFETY: the caller only assigns whole in-bounds chunks, so `input`
    // covers `(chunk_index + batch) * CHUNK_LEN` bytes; `out` holds `batch`
    // CVs; dispatch validated the kernel's CPU features.
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
      cvs.push(words8_from_le_bytes_32(&cv_bytes));
    }
    done += batch;
  }
  cvs
}

#[cfg(test)]
mod tests {
  use std::vec;

  use super::*;

  fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
  }

  #[test]
  fn parallel_matches_serial_across_threshold() {
    // Spans below, at, and beyond MIN_PARALLEL_CHUNKS, including unaligned
    // tails and an exact chunk multiple.
    let lens = [
      0usize,
      1,
      CHUNK_LEN,
      RANGE_CHUNKS * CHUNK_LEN,
      MIN_PARALLEL_CHUNKS * CHUNK_LEN - 1,
      MIN_PARALLEL_CHUNKS * CHUNK_LEN,
      MIN_PARALLEL_CHUNKS * CHUNK_LEN + 1,
      3 * RANGE_CHUNKS * CHUNK_LEN + 512,
      512 * CHUNK_LEN,
    ];
    for len in lens {
      let data = pattern(len);
      assert_eq!(hash_rayon(&data), crate::hash(&data), "len={len}");
    }
  }

  #[test]
  fn parallel_keyed_and_xof_match_serial() {
    let key = [7u8; KEY_LEN];
    let data = pattern(700 * CHUNK_LEN + 13);

    let expected = crate::keyed_hash(&key, &data).unwrap();
    assert_eq!(keyed_hash_rayon(&key, &data).unwrap(), expected);

    let mut serial = vec![0u8; 301];
    crate::hash_into(&data, &mut serial).unwrap();
    let mut parallel = vec![0u8; 301];
    hash_rayon_into(&data, &mut parallel).unwrap();
    assert_eq!(serial, parallel);
  }
}
