//! x86_64 SSE2 4-way kernel.
//!
//! Four independent compressions run as lanes of 128-bit vectors: lane `i` of
//! every register belongs to instance `i`. Lanewise rotations are shift-or
//! pairs with immediate counts, which keeps the kernel within baseline SSE2.
//!
//! # Safety
//!
//! All functions here require SSE2. Callers must verify CPU capabilities
//! before calling (dispatch does).

#![allow(clippy::inline_always)]
#![allow(clippy::too_many_arguments)]

use core::arch::x86_64::*;

use crate::{BLOCK_LEN, CHUNK_END, CHUNK_LEN, CHUNK_START, IV, MSG_SCHEDULE, OUT_LEN, counter_high, counter_low};

pub(crate) const DEGREE: usize = 4;

#[inline(always)]
unsafe fn loadu(src: *const u8) -> __m128i {
  // SAFETY: `_mm_loadu_si128` has no alignment requirement; the caller
  // guarantees 16 readable bytes.
  unsafe { _mm_loadu_si128(src.cast()) }
}

#[inline(always)]
unsafe fn storeu(src: __m128i, dest: *mut u8) {
  // SAFETY: `_mm_storeu_si128` has no alignment requirement; the caller
  // guarantees 16 writable bytes.
  unsafe { _mm_storeu_si128(dest.cast(), src) }
}

#[inline(always)]
unsafe fn add(a: __m128i, b: __m128i) -> __m128i {
  unsafe { _mm_add_epi32(a, b) }
}

#[inline(always)]
unsafe fn xor(a: __m128i, b: __m128i) -> __m128i {
  unsafe { _mm_xor_si128(a, b) }
}

#[inline(always)]
unsafe fn set1(x: u32) -> __m128i {
  unsafe { _mm_set1_epi32(x as i32) }
}

#[inline(always)]
unsafe fn set4(a: u32, b: u32, c: u32, d: u32) -> __m128i {
  unsafe { _mm_setr_epi32(a as i32, b as i32, c as i32, d as i32) }
}

// Lanewise right rotations as shift-or pairs (no rotate instruction exists
// at this ISA level).

#[inline(always)]
unsafe fn rot16(a: __m128i) -> __m128i {
  unsafe { _mm_or_si128(_mm_srli_epi32(a, 16), _mm_slli_epi32(a, 16)) }
}

#[inline(always)]
unsafe fn rot12(a: __m128i) -> __m128i {
  unsafe { _mm_or_si128(_mm_srli_epi32(a, 12), _mm_slli_epi32(a, 20)) }
}

#[inline(always)]
unsafe fn rot8(a: __m128i) -> __m128i {
  unsafe { _mm_or_si128(_mm_srli_epi32(a, 8), _mm_slli_epi32(a, 24)) }
}

#[inline(always)]
unsafe fn rot7(a: __m128i) -> __m128i {
  unsafe { _mm_or_si128(_mm_srli_epi32(a, 7), _mm_slli_epi32(a, 25)) }
}

#[inline(always)]
unsafe fn g4(v: &mut [__m128i; 16], a: usize, b: usize, c: usize, d: usize, mx: __m128i, my: __m128i) {
  unsafe {
    v[a] = add(add(v[a], v[b]), mx);
    v[d] = rot16(xor(v[d], v[a]));
    v[c] = add(v[c], v[d]);
    v[b] = rot12(xor(v[b], v[c]));
    v[a] = add(add(v[a], v[b]), my);
    v[d] = rot8(xor(v[d], v[a]));
    v[c] = add(v[c], v[d]);
    v[b] = rot7(xor(v[b], v[c]));
  }
}

#[inline(always)]
unsafe fn round4(v: &mut [__m128i; 16], m: &[__m128i; 16], r: usize) {
  unsafe {
    let s = &MSG_SCHEDULE[r];
    g4(v, 0, 4, 8, 12, m[s[0]], m[s[1]]);
    g4(v, 1, 5, 9, 13, m[s[2]], m[s[3]]);
    g4(v, 2, 6, 10, 14, m[s[4]], m[s[5]]);
    g4(v, 3, 7, 11, 15, m[s[6]], m[s[7]]);

    g4(v, 0, 5, 10, 15, m[s[8]], m[s[9]]);
    g4(v, 1, 6, 11, 12, m[s[10]], m[s[11]]);
    g4(v, 2, 7, 8, 13, m[s[12]], m[s[13]]);
    g4(v, 3, 4, 9, 14, m[s[14]], m[s[15]]);
  }
}

/// 4x4 transpose of 32-bit lanes.
#[inline(always)]
unsafe fn transpose_vecs(vecs: &mut [__m128i; DEGREE]) {
  unsafe {
    let ab_01 = _mm_unpacklo_epi32(vecs[0], vecs[1]);
    let ab_23 = _mm_unpackhi_epi32(vecs[0], vecs[1]);
    let cd_01 = _mm_unpacklo_epi32(vecs[2], vecs[3]);
    let cd_23 = _mm_unpackhi_epi32(vecs[2], vecs[3]);

    vecs[0] = _mm_unpacklo_epi64(ab_01, cd_01);
    vecs[1] = _mm_unpackhi_epi64(ab_01, cd_01);
    vecs[2] = _mm_unpacklo_epi64(ab_23, cd_23);
    vecs[3] = _mm_unpackhi_epi64(ab_23, cd_23);
  }
}

/// Load one 64-byte block from each input and transpose so `m[j]` holds word
/// `j` of all four blocks.
#[inline(always)]
unsafe fn transpose_msg_vecs(inputs: &[*const u8; DEGREE], block_offset: usize) -> [__m128i; 16] {
  unsafe {
    let mut quarters = [[_mm_setzero_si128(); DEGREE]; 4];
    for (q, quarter) in quarters.iter_mut().enumerate() {
      let off = block_offset + q * 16;
      *quarter = [
        loadu(inputs[0].add(off)),
        loadu(inputs[1].add(off)),
        loadu(inputs[2].add(off)),
        loadu(inputs[3].add(off)),
      ];
      transpose_vecs(quarter);
    }

    [
      quarters[0][0],
      quarters[0][1],
      quarters[0][2],
      quarters[0][3],
      quarters[1][0],
      quarters[1][1],
      quarters[1][2],
      quarters[1][3],
      quarters[2][0],
      quarters[2][1],
      quarters[2][2],
      quarters[2][3],
      quarters[3][0],
      quarters[3][1],
      quarters[3][2],
      quarters[3][3],
    ]
  }
}

#[inline(always)]
unsafe fn load_counters(counter: u64, increment_counter: bool) -> (__m128i, __m128i) {
  let mask = if increment_counter { !0u64 } else { 0u64 };
  unsafe {
    (
      set4(
        counter_low(counter),
        counter_low(counter.wrapping_add(mask & 1)),
        counter_low(counter.wrapping_add(mask & 2)),
        counter_low(counter.wrapping_add(mask & 3)),
      ),
      set4(
        counter_high(counter),
        counter_high(counter.wrapping_add(mask & 1)),
        counter_high(counter.wrapping_add(mask & 2)),
        counter_high(counter.wrapping_add(mask & 3)),
      ),
    )
  }
}

/// Hash `DEGREE` independent inputs of `blocks` full blocks each.
///
/// # Safety
///
/// Caller must ensure SSE2 is available and that every input pointer is valid
/// for `blocks * BLOCK_LEN` bytes and `out` for `DEGREE * OUT_LEN` bytes.
#[target_feature(enable = "sse2")]
pub(crate) unsafe fn hash4(
  inputs: &[*const u8; DEGREE],
  blocks: usize,
  key: &[u32; 8],
  counter: u64,
  increment_counter: bool,
  flags: u32,
  flags_start: u32,
  flags_end: u32,
  out: *mut u8,
) {
  unsafe {
    let block_len_vec = set1(BLOCK_LEN as u32);
    let iv0 = set1(IV[0]);
    let iv1 = set1(IV[1]);
    let iv2 = set1(IV[2]);
    let iv3 = set1(IV[3]);

    let mut h_vecs = [
      set1(key[0]),
      set1(key[1]),
      set1(key[2]),
      set1(key[3]),
      set1(key[4]),
      set1(key[5]),
      set1(key[6]),
      set1(key[7]),
    ];

    let (counter_low_vec, counter_high_vec) = load_counters(counter, increment_counter);

    for block in 0..blocks {
      let mut block_flags = flags;
      if block == 0 {
        block_flags |= flags_start;
      }
      if block + 1 == blocks {
        block_flags |= flags_end;
      }

      let m = transpose_msg_vecs(inputs, block * BLOCK_LEN);

      let mut v = [
        h_vecs[0],
        h_vecs[1],
        h_vecs[2],
        h_vecs[3],
        h_vecs[4],
        h_vecs[5],
        h_vecs[6],
        h_vecs[7],
        iv0,
        iv1,
        iv2,
        iv3,
        counter_low_vec,
        counter_high_vec,
        block_len_vec,
        set1(block_flags),
      ];

      for r in 0..7 {
        round4(&mut v, &m, r);
      }

      for i in 0..8 {
        h_vecs[i] = xor(v[i], v[i + 8]);
      }
    }

    let mut lo = [h_vecs[0], h_vecs[1], h_vecs[2], h_vecs[3]];
    let mut hi = [h_vecs[4], h_vecs[5], h_vecs[6], h_vecs[7]];
    transpose_vecs(&mut lo);
    transpose_vecs(&mut hi);

    // After the transpose, `lo[i]`/`hi[i]` hold words 0..4 and 4..8 of
    // instance `i`; store one contiguous 32-byte CV per instance.
    for lane in 0..DEGREE {
      storeu(lo[lane], out.add(lane * OUT_LEN));
      storeu(hi[lane], out.add(lane * OUT_LEN + 16));
    }
  }
}

/// Hash whole contiguous chunks, 4 at a time.
///
/// # Safety
///
/// Caller must ensure SSE2 is available, `input` is valid for
/// `num_chunks * CHUNK_LEN` bytes, and `out` for `num_chunks * OUT_LEN`.
#[target_feature(enable = "sse2")]
pub(crate) unsafe fn hash_many_contiguous_sse2(
  input: *const u8,
  num_chunks: usize,
  key: &[u32; 8],
  counter: u64,
  flags: u32,
  out: *mut u8,
) {
  unsafe {
    let mut input = input;
    let mut out = out;
    let mut counter = counter;
    let mut remaining = num_chunks;

    while remaining >= DEGREE {
      let ptrs = [
        input,
        input.add(CHUNK_LEN),
        input.add(2 * CHUNK_LEN),
        input.add(3 * CHUNK_LEN),
      ];
      hash4(
        &ptrs,
        CHUNK_LEN / BLOCK_LEN,
        key,
        counter,
        true,
        flags,
        CHUNK_START,
        CHUNK_END,
        out,
      );
      input = input.add(DEGREE * CHUNK_LEN);
      out = out.add(DEGREE * OUT_LEN);
      counter = counter.wrapping_add(DEGREE as u64);
      remaining -= DEGREE;
    }

    if remaining != 0 {
      // Fill unused lanes with the final chunk pointer and copy only the
      // outputs that were asked for.
      let last = input.add((remaining - 1) * CHUNK_LEN);
      let ptrs = [
        input,
        if remaining > 1 { input.add(CHUNK_LEN) } else { last },
        if remaining > 2 { input.add(2 * CHUNK_LEN) } else { last },
        last,
      ];

      let mut tmp = [0u8; DEGREE * OUT_LEN];
      hash4(
        &ptrs,
        CHUNK_LEN / BLOCK_LEN,
        key,
        counter,
        true,
        flags,
        CHUNK_START,
        CHUNK_END,
        tmp.as_mut_ptr(),
      );
      core::ptr::copy_nonoverlapping(tmp.as_ptr(), out, remaining * OUT_LEN);
    }
  }
}

/// Generate 4 root output blocks (64 bytes each) in parallel.
///
/// Each lane uses an independent output block counter (`counter + lane`) but
/// shares the chaining value, block words, block length, and flags.
///
/// # Safety
///
/// Caller must ensure SSE2 is available and `out` is valid for `4 * 64`
/// writable bytes.
#[target_feature(enable = "sse2")]
pub(crate) unsafe fn root_output_blocks4_sse2(
  chaining_value: &[u32; 8],
  block_words: &[u32; 16],
  counter: u64,
  block_len: u32,
  flags: u32,
  out: *mut u8,
) {
  unsafe {
    let cv_vecs = [
      set1(chaining_value[0]),
      set1(chaining_value[1]),
      set1(chaining_value[2]),
      set1(chaining_value[3]),
      set1(chaining_value[4]),
      set1(chaining_value[5]),
      set1(chaining_value[6]),
      set1(chaining_value[7]),
    ];

    let mut m = [_mm_setzero_si128(); 16];
    for (vec, &word) in m.iter_mut().zip(block_words.iter()) {
      *vec = set1(word);
    }

    let (counter_low_vec, counter_high_vec) = load_counters(counter, true);

    let mut v = [
      cv_vecs[0],
      cv_vecs[1],
      cv_vecs[2],
      cv_vecs[3],
      cv_vecs[4],
      cv_vecs[5],
      cv_vecs[6],
      cv_vecs[7],
      set1(IV[0]),
      set1(IV[1]),
      set1(IV[2]),
      set1(IV[3]),
      counter_low_vec,
      counter_high_vec,
      set1(block_len),
      set1(flags),
    ];

    for r in 0..7 {
      round4(&mut v, &m, r);
    }

    let mut g0 = [xor(v[0], v[8]), xor(v[1], v[9]), xor(v[2], v[10]), xor(v[3], v[11])];
    let mut g1 = [xor(v[4], v[12]), xor(v[5], v[13]), xor(v[6], v[14]), xor(v[7], v[15])];
    let mut g2 = [
      xor(v[8], cv_vecs[0]),
      xor(v[9], cv_vecs[1]),
      xor(v[10], cv_vecs[2]),
      xor(v[11], cv_vecs[3]),
    ];
    let mut g3 = [
      xor(v[12], cv_vecs[4]),
      xor(v[13], cv_vecs[5]),
      xor(v[14], cv_vecs[6]),
      xor(v[15], cv_vecs[7]),
    ];
    transpose_vecs(&mut g0);
    transpose_vecs(&mut g1);
    transpose_vecs(&mut g2);
    transpose_vecs(&mut g3);

    for lane in 0..DEGREE {
      let base = out.add(lane * 64);
      storeu(g0[lane], base);
      storeu(g1[lane], base.add(16));
      storeu(g2[lane], base.add(32));
      storeu(g3[lane], base.add(48));
    }
  }
}
