extern crate alloc;

use alloc::vec::Vec;

use traits::{Digest as _, Xof as _};

use super::*;

const KEY: &[u8; 32] = b"whats the Elvish word for friend";
const CONTEXT: &str = "BLAKE3 2019-12-27 16:29:52 test vectors context";

fn hex_to_bytes(hex: &str, out: &mut [u8]) {
  assert_eq!(hex.len(), out.len() * 2);
  for (i, chunk) in hex.as_bytes().chunks_exact(2).enumerate() {
    let hi = (chunk[0] as char).to_digit(16).unwrap();
    let lo = (chunk[1] as char).to_digit(16).unwrap();
    out[i] = ((hi << 4) | lo) as u8;
  }
}

fn hex32(hex: &str) -> [u8; OUT_LEN] {
  let mut out = [0u8; OUT_LEN];
  hex_to_bytes(hex, &mut out);
  out
}

/// The input pattern from the official test vectors.
fn input_pattern(len: usize) -> Vec<u8> {
  (0..len).map(|i| (i % 251) as u8).collect()
}

#[test]
fn official_hash_vectors() {
  let cases: &[(usize, &str)] = &[
    (0, "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"),
    (1, "2d3adedff11b61f14c886e35afa036736dcd87a74d27b5c1510225d0f592e213"),
    (2, "7b7015bb92cf0b318037702a6cdd81dee41224f734684c2c122cd6359cb1ee63"),
    (3, "e1be4d7a8ab5560aa4199eea339849ba8e293d55ca0a81006726d184519e647f"),
    (64, "4eed7141ea4a5cd4b788606bd23f46e212af9cacebacdc7d1f4c6dc7f2511b98"),
    (65, "de1e5fa0be70df6d2be8fffd0e99ceaa8eb6e8c93a63f2d8d1c30ecb6b263dee"),
    (1024, "42214739f095a406f3fc83deb889744ac00df831c10daa55189b5d121c855af7"),
    (1025, "d00278ae47eb27b34faecf67b4fe263f82d5412916c1ffd97c8cb7fb814b8444"),
  ];

  for &(len, expected_hex) in cases {
    let input = input_pattern(len);
    assert_eq!(hash(&input), hex32(expected_hex), "one-shot len={len}");

    let mut h = Blake3::new();
    h.update(&input);
    assert_eq!(h.finalize(), hex32(expected_hex), "streaming len={len}");
  }
}

#[test]
fn official_keyed_and_derive_vectors() {
  // len 0
  assert_eq!(
    keyed_hash(KEY, &[]).unwrap(),
    hex32("92b2b75604ed3c761f9d6f62392c8a9227ad0ea3f09573e783f1498a4ed60d26"),
  );
  assert_eq!(
    derive_key(CONTEXT, &[]),
    hex32("2cc39783c223154fea8dfb7c1b1660f2ac2dcbd1c1de8277b0b0dd39b7e50d7d"),
  );

  // len 64
  let input = input_pattern(64);
  assert_eq!(
    keyed_hash(KEY, &input).unwrap(),
    hex32("ba8ced36f327700d213f120b1a207a3b8c04330528586f414d09f2f7d9ccb7e6"),
  );
  assert_eq!(
    derive_key(CONTEXT, &input),
    hex32("a5c4a7053fa86b64746d4bb688d06ad1f02a18fce9afd3e818fefaa7126bf73e"),
  );

  // The streaming constructors agree with the one-shot entry points.
  let mut keyed = Blake3::new_keyed(KEY);
  keyed.update(&input);
  assert_eq!(keyed.finalize(), keyed_hash(KEY, &input).unwrap());

  let mut dk = Blake3::new_derive_key(CONTEXT);
  dk.update(&input);
  assert_eq!(dk.finalize(), derive_key(CONTEXT, &input));
}

#[test]
fn official_xof_prefix_len0() {
  let expected_hex = "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262e00f03e7b69af26b7faaf09fcd333050338ddfe085b8cc869ca98b206c08243a26f5487789e8f660afe6c99ef9e0c52b92e7393024a80459cf91f476f9ffdbda7001c22e159b402631f277ca96f2defdf1078282314e763699a31c5363165421cce14d";
  let mut expected = [0u8; 131];
  hex_to_bytes(expected_hex, &mut expected);

  let mut out = [0u8; 131];
  hash_into(&[], &mut out).unwrap();
  assert_eq!(out, expected);

  // Multi-squeeze across unaligned boundaries reads the same stream.
  let mut xof = Blake3::new().finalize_xof();
  let mut split = [0u8; 131];
  xof.squeeze(&mut split[..7]);
  xof.squeeze(&mut split[7..70]);
  xof.squeeze(&mut split[70..]);
  assert_eq!(split, expected);
}

#[test]
fn xof_prefix_property() {
  let input = input_pattern(4096 + 17);
  let mut long = [0u8; 128];
  hash_into(&input, &mut long).unwrap();
  assert_eq!(long[..32], hash(&input));

  for take in [1usize, 31, 32, 33, 63, 64, 65] {
    let mut short = alloc::vec![0u8; take];
    hash_into(&input, &mut short).unwrap();
    assert_eq!(short[..], long[..take], "take={take}");
  }
}

#[test]
fn streaming_is_split_invariant() {
  let input = input_pattern(3 * CHUNK_LEN + 100);
  let expected = hash(&input);

  for chunk in [1usize, 7, 63, 64, 65, 256, 1023, 1024, 1025, 4096] {
    let mut h = Blake3::new();
    for part in input.chunks(chunk) {
      h.update(part);
    }
    assert_eq!(h.finalize(), expected, "chunk={chunk}");
  }

  // Finalize is idempotent and non-destructive.
  let mut h = Blake3::new();
  h.update(&input);
  assert_eq!(h.finalize(), expected);
  assert_eq!(h.finalize(), expected);

  // Reset returns to the initial state.
  h.reset();
  h.update(&input);
  assert_eq!(h.finalize(), expected);
}

#[test]
fn update_vectored_matches_contiguous() {
  let input = input_pattern(2500);
  let (a, rest) = input.split_at(1000);
  let (b, c) = rest.split_at(1);

  let mut h = Blake3::new();
  h.update_vectored(&[a, b, c]);
  assert_eq!(h.finalize(), hash(&input));
}

#[test]
fn zero_key_is_not_plain_hash() {
  let input = input_pattern(123);
  let zero_key = [0u8; KEY_LEN];
  assert_ne!(keyed_hash(&zero_key, &input).unwrap(), hash(&input));
}

#[test]
fn modes_are_domain_separated() {
  let input = input_pattern(321);
  let plain = hash(&input);
  let keyed = keyed_hash(KEY, &input).unwrap();
  let derived = derive_key(CONTEXT, &input);
  assert_ne!(plain, keyed);
  assert_ne!(plain, derived);
  assert_ne!(keyed, derived);
}

#[test]
fn derive_key_contexts_of_any_length() {
  // Multi-chunk contexts route through the full tree engine.
  let context: alloc::string::String = (0..3000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
  let a = derive_key(&context, b"material");
  assert_eq!(a, derive_key(&context, b"material"));
  assert_ne!(a, derive_key(&context[..2999], b"material"));

  let mut h = Blake3::new_derive_key(&context);
  h.update(b"material");
  assert_eq!(h.finalize(), a);
}

#[test]
fn diffusion_sanity() {
  // Flipping any single input bit should flip roughly half the output bits.
  let base = input_pattern(256);
  let base_digest = hash(&base);

  let mut total_flipped = 0u32;
  let trials = 64usize;
  for trial in 0..trials {
    let mut mutated = base.clone();
    mutated[trial * 4 + 1] ^= 1 << (trial % 8);
    let digest = hash(&mutated);
    total_flipped += base_digest
      .iter()
      .zip(digest.iter())
      .map(|(a, b)| (a ^ b).count_ones())
      .sum::<u32>();
  }

  let average = total_flipped as f64 / trials as f64;
  let bits = (OUT_LEN * 8) as f64;
  assert!(
    average > bits * 0.375 && average < bits * 0.625,
    "average flipped bits {average} outside sanity band"
  );
}

#[test]
fn invalid_parameters_are_rejected() {
  assert_eq!(keyed_hash(&[0u8; 31], b"x"), Err(InvalidKeyLength::new()));
  assert_eq!(keyed_hash(&[0u8; 33], b"x"), Err(InvalidKeyLength::new()));

  assert_eq!(hash_into(b"x", &mut []), Err(InvalidOutputLength::new()));
  assert_eq!(derive_key_into(CONTEXT, b"x", &mut []), Err(InvalidOutputLength::new()));

  assert!(matches!(
    keyed_hash_into(&[0u8; 16], b"x", &mut [0u8; 8]),
    Err(HashError::KeyLength(_))
  ));
  assert!(matches!(
    keyed_hash_into(&[0u8; 32], b"x", &mut []),
    Err(HashError::OutputLength(_))
  ));

  // A 32-byte slice key works.
  assert_eq!(keyed_hash(&KEY[..], b"x").unwrap(), {
    let mut h = Blake3::new_keyed(KEY);
    h.update(b"x");
    h.finalize()
  });
}

#[test]
fn keyed_xof_matches_streaming_xof() {
  let input = input_pattern(2048);
  let mut from_oneshot = [0u8; 100];
  keyed_hash_into(KEY, &input, &mut from_oneshot).unwrap();

  let mut h = Blake3::new_keyed(KEY);
  h.update(&input);
  let mut from_streaming = [0u8; 100];
  h.finalize_xof().squeeze(&mut from_streaming);

  assert_eq!(from_oneshot, from_streaming);
}

#[test]
fn empty_updates_do_not_change_state() {
  let mut h = Blake3::new();
  h.update(&[]);
  h.update(&input_pattern(10));
  h.update(&[]);
  assert_eq!(h.finalize(), hash(&input_pattern(10)));
}
