#![no_main]

use baobab::{Blake3, Digest as _, Xof as _};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
  // Hash mode.
  let ours = baobab::hash(data);
  let expected = *blake3::hash(data).as_bytes();
  assert_eq!(ours, expected);

  // Keyed mode, key drawn from the input prefix.
  {
    let mut key = [0u8; 32];
    let take = data.len().min(32);
    key[..take].copy_from_slice(&data[..take]);

    let ours = baobab::keyed_hash(&key, data).unwrap();
    let expected = *blake3::keyed_hash(&key, data).as_bytes();
    assert_eq!(ours, expected);
  }

  // Derive-key mode with an ASCII context derived from the input.
  {
    let ctx_len = data.first().copied().unwrap_or(0) as usize % 65;
    let ctx_src = data.get(32..).unwrap_or(&[]);
    let ctx_len = ctx_len.min(ctx_src.len());
    let context: String = ctx_src[..ctx_len].iter().map(|&b| char::from(b'a' + b % 26)).collect();

    let ours = baobab::derive_key(&context, data);
    let expected = blake3::derive_key(&context, data);
    assert_eq!(ours, expected);
  }

  // XOF with a multi-squeeze split point.
  {
    let out_len = match data.len() {
      0 => 1usize,
      _ => 1 + (data[0] as usize) * 8,
    };
    let split = data.get(1).copied().unwrap_or(0) as usize % (out_len + 1);

    let mut ours = vec![0u8; out_len];
    let mut h = Blake3::new();
    h.update(data);
    let mut xof = h.finalize_xof();
    xof.squeeze(&mut ours[..split]);
    xof.squeeze(&mut ours[split..]);

    let mut expected = vec![0u8; out_len];
    let mut ref_hasher = blake3::Hasher::new();
    ref_hasher.update(data);
    ref_hasher.finalize_xof().fill(&mut expected);

    assert_eq!(ours, expected);
  }
});
