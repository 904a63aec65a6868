//! BLAKE3 benchmarks against the official crate.

use core::{hint::black_box, time::Duration};

use baobab::{Blake3, Digest as _};
use criterion::{BenchmarkId, Criterion, SamplingMode, Throughput, criterion_group, criterion_main};

fn pseudo_random_bytes(len: usize, mut seed: u64) -> Vec<u8> {
  let mut out = Vec::with_capacity(len);
  while out.len() < len {
    // xorshift64*
    seed ^= seed >> 12;
    seed ^= seed << 25;
    seed ^= seed >> 27;
    let word = seed.wrapping_mul(0x2545_F491_4F6C_DD1D);
    out.extend_from_slice(&word.to_le_bytes());
  }
  out.truncate(len);
  out
}

fn sized_inputs() -> Vec<(usize, Vec<u8>)> {
  [64usize, 256, 1024, 4096, 16_384, 65_536, 1 << 20]
    .into_iter()
    .map(|len| (len, pseudo_random_bytes(len, 0xBA0B_AB00 ^ len as u64)))
    .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// One-shot comparison
// ─────────────────────────────────────────────────────────────────────────────

fn blake3_oneshot_comparison(c: &mut Criterion) {
  let inputs = sized_inputs();
  let mut group = c.benchmark_group("blake3/oneshot");
  group.sample_size(40);
  group.warm_up_time(Duration::from_secs(2));
  group.measurement_time(Duration::from_secs(4));
  group.sampling_mode(SamplingMode::Flat);

  for (len, data) in &inputs {
    group.throughput(Throughput::Bytes(*len as u64));

    group.bench_with_input(BenchmarkId::new("baobab", len), data, |b, d| {
      b.iter(|| black_box(baobab::hash(black_box(d))))
    });

    group.bench_with_input(BenchmarkId::new("official", len), data, |b, d| {
      b.iter(|| black_box(*blake3::hash(black_box(d)).as_bytes()))
    });
  }

  group.finish();
}

// ─────────────────────────────────────────────────────────────────────────────
// Streaming
// ─────────────────────────────────────────────────────────────────────────────

fn blake3_streaming(c: &mut Criterion) {
  let data_1mb = black_box(pseudo_random_bytes(1 << 20, 0xBA0B_AB01));

  let mut group = c.benchmark_group("blake3/streaming");
  group.sample_size(30);
  group.warm_up_time(Duration::from_secs(2));
  group.measurement_time(Duration::from_secs(4));
  group.sampling_mode(SamplingMode::Flat);
  group.throughput(Throughput::Bytes(data_1mb.len() as u64));

  for chunk_size in [64usize, 512, 1024, 4096, 65_536] {
    group.bench_function(format!("baobab/{chunk_size}B-chunks"), |b| {
      b.iter(|| {
        let mut h = Blake3::new();
        for chunk in data_1mb.chunks(chunk_size) {
          h.update(chunk);
        }
        black_box(h.finalize())
      })
    });

    group.bench_function(format!("official/{chunk_size}B-chunks"), |b| {
      b.iter(|| {
        let mut h = blake3::Hasher::new();
        for chunk in data_1mb.chunks(chunk_size) {
          h.update(chunk);
        }
        black_box(*h.finalize().as_bytes())
      })
    });
  }

  group.finish();
}

// ─────────────────────────────────────────────────────────────────────────────
// Extended output
// ─────────────────────────────────────────────────────────────────────────────

fn blake3_xof(c: &mut Criterion) {
  let input = pseudo_random_bytes(1024, 0xBA0B_AB02);

  let mut group = c.benchmark_group("blake3/xof");
  group.sample_size(40);

  for out_len in [64usize, 1024, 65_536] {
    group.throughput(Throughput::Bytes(out_len as u64));
    group.bench_function(format!("baobab/{out_len}B"), |b| {
      let mut out = vec![0u8; out_len];
      b.iter(|| {
        baobab::hash_into(black_box(&input), &mut out).unwrap();
        black_box(out.last().copied())
      })
    });
  }

  group.finish();
}

criterion_group!(benches, blake3_oneshot_comparison, blake3_streaming, blake3_xof);
criterion_main!(benches);
