use adalzw::{decode::Decoder, encode::Encoder, Mode};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};

const SOURCE: &[u8] = include_bytes!("../src/encode.rs");

/// Inputs of different redundancy, all large enough to fill the dictionary at least once.
fn inputs() -> Vec<(&'static str, Vec<u8>)> {
    let mut rng = StdRng::seed_from_u64(0x1a2b);
    let text = SOURCE.repeat((1 << 20) / SOURCE.len() + 1);
    let skewed = (0..1 << 20).map(|_| rng.gen_range(0..16u8)).collect();
    let noise = (0..1 << 20).map(|_| rng.gen()).collect();
    vec![("text", text), ("skewed", skewed), ("noise", noise)]
}

pub fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    for (name, data) in inputs() {
        group.throughput(Throughput::Bytes(data.len() as u64));
        for mode in Mode::ALL {
            let id = BenchmarkId::new(name, mode);
            group.bench_with_input(id, &data, |b, data| {
                let mut encoder = Encoder::new(mode);
                b.iter(|| black_box(encoder.encode(data).expect("encoding failed")))
            });
        }
    }
    group.finish();
}

pub fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for (name, data) in inputs() {
        group.throughput(Throughput::Bytes(data.len() as u64));
        for mode in Mode::ALL {
            let compressed = Encoder::new(mode)
                .encode(&data)
                .expect("encoding failed");
            let id = BenchmarkId::new(name, mode);
            group.bench_with_input(id, &compressed, |b, compressed| {
                let mut decoder = Decoder::new();
                b.iter(|| black_box(decoder.decode(compressed).expect("decoding failed")))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
