// ========================================================================================
//
//                     BGENPROBS LAYOUT2 DECODE THROUGHPUT BENCHMARK
//
// ========================================================================================
//
// Measures how fast a Layout2 block turns into a probability matrix, first from
// already-decompressed bytes (bit unpacking and row reconstruction only), then
// through the full fetch + decompress + parse path of a `GenotypeBlock`.
//
// ========================================================================================

use bgenprobs::layout2::decode_layout2;
use bgenprobs::{BgenSource, Compression, FileSettings, Layout};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[allow(dead_code)]
#[path = "../decode/test_fixtures.rs"]
mod test_fixtures;

use test_fixtures::{Layout2Block, assemble_file};

// --- Benchmark Tuning Parameters ---

/// Samples per simulated variant, roughly a mid-sized biobank.
const NUM_SAMPLES: usize = 50_000;
/// Bit depths written by common BGEN producers.
const BIT_DEPTHS: [u8; 4] = [8, 16, 24, 32];

/// Random unphased diploid biallelic block with valid probability rows.
fn generate_block(bit_depth: u8, rng: &mut StdRng) -> Layout2Block {
    let rows = (0..NUM_SAMPLES)
        .map(|_| {
            let aa: f64 = rng.gen_range(0.0..=1.0);
            let ab: f64 = rng.gen_range(0.0..=(1.0 - aa));
            vec![aa, ab]
        })
        .collect();
    let mut block = Layout2Block::diploid(bit_depth, rows);
    block.missing = (0..NUM_SAMPLES as u32).step_by(97).collect();
    block
}

fn benchmark_layout2_parse(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut group = c.benchmark_group("Layout2 parse");
    group.throughput(Throughput::Elements(NUM_SAMPLES as u64));

    for &bit_depth in BIT_DEPTHS.iter() {
        let bytes = generate_block(bit_depth, &mut rng).encode();
        group.bench_with_input(BenchmarkId::new("bit depth", bit_depth), &bytes, |b, data| {
            b.iter(|| decode_layout2(black_box(data), NUM_SAMPLES as u32, 2).unwrap());
        });
    }
    group.finish();
}

fn benchmark_block_pipeline(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xb9e4);
    let payload = generate_block(16, &mut rng).encode();
    let mut group = c.benchmark_group("Block fetch + decompress + parse");
    group.throughput(Throughput::Elements(NUM_SAMPLES as u64));

    for codec in [Compression::None, Compression::Zlib, Compression::Zstd] {
        let (file, spans) = assemble_file(Layout::Two, codec, 0, &[payload.clone()]);
        let source = BgenSource::from_bytes(file);
        let settings = FileSettings::new(Layout::Two, codec, NUM_SAMPLES as u32);
        let mut block = settings.block(&source, spans[0].0, spans[0].1, 2);

        group.bench_function(BenchmarkId::new("codec", codec), |b| {
            b.iter(|| {
                block.clear_probs();
                black_box(block.probabilities().unwrap().nrows());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_layout2_parse, benchmark_block_pipeline);
criterion_main!(benches);
