use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rage_extract_textures::{decode_surface, TextureFormat};

// Helper to generate compressed input with predictable non-trivial patterns
fn generate_test_data(num_bytes: usize) -> Vec<u8> {
    let mut state = 0x9E37_79B9u32;
    (0..num_bytes)
        .map(|_| {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            (state >> 24) as u8
        })
        .collect()
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Block Texture Decode");

    // 256x256 surface
    let (width, height) = (256usize, 256usize);

    for format in [
        TextureFormat::Dxt1,
        TextureFormat::Dxt3,
        TextureFormat::Dxt5,
        TextureFormat::Bc4,
        TextureFormat::Bc5,
        TextureFormat::Bc7,
    ] {
        let size = format.level_size(width, height);
        let input = generate_test_data(size);
        group.throughput(criterion::Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::new("decode_surface", format!("{format:?}")),
            &input,
            |b, input| {
                b.iter(|| decode_surface(black_box(format), black_box(input), width, height))
            },
        );
    }

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
