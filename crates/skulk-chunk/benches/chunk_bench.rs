//! Benchmarks for chunk encoding and decoding.
//!
//! Run with: cargo bench --package skulk-chunk
//!
//! ## Benchmark Categories
//!
//! - **Chunk Write**: Push and finish per payload format
//! - **Chunk Read**: Validate, get and decode per payload format
//! - **Merge**: Sort and stitch many chunks into one stream

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use skulk_chunk::{Chunk, Format, IterGen, IterGensAsc, SeriesWriter, WriterConfig};

const FOUR_HOURS: u8 = 20;
const FORMATS: [Format; 3] = [Format::ShortFixed, Format::ShortWithSpan, Format::LongWithSpan];

/// Generate typical time series data (regular intervals, slowly varying values).
fn generate_typical_timeseries(t0: u32, count: u32, interval: u32) -> Vec<(u32, f64)> {
    let mut value = 50.0;
    (0..count)
        .map(|i| {
            value += (f64::from(i) * 0.1).sin() * 0.1;
            (t0 + i * interval, value)
        })
        .collect()
}

fn encode(format: Format, t0: u32, points: &[(u32, f64)]) -> IterGen {
    let mut chunk = Chunk::with_format(t0, FOUR_HOURS, format).unwrap();
    for &(ts, val) in points {
        chunk.push(ts, val).unwrap();
    }
    chunk.into_itergen().unwrap()
}

fn bench_chunk_write(c: &mut Criterion) {
    let t0 = 1_500_000_000 - 1_500_000_000 % 14_400;
    let points = generate_typical_timeseries(t0, 1_440, 10);

    let mut group = c.benchmark_group("chunk_write");
    group.throughput(Throughput::Elements(points.len() as u64));
    for format in FORMATS {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{format:?}")),
            &points,
            |b, points| b.iter(|| encode(format, t0, black_box(points))),
        );
    }
    group.finish();
}

fn bench_chunk_read(c: &mut Criterion) {
    let t0 = 1_500_000_000 - 1_500_000_000 % 14_400;
    let points = generate_typical_timeseries(t0, 1_440, 10);

    let mut group = c.benchmark_group("chunk_read");
    group.throughput(Throughput::Elements(points.len() as u64));
    for format in FORMATS {
        let payload = encode(format, t0, &points).bytes().clone();
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{format:?}")),
            &payload,
            |b, payload| {
                b.iter(|| {
                    let itergen = IterGen::new(t0, black_box(payload.clone())).unwrap();
                    itergen.get().unwrap().map(|p| p.unwrap().val).sum::<f64>()
                })
            },
        );
    }
    group.finish();
}

fn bench_compression_ratio(c: &mut Criterion) {
    let t0 = 1_500_000_000 - 1_500_000_000 % 14_400;
    let points = generate_typical_timeseries(t0, 1_440, 10);
    let raw = points.len() * (std::mem::size_of::<u32>() + std::mem::size_of::<f64>());

    for format in FORMATS {
        let size = encode(format, t0, &points).size();
        println!(
            "{format:?}: {} points, {} bytes, ratio {:.2}:1",
            points.len(),
            size,
            raw as f64 / size as f64
        );
    }

    c.bench_function("chunk_size_long", |b| {
        b.iter(|| encode(Format::LongWithSpan, t0, black_box(&points)).size())
    });
}

fn bench_merge_points(c: &mut Criterion) {
    let start = 1_500_000_000 - 1_500_000_000 % 7_200;
    let mut writer = SeriesWriter::new(WriterConfig::default()).unwrap();
    let mut itergens = Vec::new();
    for (ts, val) in generate_typical_timeseries(start, 100_000, 15) {
        itergens.extend(writer.push(ts, val).unwrap());
    }
    itergens.extend(writer.flush().unwrap());
    itergens.reverse();

    let mut group = c.benchmark_group("merge");
    group.throughput(Throughput::Elements(100_000));
    group.bench_function("sort_and_decode_100k", |b| {
        b.iter(|| {
            let asc = IterGensAsc::from_unsorted(black_box(itergens.clone()));
            asc.points().filter(Result::is_ok).count()
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_chunk_write,
    bench_chunk_read,
    bench_compression_ratio,
    bench_merge_points,
);
criterion_main!(benches);
