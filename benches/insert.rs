//! Insert and lookup benchmarks.
//!
//! Every node write is fsynced, so insert numbers are dominated by the disk.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::tempdir;

use blobindex::{BlobIndex, IndexConfig};

fn config() -> IndexConfig {
    IndexConfig::default().with_order(64).with_key_max_len(32)
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    group.sample_size(10);

    for count in [100u64, 500] {
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(BenchmarkId::new("sequential", count), &count, |b, &count| {
            b.iter_with_setup(
                || {
                    let dir = tempdir().unwrap();
                    let index = BlobIndex::create(dir.path().join("bench.idx"), config(), Vec::new())
                        .unwrap();
                    (dir, index)
                },
                |(dir, index)| {
                    for i in 0..count {
                        let key = format!("key{:08}", i);
                        index.insert(key.as_bytes(), 8, i * 8).unwrap();
                    }
                    (dir, index)
                },
            );
        });
    }

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");
    let count = 2_000u64;

    let dir = tempdir().unwrap();
    let values: Vec<u8> = (0..count).flat_map(|i| i.to_le_bytes()).collect();
    let index = BlobIndex::create(dir.path().join("bench.idx"), config(), values).unwrap();
    for i in 0..count {
        index.insert(format!("key{:08}", i).as_bytes(), 8, i * 8).unwrap();
    }

    group.bench_function("existing_key", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key{:08}", i % count);
            i += 7;
            black_box(index.lookup(key.as_bytes()).unwrap())
        });
    });

    group.bench_function("missing_key", |b| {
        b.iter(|| black_box(index.descriptor(b"nokey").unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_insert, bench_lookup);
criterion_main!(benches);
