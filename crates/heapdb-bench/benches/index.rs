//! Index benchmarks for HeapDB.
//!
//! Every benchmark runs once per index kind so the three structures can be
//! compared on the same workload.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use heapdb_bench::workload::{int_entries, lookup_keys};
use heapdb_common::{ColumnType, IndexKind, Key, RecordPos};
use heapdb_index::{IndexContainer, IndexOptions};
use tempfile::TempDir;

fn entries_as_keys(count: usize) -> Vec<(Key, RecordPos)> {
    int_entries(count)
        .into_iter()
        .map(|(k, pos)| (Key::Int(k), pos))
        .collect()
}

fn fresh_index(dir: &TempDir, kind: IndexKind) -> IndexContainer {
    let path = dir.path().join(format!("{}.idx", kind));
    IndexContainer::create(kind, &path, ColumnType::int(), &IndexOptions::default()).unwrap()
}

fn loaded_index(dir: &TempDir, kind: IndexKind, count: usize) -> IndexContainer {
    let mut index = fresh_index(dir, kind);
    index.bulk_insert(entries_as_keys(count)).unwrap();
    index
}

/// Benchmark one-at-a-time inserts in random key order.
fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("index/insert");
    let entries = entries_as_keys(2000);
    group.throughput(Throughput::Elements(entries.len() as u64));

    for kind in IndexKind::ALL {
        group.bench_function(BenchmarkId::from_parameter(kind), |b| {
            b.iter_with_setup(
                || TempDir::new().unwrap(),
                |dir| {
                    let mut index = fresh_index(&dir, kind);
                    for (key, pos) in &entries {
                        index.add(key.clone(), *pos).unwrap();
                    }
                    black_box(index.len())
                },
            );
        });
    }

    group.finish();
}

/// Benchmark building from a batch.
fn bench_bulk_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("index/bulk_build");
    let entries = entries_as_keys(20_000);
    group.throughput(Throughput::Elements(entries.len() as u64));

    for kind in IndexKind::ALL {
        group.bench_function(BenchmarkId::from_parameter(kind), |b| {
            b.iter_with_setup(
                || (TempDir::new().unwrap(), entries.clone()),
                |(dir, batch)| {
                    let mut index = fresh_index(&dir, kind);
                    black_box(index.bulk_insert(batch).unwrap().value.len())
                },
            );
        });
    }

    group.finish();
}

/// Benchmark point lookups, half of them misses.
fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("index/search");
    let keys = lookup_keys(1000, 20_000);
    group.throughput(Throughput::Elements(keys.len() as u64));

    for kind in IndexKind::ALL {
        let dir = TempDir::new().unwrap();
        let index = loaded_index(&dir, kind, 20_000);
        group.bench_function(BenchmarkId::from_parameter(kind), |b| {
            b.iter(|| {
                let mut found = 0;
                for key in &keys {
                    if index.search(Key::Int(*key)).unwrap().value.is_some() {
                        found += 1;
                    }
                }
                black_box(found)
            });
        });
    }

    group.finish();
}

/// Benchmark range scans of growing width.
fn bench_range(c: &mut Criterion) {
    let mut group = c.benchmark_group("index/range");

    for kind in IndexKind::ALL {
        let dir = TempDir::new().unwrap();
        let index = loaded_index(&dir, kind, 20_000);
        for width in [100, 1000].iter() {
            group.throughput(Throughput::Elements(*width as u64));
            group.bench_with_input(BenchmarkId::new(kind.to_string(), width), width, |b, &w| {
                // keys are multiples of 3
                let begin = Key::Int(3000);
                let end = Key::Int(3000 + 3 * (w as i32 - 1));
                b.iter(|| {
                    black_box(
                        index
                            .range_search(begin.clone(), end.clone())
                            .unwrap()
                            .value
                            .len(),
                    )
                });
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_insert, bench_bulk_build, bench_search, bench_range);
criterion_main!(benches);
