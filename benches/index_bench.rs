//! Benchmarks for the interval index algebra
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use gea_cache::cache::index::{difference, group_containing, intersection};
use gea_cache::{IntervalGroup, SegmentEntry, Timestamp};

const HOUR: i64 = 3_600_000_000_000;

/// A synthetic index of `count` one-hour groups separated by one-hour gaps.
fn create_test_index(count: usize) -> Vec<IntervalGroup> {
    (0..count)
        .map(|i| {
            let start = Timestamp::from_nanos(i as i64 * 2 * HOUR);
            let end = Timestamp::from_nanos(i as i64 * 2 * HOUR + HOUR);
            IntervalGroup::from_files(vec![SegmentEntry::new(
                format!("segment_{}", i),
                start,
                end,
            )])
            .unwrap()
        })
        .collect()
}

fn bench_intersection(c: &mut Criterion) {
    let mut group = c.benchmark_group("intersection");

    for size in [10, 100, 1000] {
        let index = create_test_index(size);
        let start = Timestamp::from_nanos(0);
        let end = index.last().unwrap().end;

        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("full_range_{}", size), |b| {
            b.iter(|| intersection(black_box(&index), black_box(start), black_box(end)))
        });

        // A narrow query deep into the index exercises the early-exit scan.
        let mid = Timestamp::from_nanos(size as i64 * HOUR);
        group.bench_function(format!("narrow_{}", size), |b| {
            b.iter(|| intersection(black_box(&index), black_box(mid), black_box(mid)))
        });
    }

    group.finish();
}

fn bench_difference(c: &mut Criterion) {
    let mut group = c.benchmark_group("difference");

    for size in [10, 100, 1000] {
        let index = create_test_index(size);
        let start = Timestamp::from_nanos(0);
        let end = index.last().unwrap().end;

        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("alternating_gaps_{}", size), |b| {
            b.iter(|| difference(black_box(&index), black_box(start), black_box(end)))
        });
    }

    group.finish();
}

fn bench_group_containing(c: &mut Criterion) {
    let index = create_test_index(1000);
    let stamp = index[999].start;

    c.bench_function("group_containing_worst_case", |b| {
        b.iter(|| group_containing(black_box(&index), black_box(stamp)))
    });
}

criterion_group!(
    benches,
    bench_intersection,
    bench_difference,
    bench_group_containing
);
criterion_main!(benches);
