//! Performance benchmarks for bibmerge-engine

use bibmerge_engine::{
    apply_plan, ConflictDetector, FieldPatchComputer, InteractiveResolver, MergeConfig, Merger,
    Record, RecordIndex, ResolutionChoice, Snapshot, ThreeWayConflict,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn make_record(i: usize, year: &str) -> Record {
    Record::new("article", format!("key{}", i))
        .with_field("author", format!("Author {}", i))
        .with_field("title", format!("Title {}", i))
        .with_field("journal", "Journal of Benchmarks")
        .with_field("year", year)
}

/// Base plus two sides: local edits every 7th record, remote every 5th,
/// with collisions on multiples of 35.
fn make_snapshots(size: usize) -> (Snapshot, Snapshot, Snapshot) {
    let base: Snapshot = (0..size).map(|i| make_record(i, "2000")).collect();
    let local: Snapshot = (0..size)
        .map(|i| make_record(i, if i % 7 == 0 { "2001" } else { "2000" }))
        .collect();
    let remote: Snapshot = (0..size)
        .map(|i| make_record(i, if i % 5 == 0 { "2002" } else { "2000" }))
        .chain((size..size + size / 10).map(|i| make_record(i, "2002")))
        .collect();
    (base, local, remote)
}

fn bench_field_patch(c: &mut Criterion) {
    let mut group = c.benchmark_group("field_patch");
    let config = MergeConfig::default();

    group.bench_function("compute", |b| {
        let base = make_record(1, "2000");
        let local = make_record(1, "2000").with_field("note", "mine");
        let remote = make_record(1, "2002").with_field("pages", "1--10");
        let computer = FieldPatchComputer::new(&config);

        b.iter(|| computer.compute(black_box(Some(&base)), Some(&local), Some(&remote)))
    });

    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");

    for size in [100usize, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::new("index", size), size, |b, &size| {
            let (base, _, _) = make_snapshots(size);
            b.iter(|| RecordIndex::from_snapshot(black_box(&base)).len())
        });

        group.bench_with_input(BenchmarkId::new("detect", size), size, |b, &size| {
            let (base, local, remote) = make_snapshots(size);
            let config = MergeConfig::default();
            let detector = ConflictDetector::new(&config);

            b.iter(|| detector.detect(black_box(&base), black_box(&local), black_box(&remote)))
        });

        group.bench_with_input(BenchmarkId::new("analyze", size), size, |b, &size| {
            let (base, local, remote) = make_snapshots(size);
            let merger = Merger::default();

            b.iter(|| merger.analyze(black_box(&base), black_box(&local), black_box(&remote)))
        });

        group.bench_with_input(BenchmarkId::new("apply_plan", size), size, |b, &size| {
            let (base, local, remote) = make_snapshots(size);
            let plan = Merger::default().analyze(&base, &local, &remote).auto_plan;

            b.iter(|| {
                let mut target = local.clone();
                apply_plan(black_box(&plan), &mut target)
            })
        });

        group.bench_with_input(BenchmarkId::new("full_merge", size), size, |b, &size| {
            let (base, local, remote) = make_snapshots(size);
            let merger = Merger::default();
            let mut resolver =
                InteractiveResolver::new(|_: &ThreeWayConflict| ResolutionChoice::Remote);

            b.iter(|| {
                merger.merge(
                    black_box(&base),
                    black_box(&local),
                    black_box(&remote),
                    &mut resolver,
                )
            })
        });
    }

    group.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");
    let (base, _, _) = make_snapshots(1000);

    group.bench_function("snapshot_to_json", |b| {
        b.iter(|| black_box(&base).to_json())
    });

    group.bench_function("snapshot_from_json", |b| {
        let json = base.to_json().unwrap();
        b.iter(|| Snapshot::from_json(black_box(&json)))
    });

    group.finish();
}

criterion_group!(benches, bench_field_patch, bench_merge, bench_serialization);
criterion_main!(benches);
