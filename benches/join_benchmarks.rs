use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use geo::{Geometry, Point, Rect, coord};
use topolink::{GeometryMap, JoinConfig, SpatialJoin, StatMeasure};

/// Parcels laid out on a jittered lattice, roughly `cell` units apart.
fn parcels(prefix: &str, n: usize, cell: f64, size: f64) -> GeometryMap {
    let side = (n as f64).sqrt().ceil() as usize;
    (0..n)
        .map(|i| {
            let x = (i % side) as f64 * cell + (i % 7) as f64 * 0.1;
            let y = (i / side) as f64 * cell + (i % 5) as f64 * 0.1;
            let geometry = Geometry::Rect(Rect::new(
                coord! { x: x, y: y },
                coord! { x: x + size, y: y + size },
            ));
            (format!("{}{}", prefix, i), geometry)
        })
        .collect()
}

fn points(prefix: &str, n: usize, cell: f64) -> GeometryMap {
    let side = (n as f64).sqrt().ceil() as usize;
    (0..n)
        .map(|i| {
            let x = (i % side) as f64 * cell + 0.3;
            let y = (i / side) as f64 * cell + 0.7;
            (format!("{}{}", prefix, i), Geometry::Point(Point::new(x, y)))
        })
        .collect()
}

fn benchmark_relations(c: &mut Criterion) {
    let mut group = c.benchmark_group("relations");
    let source = parcels("s", 2_000, 2.0, 2.5);
    let target = parcels("t", 2_000, 2.0, 1.5);
    let join = SpatialJoin::new(JoinConfig::default());

    for relation in ["intersects", "touches", "contains", "disjoint"] {
        group.bench_with_input(BenchmarkId::from_parameter(relation), &relation, |b, r| {
            b.iter(|| join.join(black_box(&source), black_box(&target), r).unwrap())
        });
    }

    group.finish();
}

fn benchmark_workers(c: &mut Criterion) {
    let mut group = c.benchmark_group("workers");
    let source = parcels("s", 5_000, 2.0, 2.5);
    let target = points("p", 5_000, 2.0);

    for workers in [1, 2, 4] {
        let join = SpatialJoin::new(JoinConfig::default().with_workers(workers));
        group.bench_with_input(BenchmarkId::from_parameter(workers), &join, |b, join| {
            b.iter(|| {
                join.join(black_box(&source), black_box(&target), "contains")
                    .unwrap()
            })
        });
    }

    group.finish();
}

fn benchmark_batch_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_size");
    let source = parcels("s", 3_000, 2.0, 3.0);
    let target = parcels("t", 3_000, 2.0, 3.0);

    for batch_size in [10, 100, 1_000, 10_000] {
        let join = SpatialJoin::new(
            JoinConfig::default()
                .with_workers(2)
                .with_batch_size(batch_size),
        );
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            &join,
            |b, join| {
                b.iter(|| {
                    join.join(black_box(&source), black_box(&target), "intersects")
                        .unwrap()
                })
            },
        );
    }

    group.finish();
}

fn benchmark_stat_measure(c: &mut Criterion) {
    let mut group = c.benchmark_group("stat_measure");
    let source = parcels("s", 2_000, 2.0, 4.0);
    let target = points("p", 4_000, 1.0);

    for measure in [
        StatMeasure::Min,
        StatMeasure::Max,
        StatMeasure::Average,
        StatMeasure::Median,
    ] {
        let join = SpatialJoin::new(JoinConfig::default().with_stat_measure(measure));
        group.bench_with_input(BenchmarkId::from_parameter(measure), &join, |b, join| {
            b.iter(|| {
                join.join(black_box(&source), black_box(&target), "intersects")
                    .unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_relations,
    benchmark_workers,
    benchmark_batch_size,
    benchmark_stat_measure
);
criterion_main!(benches);
