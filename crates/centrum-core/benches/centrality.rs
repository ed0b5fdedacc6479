use centrum_core::config::CentralityConfig;
use centrum_core::graph::{Attributes, GraphBuilder, InputFeature, SpatialGraph};
use centrum_core::Metric;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

const SIDES: [usize; 3] = [10, 20, 40];

/// Square street grid with `side * side` intersections and unit blocks.
#[allow(clippy::cast_precision_loss)]
fn grid(side: usize) -> SpatialGraph {
    let mut lines = Vec::with_capacity(2 * side * side);
    for i in 0..side {
        for j in 0..side {
            let (x, y) = (i as f64, j as f64);
            if i + 1 < side {
                lines.push(InputFeature::line(vec![(x, y), (x + 1.0, y)], Attributes::new(), None));
            }
            if j + 1 < side {
                lines.push(InputFeature::line(vec![(x, y), (x, y + 1.0)], Attributes::new(), None));
            }
        }
    }
    GraphBuilder::default()
        .from_features(lines)
        .expect("grid lines are valid")
        .0
}

fn bench_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("centrality.grid");
    group.sample_size(20);

    for side in SIDES {
        let graph = grid(side);
        group.throughput(Throughput::Elements(graph.node_count() as u64));

        for metric in Metric::ALL {
            for parallel in [false, true] {
                let config = CentralityConfig {
                    parallel,
                    normalize_betweenness: false,
                };
                let label = format!("{}/{}", metric.name(), if parallel { "par" } else { "seq" });
                group.bench_with_input(BenchmarkId::new(label, side), &graph, |b, graph| {
                    b.iter(|| black_box(metric.compute(graph, &config)));
                });
            }
        }
    }

    group.finish();
}

criterion_group!(benches, bench_metrics);
criterion_main!(benches);
