// Benchmarks for FQL generation
// Measures filter construction and rendering for typical host queries

use caracara_filters::{Dialect, FalconFilter, Operator};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn host_filter() -> FalconFilter {
    let mut filter = FalconFilter::new(Dialect::Hosts);
    filter
        .create_new_filter("OS", Some("Windows".into()), None)
        .unwrap();
    filter
        .create_new_filter("Role", Some(vec!["DC", "Server"].into()), Some(Operator::Not))
        .unwrap();
    filter
        .create_new_filter("LastSeen", Some("-7d".into()), Some(Operator::LessOrEqual))
        .unwrap();
    filter
}

fn bench_build_filter(c: &mut Criterion) {
    c.bench_function("build_host_filter", |b| b.iter(|| black_box(host_filter())));
}

fn bench_render_fql(c: &mut Criterion) {
    let filter = host_filter();

    c.bench_function("render_host_fql", |b| {
        b.iter(|| black_box(&filter).get_fql())
    });
}

fn bench_kv_string(c: &mut Criterion) {
    c.bench_function("kv_string_filter", |b| {
        b.iter(|| {
            let mut filter = FalconFilter::new(Dialect::Hosts);
            filter
                .create_new_filter_from_kv_string(black_box("Hostname__NOT"), black_box("a,b,c,d"))
                .unwrap();
            filter
        })
    });
}

criterion_group!(benches, bench_build_filter, bench_render_fql, bench_kv_string);
criterion_main!(benches);
