//! 스크레이프 설정 렌더링 벤치마크

use std::net::{IpAddr, Ipv4Addr};

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use meshtest_core::config::MetricsConfig;
use meshtest_metrics::scrape::{scrape_target, ScrapeConfig};

fn targets(count: u8) -> Vec<String> {
    (0..count)
        .map(|i| scrape_target(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2 + i)), 33000))
        .collect()
}

fn bench_render(c: &mut Criterion) {
    let config = MetricsConfig::default();
    let small = ScrapeConfig::new(&config, targets(3));
    let large = ScrapeConfig::new(&config, targets(100));

    c.bench_function("render_3_targets", |b| {
        b.iter(|| black_box(small.render()))
    });
    c.bench_function("render_100_targets", |b| {
        b.iter(|| black_box(large.render()))
    });
    c.bench_function("encode_100_targets", |b| {
        b.iter(|| black_box(large.to_base64()))
    });
}

criterion_group!(benches, bench_render);
criterion_main!(benches);
