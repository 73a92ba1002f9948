//! Benchmarks for oracle response parsing

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use sculpt_oracle::{parse_edit_proposal, parse_scene};
use sculpt_test::{mug, random_scene, Reply};

fn body(reply: Reply) -> String {
    match reply {
        Reply::Body(body) => body,
        _ => unreachable!(),
    }
}

fn bench_parse_mug(c: &mut Criterion) {
    let plain = body(Reply::scene(&mug()));
    let fenced = format!("Here is the model:\n```json\n{}\n```\n", plain);

    c.bench_function("parse_scene_plain", |b| {
        b.iter(|| parse_scene(black_box(&plain)).unwrap())
    });
    c.bench_function("parse_scene_fenced", |b| {
        b.iter(|| parse_scene(black_box(&fenced)).unwrap())
    });
}

fn bench_parse_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_parts");

    for parts in [8, 64, 256] {
        let body = body(Reply::edit(&random_scene(parts, 2), &["part_000"]));
        group.bench_with_input(BenchmarkId::from_parameter(parts), &body, |b, body| {
            b.iter(|| parse_edit_proposal(black_box(body)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse_mug, bench_parse_scaling);
criterion_main!(benches);
