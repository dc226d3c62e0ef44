//! Action formatting benchmarks
//!
//! Formatting runs on every dispatch of an instrumented reducer, so it has to
//! stay cheap for the shallow shapes real actions have.
//!
//! Run with: `cargo bench -p composable-signpost-core`

#![allow(missing_docs)] // Benchmarks don't need extensive docs
#![allow(dead_code)] // Benchmark data structures may have unused fields

use composable_signpost_core::describe::{Describe, Field, Shape};
use composable_signpost_core::format::format_action;
use criterion::{Criterion, black_box, criterion_group, criterion_main};

enum FetchError {
    Timeout,
    Status(u16),
}

impl Describe for FetchError {
    fn describe(&self) -> Shape<'_> {
        match self {
            Self::Timeout => Shape::unit("FetchError", "timeout"),
            Self::Status(code) => Shape::case("status", code),
        }
    }
}

enum BenchAction {
    Refresh,
    Loaded { page: u32, cursor: String, items: Vec<u64> },
    Failed(FetchError),
}

impl Describe for BenchAction {
    fn describe(&self) -> Shape<'_> {
        match self {
            Self::Refresh => Shape::unit("BenchAction", "refresh"),
            Self::Loaded { page, cursor, items } => Shape::case_fields(
                "loaded",
                [
                    Field::labeled("page", page),
                    Field::labeled("cursor", cursor),
                    Field::labeled("items", items),
                ],
            ),
            Self::Failed(error) => Shape::case("failed", error),
        }
    }
}

fn bench_format(c: &mut Criterion) {
    let mut group = c.benchmark_group("format_action");

    let refresh = BenchAction::Refresh;
    group.bench_function("unit_variant", |b| {
        b.iter(|| format_action(black_box(&refresh)));
    });

    let loaded = BenchAction::Loaded {
        page: 3,
        cursor: "abc".to_string(),
        items: (0..256).collect(),
    };
    group.bench_function("labeled_fields", |b| {
        b.iter(|| format_action(black_box(&loaded)));
    });

    let failed = BenchAction::Failed(FetchError::Status(503));
    group.bench_function("nested_variant", |b| {
        b.iter(|| format_action(black_box(&failed)));
    });

    group.finish();
}

criterion_group!(benches, bench_format);
criterion_main!(benches);
