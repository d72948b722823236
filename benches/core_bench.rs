//! Benchmarks for deskplan core operations.
//!
//! Run with: cargo bench
//!
//! Results include 95% confidence intervals via Criterion.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use deskplan::audit::plan_fingerprint;
use deskplan::catalog::{matcher::LaunchMatcher, LaunchEntry};
use deskplan::core::guardrails::{validate_guardrails, GuardrailLimits};
use deskplan::core::parser::parse_plan;

fn plan_json(steps: usize) -> String {
    let mut items = Vec::with_capacity(steps);
    for i in 0..steps {
        let step = match i % 4 {
            0 => r#"{"action":"switch_app","args":{"app_name":"Firefox"}}"#.to_string(),
            1 => r#"{"action":"go_url","args":{"url":"https://example.com"}}"#.to_string(),
            2 => format!(r#"{{"action":"insert_text","args":{{"text":"line {i}"}}}}"#),
            _ => r#"{"action":"sleep","args":{"ms":10}}"#.to_string(),
        };
        items.push(step);
    }
    format!(r#"{{"steps":[{}],"summary":"bench"}}"#, items.join(","))
}

fn bench_parse_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_plan");
    for steps in [1, 4, 12, 64] {
        let raw = plan_json(steps);
        group.bench_with_input(BenchmarkId::from_parameter(steps), &raw, |b, raw| {
            b.iter(|| {
                let plan = parse_plan(black_box(raw)).unwrap();
                black_box(plan);
            });
        });
    }
    group.finish();
}

fn bench_guardrails(c: &mut Criterion) {
    let limits = GuardrailLimits {
        max_steps: 1000,
        max_total_sleep_ms: 1_000_000,
        ..GuardrailLimits::default()
    };
    let mut group = c.benchmark_group("validate_guardrails");
    for steps in [12, 64, 256] {
        let plan = parse_plan(&plan_json(steps)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(steps), &plan, |b, plan| {
            b.iter(|| {
                let _ = black_box(validate_guardrails(black_box(plan), &limits));
            });
        });
    }
    group.finish();
}

fn bench_fingerprint(c: &mut Criterion) {
    let plan = parse_plan(&plan_json(12)).unwrap();
    c.bench_function("plan_fingerprint", |b| {
        b.iter(|| black_box(plan_fingerprint(black_box(&plan))));
    });
}

fn bench_rank(c: &mut Criterion) {
    let matcher = LaunchMatcher::default();
    let mut group = c.benchmark_group("catalog_rank");
    for size in [50, 300, 2000] {
        let entries: Vec<LaunchEntry> = (0..size)
            .map(|i| LaunchEntry::new(&format!("App {i} Editor"), &format!("/usr/bin/app{i}")))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &entries, |b, entries| {
            b.iter(|| {
                let ranked = matcher.rank(black_box("open the app 42 editor"), entries, 300);
                black_box(ranked.len());
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_parse_plan,
    bench_guardrails,
    bench_fingerprint,
    bench_rank
);
criterion_main!(benches);
