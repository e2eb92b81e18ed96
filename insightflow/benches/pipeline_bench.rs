//! Benchmarks for pipeline execution.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use insightflow::agents::Agent;
use insightflow::collaborators::{CsvIngestion, DataIngestion};
use insightflow::pipeline::{PipelineBuilder, PipelineOrchestrator, StageSpec};
use insightflow::testing::{MockAgent, SlowAgent};
use std::fmt::Write as _;
use std::sync::Arc;

fn fan_out(members: usize, parallel: bool) -> PipelineOrchestrator {
    let agents = (0..members).map(|i| Arc::new(SlowAgent::with_delay_ms(format!("agent{i}"), 1)) as Arc<dyn Agent>);
    let stage = if parallel {
        StageSpec::parallel("analyze")
    } else {
        StageSpec::sequential("analyze")
    };
    PipelineBuilder::new("bench")
        .stage(stage.with_agents(agents))
        .and_then(|b| b.terminal(Arc::new(MockAgent::new("terminal"))).build())
        .unwrap()
}

fn stage_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("stage");
    for members in [1, 3, 6] {
        let parallel = fan_out(members, true);
        let sequential = fan_out(members, false);
        group.bench_with_input(BenchmarkId::new("parallel", members), &parallel, |b, p| {
            b.iter(|| runtime.block_on(p.run(Vec::new())));
        });
        group.bench_with_input(BenchmarkId::new("sequential", members), &sequential, |b, p| {
            b.iter(|| runtime.block_on(p.run(Vec::new())));
        });
    }
    group.finish();
}

fn ingestion_benchmark(c: &mut Criterion) {
    let mut csv = String::from("OrderID,OrderDate,Product,Category,Price,Quantity\n");
    for i in 0..5_000 {
        let _ = writeln!(
            csv,
            "{i},2025-01-{:02},Item{},Cat{},{}.5,{}",
            i % 28 + 1,
            i % 50,
            i % 7,
            i % 300,
            if i % 97 == 0 { String::new() } else { (i % 9).to_string() }
        );
    }
    let ingestion = CsvIngestion::new();

    c.bench_function("csv_parse_and_clean", |b| {
        b.iter(|| {
            let table = CsvIngestion::parse(black_box(&csv)).unwrap();
            black_box(ingestion.clean(&table))
        });
    });
}

criterion_group!(benches, stage_benchmark, ingestion_benchmark);
criterion_main!(benches);
