//! Benchmarks for the frame evaluator and a generation step.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use gastop::{
    compute::{
        Evaluator,
        evolution::{EvolutionEngine, TrussGenerator, TrussRng},
    },
    schema::GastopConfig,
};

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");

    for (num_rand_nodes, num_rand_edges) in [(4, 20), (10, 50), (25, 120)] {
        let mut config = GastopConfig::default();
        config.random_params.num_rand_nodes = num_rand_nodes;
        config.random_params.num_rand_edges = num_rand_edges;

        let evaluator = Evaluator::new(&config.evaluator_params);
        let generator = TrussGenerator::new(
            &config.random_params,
            config.evaluator_params.materials.len(),
        );
        let mut rng = TrussRng::new(42);
        let trusses: Vec<_> = (0..16).map(|_| generator.generate(rng.inner())).collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{num_rand_nodes}n_{num_rand_edges}e")),
            &num_rand_edges,
            |b, _| {
                b.iter(|| {
                    for truss in &trusses {
                        let _ = black_box(evaluator.evaluate(truss.clone()));
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("generation");
    group.sample_size(10);

    for threads in [1, 0] {
        let mut config = GastopConfig::default();
        config.ga_params.num_threads = threads;

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{threads}_threads")),
            &threads,
            |b, _| {
                b.iter(|| {
                    let Ok(mut engine) = EvolutionEngine::new(config.clone()) else {
                        return;
                    };
                    if engine.initialize_population(100).is_ok() {
                        let _ = black_box(engine.run(Some(1), None));
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_evaluate, bench_generation);
criterion_main!(benches);
