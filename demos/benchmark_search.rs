//! Run the search on the benchmark functions, where the optimum is known.
//!
//! ```text
//! cargo run --release --example benchmark_search
//! ```

use gastop::{
    EvolutionEngine,
    schema::{Domain, FitnessEquation, GastopConfig, MutationMethod, StructSolver},
};

fn main() {
    env_logger::init();

    for equation in [
        FitnessEquation::Sphere,
        FitnessEquation::Rosenbrock,
        FitnessEquation::Rastrigin,
    ] {
        let mut config = GastopConfig::default();
        config.random_params.user_spec_nodes.clear();
        config.random_params.num_rand_nodes = 2;
        config.random_params.num_rand_edges = 0;
        config.random_params.domain = Domain {
            low: [-2.0; 3],
            high: [2.0; 3],
        };
        config.evaluator_params.struct_solver = StructSolver::Blank;
        config.mutator_params.node_method = MutationMethod::Gaussian { std: 0.02 };
        config.fitness_params = equation.clone();

        let mut engine = match EvolutionEngine::new(config) {
            Ok(engine) => engine,
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        };
        let result = engine
            .initialize_population(300)
            .and_then(|()| engine.run(Some(300), None));

        match result {
            Ok(result) => {
                println!("{equation:?}");
                println!("  best score: {:.3e}", result.best.fitness_score.unwrap_or(f64::NAN));
                println!("  best nodes: {:?}", result.best.rand_nodes.as_slice());
            }
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
    }
}
