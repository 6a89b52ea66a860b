//! GASTOp CLI - Run a truss topology search from JSON configuration.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use gastop::{EvolutionEngine, GastopConfig};

fn print_usage(program: &str) {
    eprintln!("Usage: {program} <config.json> [generations] [threads] [history.json]");
    eprintln!();
    eprintln!("Evolve a truss topology from JSON configuration.");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  config.json   Path to search configuration file");
    eprintln!("  generations   Number of generations (default: from config)");
    eprintln!("  threads       Worker threads, 0 = all cores, 1 = serial (default: from config)");
    eprintln!("  history.json  Write per-generation progress to this file");
    eprintln!();
    eprintln!("Example configuration is generated with --example flag.");
}

fn print_example_config() {
    match serde_json::to_string_pretty(&GastopConfig::default()) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error serializing example config: {e}");
            std::process::exit(1);
        }
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);
    let generations: Option<usize> = args.get(2).and_then(|s| s.parse().ok());
    let threads: Option<usize> = args.get(3).and_then(|s| s.parse().ok());
    let history_path = args.get(4).map(PathBuf::from);

    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {e}");
        std::process::exit(1);
    });

    let config: GastopConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {e}");
        std::process::exit(1);
    });

    let pop_size = config.ga_params.pop_size;
    println!("GASTOp Truss Search");
    println!("===================");
    println!(
        "Nodes: {} fixed + {} random, edges: {}",
        config.random_params.user_spec_nodes.len(),
        config.random_params.num_rand_nodes,
        config.random_params.num_rand_edges
    );
    let materials: Vec<&str> = config
        .evaluator_params
        .materials
        .iter()
        .map(|section| section.name.as_str())
        .collect();
    println!("Materials: {} [{}]", materials.len(), materials.join(", "));
    println!("Population: {pop_size}");
    println!(
        "Generations: {}",
        generations.unwrap_or(config.ga_params.num_generations)
    );
    println!();

    let mut engine = EvolutionEngine::new(config).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });
    if let Err(e) = engine.initialize_population(pop_size) {
        eprintln!("Error generating population: {e}");
        std::process::exit(1);
    }

    let start = Instant::now();
    let result = engine
        .run_with_callback(generations, threads, |report| {
            println!(
                "  Generation {}: best={:.6}, median={:.6}, range={:.6}",
                report.generation,
                report.best_fitness_score,
                report.population_median_fitness_score,
                report.population_fitness_score_range
            );
        })
        .unwrap_or_else(|e| {
            eprintln!("Error during search: {e}");
            std::process::exit(1);
        });
    let elapsed = start.elapsed();

    println!();
    println!("Best truss:");
    println!("{}", result.best);
    println!(
        "Time: {:.2}s ({:.2} generations/s)",
        elapsed.as_secs_f32(),
        result.history.len() as f32 / elapsed.as_secs_f32()
    );

    if let Some(path) = history_path {
        if let Err(e) = result.history.save(&path) {
            eprintln!("Error writing history: {e}");
            std::process::exit(1);
        }
        println!("Progress written to {}", path.display());
    }
}
