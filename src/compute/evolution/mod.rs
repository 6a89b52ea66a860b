//! Genetic search over truss topologies.
//!
//! # Overview
//!
//! - **Random generation** (`generator`): uniform trusses inside the domain
//! - **Operators** (`selector`, `crossover`, `mutator`): rank or tournament
//!   selection, array recombination and bounded perturbation
//! - **Fitness** (`fitness`): structural weighted sum and benchmark functions
//! - **Search** (`search`): the generation loop and its worker pool
//! - **Archive** (`archive`): saving and resuming a search
//!
//! # Example
//!
//! ```rust,no_run
//! use gastop::compute::evolution::EvolutionEngine;
//! use gastop::schema::GastopConfig;
//!
//! let mut engine = EvolutionEngine::new(GastopConfig::default())?;
//! engine.initialize_population(100)?;
//! let result = engine.run_with_callback(Some(20), None, |report| {
//!     println!("Generation {}: best = {:.3}", report.generation, report.best_fitness_score);
//! })?;
//! println!("{}", result.best);
//! # Ok::<(), gastop::compute::evolution::SearchError>(())
//! ```

mod archive;
mod crossover;
mod fitness;
mod generator;
mod mutator;
mod search;
mod selector;

pub use archive::StateArchive;
pub use crossover::{Crossover, single_point_split, two_points_split, uniform_crossover};
pub use fitness::{FitnessError, FitnessFunction, rastrigin, rosenbrock, sphere, weighted_sum};
pub use generator::{TrussGenerator, TrussRng};
pub use mutator::{Boundaries, Mutator, gaussian, pseudo_bit_flip, shuffle_index};
pub use search::{EnginePhase, EvolutionEngine, GenerationSizes, SearchError, SearchResult};
pub use selector::{Selector, inverse_square_rank_probability, tournament};
