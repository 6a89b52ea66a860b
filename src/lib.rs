//! GASTOp - Genetic algorithm for truss topology optimization.
//!
//! A population of space frames (nodes, members and member sections) is
//! evolved towards the lightest structure that carries its load cases with a
//! required factor of safety. Each candidate is analysed with the direct
//! stiffness method on 12-DOF beam elements.
//!
//! # Architecture
//!
//! - `schema`: Configuration, materials, boundary conditions and the truss record
//! - `compute`: Frame solver, evaluator and the evolutionary search
//!
//! # Example
//!
//! ```rust,no_run
//! use gastop::{EvolutionEngine, GastopConfig};
//!
//! let config = GastopConfig::default();
//! let mut engine = EvolutionEngine::new(config)?;
//! engine.initialize_population(200)?;
//!
//! let result = engine.run(Some(50), None)?;
//! println!("Best fitness: {:?}", result.best.fitness_score);
//! println!("{}", result.best);
//! # Ok::<(), gastop::compute::evolution::SearchError>(())
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::Evaluator;
pub use compute::evolution::{EvolutionEngine, SearchResult};
pub use schema::{GastopConfig, Truss};
