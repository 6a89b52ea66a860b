//! Genetic search over truss topologies.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::ThreadPool;
use rayon::prelude::*;

use crate::compute::{EvaluationError, Evaluator};
use crate::schema::{
    ConfigError, GastopConfig, GenerationReport, ProgressHistory, Truss, check_fractions,
};

use super::archive::StateArchive;
use super::crossover::Crossover;
use super::fitness::{FitnessError, FitnessFunction};
use super::generator::{TrussGenerator, TrussRng};
use super::mutator::Mutator;
use super::selector::Selector;

/// Errors that abort a search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),
    #[error("Scoring failed: {0}")]
    Fitness(#[from] FitnessError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Could not build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Population is empty; initialize or load it first")]
    EmptyPopulation,
    #[error("Truss {index} has {field} of shape {found:?}, expected {expected:?}")]
    TrussShape {
        index: usize,
        field: &'static str,
        found: (usize, usize),
        expected: (usize, usize),
    },
}

/// Where the engine is in its generation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnginePhase {
    #[default]
    Uninitialized,
    PopulationReady,
    Evaluating,
    Scoring,
    Sorting,
    Reproducing,
    Terminated,
}

/// How the slots of the next generation are split between sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationSizes {
    pub elite: usize,
    pub crossover: usize,
    pub mutation: usize,
    pub random: usize,
}

impl GenerationSizes {
    /// Split `pop_size` slots.
    ///
    /// The crossover count is even so children come in pairs; it is rounded up
    /// when that still fits and down otherwise. The mutation count is clamped
    /// to the slots left, and random trusses fill the remainder.
    pub fn new(
        pop_size: usize,
        num_elite: usize,
        percent_crossover: f64,
        percent_mutation: f64,
    ) -> Result<Self, ConfigError> {
        check_fractions(percent_crossover, percent_mutation)?;
        let elite = num_elite.min(pop_size);
        let open = pop_size - elite;

        let mut crossover = ((open as f64 * percent_crossover).round() as usize).min(open);
        if crossover % 2 == 1 {
            crossover = if crossover < open { crossover + 1 } else { crossover - 1 };
        }
        let mutation = ((open as f64 * percent_mutation).round() as usize).min(open - crossover);

        Ok(Self {
            elite,
            crossover,
            mutation,
            random: open - crossover - mutation,
        })
    }
}

/// Outcome of [`EvolutionEngine::run`].
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Fittest evaluated truss of the last generation.
    pub best: Truss,
    /// One report per generation.
    pub history: ProgressHistory,
}

/// Evolution engine that runs the search.
pub struct EvolutionEngine {
    config: GastopConfig,
    rng: TrussRng,
    generator: TrussGenerator,
    evaluator: Evaluator,
    fitness: FitnessFunction,
    selector: Selector,
    crossover: Crossover,
    mutator: Mutator,
    population: Vec<Truss>,
    phase: EnginePhase,
    generation: usize,
    cancelled: Arc<AtomicBool>,
}

impl EvolutionEngine {
    /// Create a new evolution engine. Every operator is resolved here, once.
    pub fn new(config: GastopConfig) -> Result<Self, SearchError> {
        config.validate()?;
        let num_materials = config.evaluator_params.materials.len();
        let num_nodes = config.random_params.num_nodes();
        Ok(Self {
            rng: TrussRng::new(config.random_params.rng_seed),
            generator: TrussGenerator::new(&config.random_params, num_materials),
            evaluator: Evaluator::new(&config.evaluator_params),
            fitness: FitnessFunction::new(config.fitness_params.clone()),
            selector: Selector::new(config.selector_params),
            crossover: Crossover::new(&config.crossover_params),
            mutator: Mutator::new(
                &config.mutator_params,
                &config.random_params.domain,
                num_nodes,
                num_materials,
            ),
            config,
            population: Vec::new(),
            phase: EnginePhase::Uninitialized,
            generation: 0,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Rebuild an engine from a saved config and population.
    pub fn load_state(archive: &StateArchive) -> Result<Self, SearchError> {
        let (config, population) = archive.load()?;
        let mut engine = Self::new(config)?;
        engine.set_population(population)?;
        info!(
            "Loaded {} trusses from {}",
            engine.population.len(),
            archive.population_path().display()
        );
        Ok(engine)
    }

    pub fn config(&self) -> &GastopConfig {
        &self.config
    }

    pub fn population(&self) -> &[Truss] {
        &self.population
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    /// Generations completed by this engine.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Flag checked between generations; setting it ends `run` early.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Replace the population. Every truss must have the node, edge and
    /// property counts of this engine's configuration.
    pub fn set_population(&mut self, population: Vec<Truss>) -> Result<(), SearchError> {
        for (index, truss) in population.iter().enumerate() {
            if let Some((field, found, expected)) = self.generator.shape_mismatch(truss) {
                return Err(SearchError::TrussShape {
                    index,
                    field,
                    found,
                    expected,
                });
            }
        }
        self.phase = if population.is_empty() {
            EnginePhase::Uninitialized
        } else {
            EnginePhase::PopulationReady
        };
        self.population = population;
        Ok(())
    }

    /// One random, unevaluated truss drawn from the engine's stream.
    pub fn generate_random(&mut self) -> Truss {
        self.generator.generate(self.rng.inner())
    }

    /// Generate `pop_size` random trusses and record the size in the config.
    pub fn initialize_population(&mut self, pop_size: usize) -> Result<(), SearchError> {
        self.config.ga_params.pop_size = pop_size;
        self.config.validate()?;

        let seeds = self.rng.seeds(pop_size);
        let generator = &self.generator;
        let generate = |seed: u64| generator.generate(&mut StdRng::seed_from_u64(seed));
        let population: Vec<Truss> = match build_pool(self.config.ga_params.num_threads)? {
            Some(pool) => pool.install(|| seeds.into_par_iter().map(generate).collect()),
            None => seeds.into_iter().map(generate).collect(),
        };

        debug!("Generated initial population of {pop_size}");
        self.set_population(population)?;
        self.generation = 0;
        Ok(())
    }

    /// Run the search with the configured generation and thread counts, or
    /// the given overrides.
    pub fn run(
        &mut self,
        num_generations: Option<usize>,
        num_threads: Option<usize>,
    ) -> Result<SearchResult, SearchError> {
        self.run_with_callback(num_generations, num_threads, |_| {})
    }

    /// Run the search, reporting each generation to `callback`.
    ///
    /// Every generation is evaluated, scored and sorted, reported, and then
    /// replaced by its offspring. The returned best truss is the fittest of
    /// the last reported generation.
    pub fn run_with_callback<F>(
        &mut self,
        num_generations: Option<usize>,
        num_threads: Option<usize>,
        mut callback: F,
    ) -> Result<SearchResult, SearchError>
    where
        F: FnMut(&GenerationReport),
    {
        if self.population.is_empty() {
            return Err(SearchError::EmptyPopulation);
        }
        let ga = &mut self.config.ga_params;
        if let Some(num_generations) = num_generations {
            ga.num_generations = num_generations;
        }
        if let Some(num_threads) = num_threads {
            ga.num_threads = num_threads;
        }
        let num_generations = ga.num_generations;
        let save_frequency = ga.save_frequency;
        let archive = StateArchive::with_prefix(ga.save_filename_prefix.as_deref().unwrap_or(""));
        let pool = build_pool(ga.num_threads)?;
        self.cancelled.store(false, Ordering::Relaxed);

        let mut history = ProgressHistory::new();
        for current_gen in 0..num_generations {
            if self.cancelled.load(Ordering::Relaxed) {
                info!("Search cancelled after {current_gen} generations");
                break;
            }

            self.evaluate_population(pool.as_ref())?;
            self.score_population(pool.as_ref())?;
            self.sort_population();

            let report = GenerationReport::from_sorted(current_gen, &self.population)
                .ok_or(SearchError::EmptyPopulation)?;
            info!(
                "Generation {}: best {:.6}, median {:.6}, range {:.6}",
                current_gen,
                report.best_fitness_score,
                report.population_median_fitness_score,
                report.population_fitness_score_range
            );
            callback(&report);
            history.push(report);

            self.update_population()?;
            self.generation += 1;

            if save_frequency != 0 && current_gen % save_frequency == 0 {
                self.save_state(&archive)?;
            }
        }
        self.phase = EnginePhase::Terminated;

        let best = match history.generations.last() {
            Some(report) => report.best_truss.clone(),
            None => self
                .population
                .first()
                .cloned()
                .ok_or(SearchError::EmptyPopulation)?,
        };
        Ok(SearchResult { best, history })
    }

    fn evaluate_population(&mut self, pool: Option<&ThreadPool>) -> Result<(), SearchError> {
        self.phase = EnginePhase::Evaluating;
        let evaluator = &self.evaluator;
        let population = std::mem::take(&mut self.population);
        self.population = map_population(pool, population, |truss| evaluator.evaluate(truss))?;
        Ok(())
    }

    fn score_population(&mut self, pool: Option<&ThreadPool>) -> Result<(), SearchError> {
        self.phase = EnginePhase::Scoring;
        let fitness = &self.fitness;
        let population = std::mem::take(&mut self.population);
        self.population = map_population(pool, population, |truss| fitness.apply(truss))?;
        Ok(())
    }

    /// Ascending fitness score; unscored trusses sort last.
    fn sort_population(&mut self) {
        self.phase = EnginePhase::Sorting;
        let score = |truss: &Truss| truss.fitness_score.unwrap_or(f64::INFINITY);
        self.population
            .sort_by(|a, b| score(a).total_cmp(&score(b)));
    }

    /// Replace the sorted population with the next generation.
    pub fn update_population(&mut self) -> Result<(), SearchError> {
        if self.population.is_empty() {
            return Err(SearchError::EmptyPopulation);
        }
        self.phase = EnginePhase::Reproducing;
        let ga = &self.config.ga_params;
        let pop_size = ga.pop_size;
        let sizes = GenerationSizes::new(
            pop_size,
            ga.elite_count(),
            ga.percent_crossover,
            ga.percent_mutation,
        )?;
        debug!("Next generation sizes: {sizes:?}");

        let current = &self.population;
        let rng = self.rng.inner();
        let mut next = Vec::with_capacity(pop_size);

        next.extend(current.iter().take(sizes.elite).cloned());

        let parents = self.selector.select(sizes.crossover, current.len(), rng);
        for pair in parents.chunks_exact(2) {
            let (child_1, child_2) =
                self.crossover
                    .combine(&current[pair[0]], &current[pair[1]], rng);
            next.push(child_1);
            next.push(child_2);
        }

        let parents = self.selector.select(sizes.mutation, current.len(), rng);
        for index in parents {
            next.push(self.mutator.mutate(&current[index], rng));
        }

        // Also covers elites missing from a population smaller than pop_size.
        while next.len() < pop_size {
            next.push(self.generator.generate(rng));
        }

        self.population = next;
        self.phase = EnginePhase::PopulationReady;
        Ok(())
    }

    /// Save config and population.
    ///
    /// The engine is reseeded from its own stream and the new seed written to
    /// the saved config, so an engine loaded from the archive continues with
    /// the same random numbers as this one.
    pub fn save_state(&mut self, archive: &StateArchive) -> Result<(), SearchError> {
        let seed = self.rng.next_seed();
        self.rng = TrussRng::new(seed);
        self.config.random_params.rng_seed = seed;
        archive.save(&self.config, &self.population)
    }
}

/// Worker pool for `num_threads`; `None` runs serially. Zero uses rayon's default.
fn build_pool(num_threads: usize) -> Result<Option<ThreadPool>, SearchError> {
    if num_threads == 1 {
        return Ok(None);
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()?;
    Ok(Some(pool))
}

/// Order-preserving map over owned trusses.
fn map_population<E, F>(
    pool: Option<&ThreadPool>,
    population: Vec<Truss>,
    f: F,
) -> Result<Vec<Truss>, E>
where
    E: Send,
    F: Fn(Truss) -> Result<Truss, E> + Send + Sync,
{
    match pool {
        Some(pool) => pool.install(|| population.into_par_iter().map(&f).collect()),
        None => population.into_iter().map(f).collect(),
    }
}
