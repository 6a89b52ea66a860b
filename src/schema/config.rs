//! Configuration types for a truss topology search.

use serde::{Deserialize, Serialize};

use super::{BoundaryConditions, MaterialTable};

/// Top-level search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GastopConfig {
    /// Population and generation settings.
    #[serde(default)]
    pub ga_params: GaParams,
    /// Problem geometry and random generation.
    pub random_params: RandomParams,
    #[serde(default)]
    pub crossover_params: CrossoverParams,
    #[serde(default)]
    pub mutator_params: MutatorParams,
    #[serde(default)]
    pub selector_params: SelectionMethod,
    /// Structural solver inputs.
    pub evaluator_params: EvaluatorParams,
    /// Objective to minimise.
    pub fitness_params: FitnessEquation,
}

impl Default for GastopConfig {
    /// A wall bracket: three supports on the `x = 0` plane carrying a
    /// downward tip load one metre out.
    fn default() -> Self {
        let user_spec_nodes = vec![
            [0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.5, 1.0],
            [1.0, 0.5, 0.5],
        ];
        let boundary_conditions = BoundaryConditions::new(user_spec_nodes.len(), 1)
            .with_support(0)
            .with_support(1)
            .with_support(2)
            .with_load(3, 0, [0.0, 0.0, -1000.0, 0.0, 0.0, 0.0]);
        Self {
            ga_params: GaParams::default(),
            random_params: RandomParams {
                user_spec_nodes,
                num_rand_nodes: 4,
                num_rand_edges: 20,
                domain: Domain {
                    low: [0.0, 0.0, 0.0],
                    high: [1.0, 1.0, 1.0],
                },
                rng_seed: default_rng_seed(),
            },
            crossover_params: CrossoverParams::default(),
            mutator_params: MutatorParams::default(),
            selector_params: SelectionMethod::default(),
            evaluator_params: EvaluatorParams {
                struct_solver: StructSolver::Dsm,
                boundary_conditions,
                materials: MaterialTable::default(),
            },
            fitness_params: FitnessEquation::WeightedSum(WeightedSumParams {
                goal_fos: 1.5,
                critical_nodes: vec![3],
                w_fos: 10_000.0,
                w_mass: 1.0,
                w_deflection: 100.0,
            }),
        }
    }
}

/// Population and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaParams {
    #[serde(default = "default_pop_size")]
    pub pop_size: usize,
    #[serde(default = "default_num_generations")]
    pub num_generations: usize,
    /// Survivors copied unchanged; defaults to 1% of the population, rounded up.
    #[serde(default)]
    pub num_elite: Option<usize>,
    #[serde(default = "default_percent_crossover")]
    pub percent_crossover: f64,
    #[serde(default = "default_percent_mutation")]
    pub percent_mutation: f64,
    /// Worker threads; 0 uses every core, 1 runs serially.
    #[serde(default)]
    pub num_threads: usize,
    /// Checkpoint every this many generations; 0 disables checkpoints.
    #[serde(default)]
    pub save_frequency: usize,
    #[serde(default)]
    pub save_filename_prefix: Option<String>,
}

impl Default for GaParams {
    fn default() -> Self {
        Self {
            pop_size: default_pop_size(),
            num_generations: default_num_generations(),
            num_elite: None,
            percent_crossover: default_percent_crossover(),
            percent_mutation: default_percent_mutation(),
            num_threads: 0,
            save_frequency: 0,
            save_filename_prefix: None,
        }
    }
}

impl GaParams {
    /// Number of elites, resolving the default.
    pub fn elite_count(&self) -> usize {
        self.num_elite
            .unwrap_or_else(|| self.pop_size.div_ceil(100))
    }
}

fn default_pop_size() -> usize {
    100
}
fn default_num_generations() -> usize {
    50
}
fn default_percent_crossover() -> f64 {
    0.4
}
fn default_percent_mutation() -> f64 {
    0.4
}

/// Axis-aligned box that random nodes live in, `low` inclusive, `high` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub low: [f64; 3],
    pub high: [f64; 3],
}

impl Domain {
    pub fn contains(&self, point: [f64; 3]) -> bool {
        (0..3).all(|axis| point[axis] >= self.low[axis] && point[axis] < self.high[axis])
    }
}

/// Problem geometry and random generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomParams {
    /// Fixed nodes, in the order the boundary conditions describe them.
    pub user_spec_nodes: Vec<[f64; 3]>,
    pub num_rand_nodes: usize,
    pub num_rand_edges: usize,
    pub domain: Domain,
    #[serde(default = "default_rng_seed")]
    pub rng_seed: u64,
}

impl RandomParams {
    /// User plus random node count.
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.user_spec_nodes.len() + self.num_rand_nodes
    }
}

fn default_rng_seed() -> u64 {
    1729
}

/// Recombination of one chromosome array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum CrossoverMethod {
    /// Element-wise random choice between the parents.
    #[default]
    UniformCrossover,
    /// Swap the rows after one random cut.
    SinglePointSplit,
    /// Swap the band of rows between two random cuts.
    TwoPointsSplit,
}

/// Crossover method per chromosome array.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrossoverParams {
    #[serde(default)]
    pub node_method: CrossoverMethod,
    #[serde(default)]
    pub edge_method: CrossoverMethod,
    #[serde(default)]
    pub property_method: CrossoverMethod,
}

/// Perturbation of one chromosome array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum MutationMethod {
    /// Additive normal noise, wrapped back into the array's bounds.
    Gaussian { std: f64 },
    /// Replace each element with probability `proportion` by a uniform draw.
    PseudoBitFlip { proportion: f64 },
    /// Permute a random subset of the elements among themselves.
    ShuffleIndex,
}

impl MutationMethod {
    fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::Gaussian { std } if !(std.is_finite() && std > 0.0) => {
                Err(ConfigError::InvalidStd(std))
            }
            Self::PseudoBitFlip { proportion } if !(0.0..=1.0).contains(&proportion) => {
                Err(ConfigError::InvalidFraction {
                    name: "proportion",
                    value: proportion,
                })
            }
            _ => Ok(()),
        }
    }
}

/// Mutation method per chromosome array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutatorParams {
    #[serde(default = "default_node_mutation")]
    pub node_method: MutationMethod,
    #[serde(default = "default_index_mutation")]
    pub edge_method: MutationMethod,
    #[serde(default = "default_index_mutation")]
    pub property_method: MutationMethod,
}

impl Default for MutatorParams {
    fn default() -> Self {
        Self {
            node_method: default_node_mutation(),
            edge_method: default_index_mutation(),
            property_method: default_index_mutation(),
        }
    }
}

fn default_node_mutation() -> MutationMethod {
    MutationMethod::Gaussian { std: 0.1 }
}
fn default_index_mutation() -> MutationMethod {
    MutationMethod::PseudoBitFlip { proportion: 0.3 }
}

/// Parent selection over a population sorted best first.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum SelectionMethod {
    /// Rank weights proportional to `1 / sqrt(rank)`.
    #[default]
    InverseSquareRankProbability,
    /// Random groups of `tourn_size`; the k-th best of a group wins with
    /// probability proportional to `tourn_prob * (1 - tourn_prob)^k`.
    Tournament { tourn_size: usize, tourn_prob: f64 },
}

/// Structural solver used by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructSolver {
    /// Direct stiffness method on 12-DOF frame elements.
    #[default]
    Dsm,
    /// No structural solve; only mass and cost are computed.
    Blank,
}

/// Inputs shared by every evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatorParams {
    #[serde(default)]
    pub struct_solver: StructSolver,
    #[serde(default)]
    pub boundary_conditions: BoundaryConditions,
    pub materials: MaterialTable,
}

/// Weights of the structural objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedSumParams {
    /// Target minimum factor of safety.
    pub goal_fos: f64,
    /// Nodes whose deflection is penalised; empty means every node.
    #[serde(default)]
    pub critical_nodes: Vec<usize>,
    pub w_fos: f64,
    pub w_mass: f64,
    pub w_deflection: f64,
}

/// Objective to minimise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "equation", rename_all = "snake_case")]
pub enum FitnessEquation {
    /// Mass plus weighted fos shortfall and deflection.
    WeightedSum(WeightedSumParams),
    /// Sum of squares of the random node coordinates.
    Sphere,
    /// Pairwise Rosenbrock valley over the random node coordinates.
    Rosenbrock,
    /// Rastrigin function over the random node coordinates.
    Rastrigin,
}

impl GastopConfig {
    /// Validate every group, including cross-group consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ga = &self.ga_params;
        if ga.pop_size < 2 {
            return Err(ConfigError::PopulationTooSmall(ga.pop_size));
        }
        if ga.elite_count() > ga.pop_size {
            return Err(ConfigError::TooManyElites {
                elites: ga.elite_count(),
                pop_size: ga.pop_size,
            });
        }
        for (name, value) in [
            ("percent_crossover", ga.percent_crossover),
            ("percent_mutation", ga.percent_mutation),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidFraction { name, value });
            }
        }
        check_fractions(ga.percent_crossover, ga.percent_mutation)?;

        let random = &self.random_params;
        let domain = &random.domain;
        if (0..3).any(|axis| !(domain.low[axis] < domain.high[axis])) {
            return Err(ConfigError::InvalidDomain);
        }
        if random.num_rand_edges > 0 && random.num_nodes() < 2 {
            return Err(ConfigError::NotEnoughNodes(random.num_nodes()));
        }

        for method in [
            &self.mutator_params.node_method,
            &self.mutator_params.edge_method,
            &self.mutator_params.property_method,
        ] {
            method.validate()?;
        }

        if let SelectionMethod::Tournament {
            tourn_size,
            tourn_prob,
        } = self.selector_params
        {
            if tourn_size == 0 {
                return Err(ConfigError::InvalidTournamentSize);
            }
            if !(tourn_prob > 0.0 && tourn_prob <= 1.0) {
                return Err(ConfigError::InvalidFraction {
                    name: "tourn_prob",
                    value: tourn_prob,
                });
            }
        }

        let evaluator = &self.evaluator_params;
        evaluator.materials.validate()?;
        if evaluator.struct_solver == StructSolver::Dsm {
            evaluator
                .boundary_conditions
                .validate(random.user_spec_nodes.len())?;
        }

        if let FitnessEquation::WeightedSum(params) = &self.fitness_params {
            for (name, value) in [
                ("w_fos", params.w_fos),
                ("w_mass", params.w_mass),
                ("w_deflection", params.w_deflection),
            ] {
                if !(value.is_finite() && value >= 0.0) {
                    return Err(ConfigError::InvalidWeight { name, value });
                }
            }
            if let Some(&node) = params
                .critical_nodes
                .iter()
                .find(|&&node| node >= random.num_nodes())
            {
                return Err(ConfigError::CriticalNodeOutOfRange {
                    node,
                    num_nodes: random.num_nodes(),
                });
            }
        }
        Ok(())
    }
}

/// Reject crossover and mutation shares that leave a negative remainder.
pub fn check_fractions(crossover: f64, mutation: f64) -> Result<(), ConfigError> {
    if crossover + mutation > 1.0 + 1e-12 {
        return Err(ConfigError::FractionsExceedOne {
            crossover,
            mutation,
        });
    }
    Ok(())
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Population size must be at least 2, got {0}")]
    PopulationTooSmall(usize),
    #[error("{elites} elites requested for a population of {pop_size}")]
    TooManyElites { elites: usize, pop_size: usize },
    #[error("{name} must lie in [0, 1], got {value}")]
    InvalidFraction { name: &'static str, value: f64 },
    #[error(
        "percent_crossover ({crossover}) + percent_mutation ({mutation}) exceeds 1"
    )]
    FractionsExceedOne { crossover: f64, mutation: f64 },
    #[error("Domain low bound must be below high bound on every axis")]
    InvalidDomain,
    #[error("Random edges need at least 2 nodes, got {0}")]
    NotEnoughNodes(usize),
    #[error("Gaussian mutation std must be positive, got {0}")]
    InvalidStd(f64),
    #[error("Tournament size must be non-zero")]
    InvalidTournamentSize,
    #[error("Material table is empty")]
    NoMaterials,
    #[error("Section {index} has invalid {field} = {value}")]
    InvalidSection {
        index: usize,
        field: &'static str,
        value: f64,
    },
    #[error(
        "Boundary conditions must describe {expected} user nodes, got {loads} load rows and {fixtures} fixture rows"
    )]
    BoundaryRows {
        expected: usize,
        loads: usize,
        fixtures: usize,
    },
    #[error("Boundary conditions define no load cases")]
    NoLoadCases,
    #[error("Node {node} DOF {dof} does not have {expected} load cases")]
    LoadCaseMismatch {
        node: usize,
        dof: usize,
        expected: usize,
    },
    #[error("Node {node} DOF {dof} has fixture flag {value}; expected 0 or 1")]
    InvalidFixture { node: usize, dof: usize, value: u8 },
    #[error("Node {node} DOF {dof} has a non-finite load")]
    NonFiniteLoad { node: usize, dof: usize },
    #[error("Weight {name} must be finite and non-negative, got {value}")]
    InvalidWeight { name: &'static str, value: f64 },
    #[error("Critical node {node} is out of range for {num_nodes} nodes")]
    CriticalNodeOutOfRange { node: usize, num_nodes: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GastopConfig::default();
        config.validate().unwrap();
        assert_eq!(config.ga_params.elite_count(), 1);
    }

    #[test]
    fn test_fractions_exceeding_one_are_fatal() {
        let mut config = GastopConfig::default();
        config.ga_params.percent_crossover = 0.7;
        config.ga_params.percent_mutation = 0.4;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::FractionsExceedOne { .. })
        ));
        assert!(check_fractions(0.7, 0.3).is_ok());
    }

    #[test]
    fn test_invalid_domain() {
        let mut config = GastopConfig::default();
        config.random_params.domain.high[1] = config.random_params.domain.low[1];
        assert!(matches!(config.validate(), Err(ConfigError::InvalidDomain)));
    }

    #[test]
    fn test_boundary_shape_checked_for_dsm_only() {
        let mut config = GastopConfig::default();
        config.evaluator_params.boundary_conditions = BoundaryConditions::new(2, 1);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BoundaryRows { expected: 4, .. })
        ));
        config.evaluator_params.struct_solver = StructSolver::Blank;
        config.fitness_params = FitnessEquation::Sphere;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_critical_node_range() {
        let mut config = GastopConfig::default();
        if let FitnessEquation::WeightedSum(params) = &mut config.fitness_params {
            params.critical_nodes = vec![8];
        }
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CriticalNodeOutOfRange { node: 8, num_nodes: 8 })
        ));
    }

    #[test]
    fn test_operator_params() {
        let mut config = GastopConfig::default();
        config.mutator_params.node_method = MutationMethod::Gaussian { std: 0.0 };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidStd(_))));

        let mut config = GastopConfig::default();
        config.selector_params = SelectionMethod::Tournament {
            tourn_size: 0,
            tourn_prob: 0.5,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTournamentSize)
        ));
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let json = r#"{
            "random_params": {
                "user_spec_nodes": [],
                "num_rand_nodes": 3,
                "num_rand_edges": 0,
                "domain": {"low": [-1, -1, -1], "high": [1, 1, 1]}
            },
            "selector_params": {"method": "tournament", "tourn_size": 4, "tourn_prob": 0.6},
            "evaluator_params": {"struct_solver": "blank", "materials": []},
            "fitness_params": {"equation": "rastrigin"}
        }"#;
        let config: GastopConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.ga_params.pop_size, 100);
        assert_eq!(config.random_params.rng_seed, 1729);
        assert_eq!(config.crossover_params.edge_method, CrossoverMethod::UniformCrossover);
        assert_eq!(config.fitness_params, FitnessEquation::Rastrigin);
        // An empty material table is still rejected.
        assert!(matches!(config.validate(), Err(ConfigError::NoMaterials)));
    }

    #[test]
    fn test_method_tags() {
        let json = serde_json::to_value(MutationMethod::PseudoBitFlip { proportion: 0.2 }).unwrap();
        assert_eq!(json["method"], "pseudo_bit_flip");
        let json = serde_json::to_value(CrossoverMethod::TwoPointsSplit).unwrap();
        assert_eq!(json["method"], "two_points_split");
    }
}
