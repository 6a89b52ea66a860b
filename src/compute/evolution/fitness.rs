//! Fitness functions. Lower scores are fitter.

use std::f64::consts::PI;

use nalgebra::DMatrix;

use crate::schema::{FitnessEquation, Truss, WeightedSumParams};

/// Errors raised while scoring a truss.
#[derive(Debug, thiserror::Error)]
pub enum FitnessError {
    #[error("Truss has no {0}; evaluate it before scoring")]
    NotEvaluated(&'static str),
    #[error("Critical node {node} is out of range for {num_nodes} deflected nodes")]
    CriticalNodeOutOfRange { node: usize, num_nodes: usize },
}

/// Scores evaluated trusses with the configured equation.
#[derive(Debug, Clone)]
pub struct FitnessFunction {
    equation: FitnessEquation,
}

impl FitnessFunction {
    /// Create a new fitness function.
    pub fn new(equation: FitnessEquation) -> Self {
        Self { equation }
    }

    /// Score a truss without modifying it.
    pub fn score(&self, truss: &Truss) -> Result<f64, FitnessError> {
        match &self.equation {
            FitnessEquation::WeightedSum(params) => weighted_sum(truss, params),
            FitnessEquation::Sphere => Ok(sphere(&truss.rand_nodes)),
            FitnessEquation::Rosenbrock => Ok(rosenbrock(&truss.rand_nodes)),
            FitnessEquation::Rastrigin => Ok(rastrigin(&truss.rand_nodes)),
        }
    }

    /// Return the truss with its fitness score written.
    pub fn apply(&self, mut truss: Truss) -> Result<Truss, FitnessError> {
        truss.fitness_score = Some(self.score(&truss)?);
        Ok(truss)
    }
}

/// `w_mass * mass + w_fos * max(goal_fos - min fos, 0) + w_deflection * sum of
/// translational deflection norms` over the critical nodes of every load case.
///
/// A truss without members has no factor of safety and receives the full
/// fos penalty. An empty critical node list penalises every node.
pub fn weighted_sum(truss: &Truss, params: &WeightedSumParams) -> Result<f64, FitnessError> {
    let mass = truss.mass.ok_or(FitnessError::NotEvaluated("mass"))?;
    let fos = truss.fos.as_ref().ok_or(FitnessError::NotEvaluated("fos"))?;
    let deflection = truss
        .deflection
        .as_ref()
        .ok_or(FitnessError::NotEvaluated("deflection"))?;

    let min_fos = if fos.is_empty() {
        0.0
    } else {
        fos.iter().copied().fold(f64::INFINITY, f64::min)
    };
    let fos_penalty = (params.goal_fos - min_fos).max(0.0);

    let mut deflection_total = 0.0;
    for case in deflection {
        let num_nodes = case.nrows();
        let mut add_node = |node: usize| -> Result<(), FitnessError> {
            if node >= num_nodes {
                return Err(FitnessError::CriticalNodeOutOfRange { node, num_nodes });
            }
            deflection_total += case.fixed_view::<1, 3>(node, 0).norm();
            Ok(())
        };
        if params.critical_nodes.is_empty() {
            (0..num_nodes).try_for_each(&mut add_node)?;
        } else {
            params.critical_nodes.iter().try_for_each(|&node| add_node(node))?;
        }
    }

    Ok(params.w_mass * mass + params.w_fos * fos_penalty + params.w_deflection * deflection_total)
}

/// Sum of squares of every coordinate.
pub fn sphere(nodes: &DMatrix<f64>) -> f64 {
    nodes.iter().map(|x| x * x).sum()
}

/// Rosenbrock valley over consecutive coordinate pairs.
///
/// The first coordinate is dropped when their count is odd. Minimum 0 with
/// every coordinate equal to 1.
pub fn rosenbrock(nodes: &DMatrix<f64>) -> f64 {
    let flat: Vec<f64> = nodes.transpose().as_slice().to_vec();
    let values = &flat[flat.len() % 2..];
    values
        .chunks_exact(2)
        .map(|pair| {
            let (x, y) = (pair[0], pair[1]);
            100.0 * (x * x - y).powi(2) + (x - 1.0).powi(2)
        })
        .sum()
}

/// Rastrigin function, `10 n + sum(x^2 - 10 cos(2 pi x))`. Minimum 0 at the origin.
pub fn rastrigin(nodes: &DMatrix<f64>) -> f64 {
    let n = nodes.len() as f64;
    10.0 * n
        + nodes
            .iter()
            .map(|x| x * x - 10.0 * (2.0 * PI * x).cos())
            .sum::<f64>()
}
