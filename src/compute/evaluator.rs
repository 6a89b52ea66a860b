//! Structural evaluation of a truss.

use nalgebra::DMatrix;

use super::{StructuralResponse, solve_frame};
use crate::schema::{
    BeamSection, BoundaryConditions, DOF_PER_NODE, EvaluatorParams, MaterialTable, Member,
    StructSolver, Truss, TrussError,
};

/// Errors that make a truss impossible to evaluate.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error(transparent)]
    Truss(#[from] TrussError),
    #[error("Edge {edge} uses property {property}, but the material table has {available} entries")]
    UnknownProperty {
        edge: usize,
        property: usize,
        available: usize,
    },
    #[error("Boundary conditions describe {boundary} nodes, but the truss has only {nodes}")]
    BoundaryShape { boundary: usize, nodes: usize },
}

/// Factor of safety and deflections of `truss` under every load case.
pub fn evaluate(
    truss: &Truss,
    boundary_conditions: &BoundaryConditions,
    materials: &MaterialTable,
) -> Result<StructuralResponse, EvaluationError> {
    let members = truss.members()?;
    solve_frame(&truss.nodes(), &members, boundary_conditions, materials)
}

/// Sum of `length * area * density` over the surviving members.
pub fn mass(truss: &Truss, materials: &MaterialTable) -> Result<f64, EvaluationError> {
    sum_over_members(truss, materials, |length, section| {
        length * section.x_section_area * section.density
    })
}

/// Sum of `length * cost per length` over the surviving members.
pub fn cost(truss: &Truss, materials: &MaterialTable) -> Result<f64, EvaluationError> {
    sum_over_members(truss, materials, |length, section| length * section.cost)
}

fn sum_over_members(
    truss: &Truss,
    materials: &MaterialTable,
    term: impl Fn(f64, &BeamSection) -> f64,
) -> Result<f64, EvaluationError> {
    let nodes = truss.nodes();
    truss.members()?.iter().try_fold(0.0, |total, member| {
        let section = section_of(member, materials)?;
        let length = (nodes[member.end] - nodes[member.start]).norm();
        Ok(total + term(length, section))
    })
}

fn section_of<'a>(
    member: &Member,
    materials: &'a MaterialTable,
) -> Result<&'a BeamSection, EvaluationError> {
    materials
        .get(member.property)
        .ok_or(EvaluationError::UnknownProperty {
            edge: member.edge,
            property: member.property,
            available: materials.len(),
        })
}

/// Evaluator bound to one problem's boundary conditions and materials.
///
/// Shared read-only by every worker during a run.
#[derive(Debug, Clone)]
pub struct Evaluator {
    solver: StructSolver,
    boundary_conditions: BoundaryConditions,
    materials: MaterialTable,
}

impl Evaluator {
    /// Create a new evaluator from its configuration group.
    pub fn new(params: &EvaluatorParams) -> Self {
        Self {
            solver: params.struct_solver,
            boundary_conditions: params.boundary_conditions.clone(),
            materials: params.materials.clone(),
        }
    }

    /// Evaluate a truss, returning it with fresh solver outputs.
    ///
    /// Self-connected and repeated edges are neutralised in the returned
    /// chromosome. Any previous fitness score is cleared.
    pub fn evaluate(&self, mut truss: Truss) -> Result<Truss, EvaluationError> {
        truss.clear_results();
        truss.neutralize_invalid_edges();

        let response = match self.solver {
            StructSolver::Dsm => evaluate(&truss, &self.boundary_conditions, &self.materials)?,
            StructSolver::Blank => StructuralResponse {
                fos: DMatrix::zeros(truss.members()?.len(), 0),
                deflection: vec![DMatrix::zeros(truss.num_nodes(), DOF_PER_NODE)],
            },
        };
        truss.mass = Some(mass(&truss, &self.materials)?);
        truss.cost = Some(cost(&truss, &self.materials)?);
        truss.fos = Some(response.fos);
        truss.deflection = Some(response.deflection);
        Ok(truss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TubeSpec;
    use approx::assert_relative_eq;

    fn materials() -> MaterialTable {
        MaterialTable::new(vec![
            BeamSection::tube(&TubeSpec {
                name: "a",
                outer_diameter: 0.02,
                inner_diameter: 0.0,
                elastic_modulus: 200e9,
                yield_strength: 250e6,
                density: 8000.0,
                poisson_ratio: 0.3,
                cost: 2.0,
            }),
            BeamSection::tube(&TubeSpec {
                name: "b",
                outer_diameter: 0.04,
                inner_diameter: 0.0,
                elastic_modulus: 70e9,
                yield_strength: 270e6,
                density: 2700.0,
                poisson_ratio: 0.33,
                cost: 5.0,
            }),
        ])
    }

    /// A rod from the origin to (3, 4, 0) plus a duplicate and a self loop.
    fn rod(property: i64) -> Truss {
        Truss::new(
            DMatrix::from_row_slice(1, 3, &[0.0, 0.0, 0.0]),
            DMatrix::from_row_slice(1, 3, &[3.0, 4.0, 0.0]),
            DMatrix::from_row_slice(3, 2, &[0, 1, 1, 0, 1, 1]),
            DMatrix::from_row_slice(3, 1, &[property, 1, 0]),
        )
    }

    #[test]
    fn test_mass_and_cost() {
        let table = materials();
        let section = table.get(0).unwrap();
        let truss = rod(0);
        assert_relative_eq!(
            mass(&truss, &table).unwrap(),
            5.0 * section.x_section_area * 8000.0,
            max_relative = 1e-12
        );
        assert_relative_eq!(cost(&truss, &table).unwrap(), 10.0, max_relative = 1e-12);
    }

    #[test]
    fn test_evaluate_writes_results_and_cleans_edges() {
        let params = EvaluatorParams {
            struct_solver: StructSolver::Dsm,
            boundary_conditions: BoundaryConditions::new(1, 2).with_support(0),
            materials: materials(),
        };
        let mut truss = rod(1);
        truss.fitness_score = Some(3.0);
        let evaluated = Evaluator::new(&params).evaluate(truss).unwrap();

        assert_eq!(evaluated.edges[(1, 0)], -1);
        assert_eq!(evaluated.edges[(2, 1)], -1);
        assert_eq!(evaluated.fos.as_ref().unwrap().shape(), (1, 2));
        assert_eq!(evaluated.deflection.as_ref().unwrap().len(), 2);
        assert!(evaluated.mass.unwrap() > 0.0);
        assert_eq!(evaluated.fitness_score, None);
        // Unloaded member: stress is zero everywhere.
        assert_eq!(evaluated.fos.unwrap()[(0, 0)], crate::compute::FOS_CEILING);
    }

    #[test]
    fn test_blank_solver_skips_structure() {
        let params = EvaluatorParams {
            struct_solver: StructSolver::Blank,
            boundary_conditions: BoundaryConditions::default(),
            materials: materials(),
        };
        let evaluated = Evaluator::new(&params).evaluate(rod(0)).unwrap();
        assert_eq!(evaluated.fos.as_ref().unwrap().shape(), (1, 0));
        assert!(evaluated.deflection.unwrap()[0].iter().all(|&v| v == 0.0));
        assert!(evaluated.cost.unwrap() > 0.0);
    }

    #[test]
    fn test_unknown_property() {
        let table = materials();
        assert!(matches!(
            mass(&rod(7), &table),
            Err(EvaluationError::UnknownProperty { edge: 0, property: 7, available: 2 })
        ));
    }
}
