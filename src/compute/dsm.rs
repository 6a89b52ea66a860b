//! Direct stiffness method for 3D frames.
//!
//! Every member is a two-node beam with six degrees of freedom per node
//! (three translations, three rotations). Element stiffness matrices are built
//! in the member frame, rotated to global coordinates and scattered into a
//! `6N x 6N` system that is solved once per load case.

use log::{debug, warn};
use nalgebra::{DMatrix, DVector, Matrix3, SMatrix, SVector, Vector3};

use super::EvaluationError;
use crate::schema::{BeamSection, BoundaryConditions, DOF_PER_NODE, MaterialTable, Member};

/// 12 x 12 element matrix.
pub type ElementMatrix = SMatrix<f64, 12, 12>;

/// Factor of safety reported for (numerically) unstressed members.
pub const FOS_CEILING: f64 = 1000.0;

/// Members shorter than this are treated as degenerate.
pub const MIN_MEMBER_LENGTH: f64 = 1e-12;

/// Smallest admissible pivot relative to the largest in the reduced solve.
const PIVOT_TOLERANCE: f64 = 1e-10;

/// Solver output for one truss.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralResponse {
    /// Factor of safety, one row per member and one column per load case.
    pub fos: DMatrix<f64>,
    /// Nodal displacements per load case, each `num_nodes x 6`.
    pub deflection: Vec<DMatrix<f64>>,
}

/// Rotation from global to member coordinates.
///
/// Rows are the member axes expressed in global coordinates: local x runs from
/// start to end, local z is horizontal and local y completes a right-handed
/// frame. Members with no horizontal projection use an azimuth of zero.
/// Returns `None` for a zero-length member.
pub fn rotation_matrix(delta: &Vector3<f64>) -> Option<Matrix3<f64>> {
    let length = delta.norm();
    if length < MIN_MEMBER_LENGTH {
        return None;
    }
    let rho = delta.x.hypot(delta.y);
    let (cos_az, sin_az) = if rho > length * 1e-12 {
        (delta.x / rho, delta.y / rho)
    } else {
        (1.0, 0.0)
    };
    let cos_el = rho / length;
    let sin_el = delta.z / length;
    Some(Matrix3::new(
        cos_el * cos_az,
        cos_el * sin_az,
        sin_el,
        -sin_el * cos_az,
        -sin_el * sin_az,
        cos_el,
        sin_az,
        -cos_az,
        0.0,
    ))
}

/// Block-diagonal 12 x 12 transform built from four copies of `rotation`.
pub fn transformation_matrix(rotation: &Matrix3<f64>) -> ElementMatrix {
    let mut transform = ElementMatrix::zeros();
    for block in 0..4 {
        transform
            .fixed_view_mut::<3, 3>(3 * block, 3 * block)
            .copy_from(rotation);
    }
    transform
}

/// Beam stiffness in member coordinates.
pub fn local_stiffness(length: f64, section: &BeamSection) -> ElementMatrix {
    let l = length;
    let coefficients = [12.0, 6.0 * l, 4.0 * l * l, 2.0 * l * l];
    let ei_y = section.elastic_modulus * section.moment_inertia_y / l.powi(3);
    let ei_z = section.elastic_modulus * section.moment_inertia_z / l.powi(3);
    let y = coefficients.map(|c| c * ei_y);
    let z = coefficients.map(|c| c * ei_z);
    let axial = section.elastic_modulus * section.x_section_area / l;
    let torsion = section.shear_modulus * section.polar_moment_inertia / l;

    let k1 = Matrix3::from_diagonal(&Vector3::new(axial, z[0], y[0]));
    let mut k2 = Matrix3::zeros();
    k2[(1, 2)] = z[1];
    k2[(2, 1)] = -y[1];
    let k3 = Matrix3::from_diagonal(&Vector3::new(torsion, y[2], z[2]));
    let k4 = Matrix3::from_diagonal(&Vector3::new(-torsion, y[3], z[3]));
    let k2t = k2.transpose();

    let layout = [
        [k1, k2, -k1, k2],
        [k2t, k3, -k2t, k4],
        [-k1, -k2, k1, -k2],
        [k2t, k4, -k2t, k3],
    ];
    let mut k = ElementMatrix::zeros();
    for (row, blocks) in layout.iter().enumerate() {
        for (col, block) in blocks.iter().enumerate() {
            k.fixed_view_mut::<3, 3>(3 * row, 3 * col).copy_from(block);
        }
    }
    k
}

/// A member prepared for assembly and stress recovery.
struct Element<'a> {
    dofs: [usize; 12],
    transform: ElementMatrix,
    /// Local stiffness times transform: maps global end displacements to
    /// local end forces.
    local_global: ElementMatrix,
    section: &'a BeamSection,
}

impl<'a> Element<'a> {
    fn new(
        member: &Member,
        nodes: &[Vector3<f64>],
        materials: &'a MaterialTable,
    ) -> Result<Option<Self>, EvaluationError> {
        let section = materials
            .get(member.property)
            .ok_or(EvaluationError::UnknownProperty {
                edge: member.edge,
                property: member.property,
                available: materials.len(),
            })?;
        let delta = nodes[member.end] - nodes[member.start];
        let Some(rotation) = rotation_matrix(&delta) else {
            warn!(
                "Member {} joins coincident nodes {} and {}; it is left out of the stiffness matrix",
                member.edge, member.start, member.end
            );
            return Ok(None);
        };
        let transform = transformation_matrix(&rotation);
        let local_global = local_stiffness(delta.norm(), section) * transform;
        let dofs = std::array::from_fn(|i| {
            let node = if i < DOF_PER_NODE {
                member.start
            } else {
                member.end
            };
            node * DOF_PER_NODE + i % DOF_PER_NODE
        });
        Ok(Some(Self {
            dofs,
            transform,
            local_global,
            section,
        }))
    }

    fn scatter_into(&self, stiffness: &mut DMatrix<f64>) {
        let global = self.transform.transpose() * self.local_global;
        for (row_local, &row) in self.dofs.iter().enumerate() {
            for (col_local, &col) in self.dofs.iter().enumerate() {
                stiffness[(row, col)] += global[(row_local, col_local)];
            }
        }
    }

    /// End forces in member coordinates.
    fn end_forces(&self, displacements: &DVector<f64>) -> SVector<f64, 12> {
        let v = SVector::<f64, 12>::from_fn(|i, _| displacements[self.dofs[i]]);
        self.local_global * v
    }

    fn factor_of_safety(&self, displacements: &DVector<f64>) -> f64 {
        let q = self.end_forces(displacements);
        let s = self.section;
        let od = s.outer_diameter;

        let moment = q[4].hypot(q[5]);
        let bending = moment * od / (2.0 * s.moment_inertia_z);
        let axial = (q[0] / s.x_section_area).abs();
        let torsion = q[3] * od / (2.0 * s.polar_moment_inertia);
        let shear = 2.0 * q[1].hypot(q[2]) / s.x_section_area;

        let von_mises = ((bending + axial).powi(2) + 3.0 * torsion.powi(2))
            .sqrt()
            .max((axial.powi(2) + 3.0 * shear.powi(2)).sqrt());
        if von_mises > s.yield_strength / FOS_CEILING {
            s.yield_strength / von_mises
        } else {
            FOS_CEILING
        }
    }
}

/// Solve every load case of a frame.
///
/// `nodes` and `members` come from an already cleaned truss. A load case whose
/// reduced stiffness matrix is singular reports zero factor of safety for
/// every member and zero displacement.
pub fn solve_frame(
    nodes: &[Vector3<f64>],
    members: &[Member],
    boundary: &BoundaryConditions,
    materials: &MaterialTable,
) -> Result<StructuralResponse, EvaluationError> {
    let num_nodes = nodes.len();
    if boundary.num_nodes() > num_nodes {
        return Err(EvaluationError::BoundaryShape {
            boundary: boundary.num_nodes(),
            nodes: num_nodes,
        });
    }
    let num_cases = boundary.num_load_cases();
    let num_dofs = num_nodes * DOF_PER_NODE;

    let elements = members
        .iter()
        .map(|member| Element::new(member, nodes, materials))
        .collect::<Result<Vec<_>, _>>()?;

    let mut stiffness = DMatrix::zeros(num_dofs, num_dofs);
    for element in elements.iter().flatten() {
        element.scatter_into(&mut stiffness);
    }

    let mut connected = vec![false; num_nodes];
    for member in members {
        connected[member.start] = true;
        connected[member.end] = true;
    }

    let mut fos = DMatrix::zeros(members.len(), num_cases);
    let mut deflection = Vec::with_capacity(num_cases);
    for case in 0..num_cases {
        let free = free_dofs(&connected, boundary, case);
        let load = DVector::from_fn(num_dofs, |i, _| {
            boundary.load(i / DOF_PER_NODE, i % DOF_PER_NODE, case)
        });
        let Some(displacements) = solve_reduced(&stiffness, &load, &free) else {
            debug!("Load case {case}: reduced stiffness matrix is singular");
            deflection.push(DMatrix::zeros(num_nodes, DOF_PER_NODE));
            continue;
        };
        for (row, element) in elements.iter().enumerate() {
            if let Some(element) = element {
                fos[(row, case)] = element.factor_of_safety(&displacements);
            }
        }
        deflection.push(DMatrix::from_fn(num_nodes, DOF_PER_NODE, |node, dof| {
            displacements[node * DOF_PER_NODE + dof]
        }));
    }
    Ok(StructuralResponse { fos, deflection })
}

/// Free DOFs for one load case.
///
/// A node without any member and without load in this case is held fixed;
/// every other node keeps its fixture flags unchanged.
fn free_dofs(connected: &[bool], boundary: &BoundaryConditions, case: usize) -> Vec<usize> {
    let mut free = Vec::with_capacity(connected.len() * DOF_PER_NODE);
    for (node, &has_member) in connected.iter().enumerate() {
        if !has_member && !boundary.is_loaded(node, case) {
            continue;
        }
        for dof in 0..DOF_PER_NODE {
            if !boundary.is_fixed(node, dof, case) {
                free.push(node * DOF_PER_NODE + dof);
            }
        }
    }
    free
}

/// Solve the system restricted to `free`, or `None` when it is singular.
fn solve_reduced(
    stiffness: &DMatrix<f64>,
    load: &DVector<f64>,
    free: &[usize],
) -> Option<DVector<f64>> {
    let mut displacements = DVector::zeros(load.len());
    if free.is_empty() {
        return Some(displacements);
    }
    let n = free.len();
    let k_ff = DMatrix::from_fn(n, n, |r, c| stiffness[(free[r], free[c])]);
    let f_f = DVector::from_fn(n, |r, _| load[free[r]]);

    let lu = k_ff.full_piv_lu();
    let pivots = lu.u().diagonal();
    let largest = pivots.amax();
    if largest == 0.0 || !largest.is_finite() || pivots.amin() <= largest * PIVOT_TOLERANCE {
        return None;
    }
    let solution = lu.solve(&f_f)?;
    if !solution.iter().all(|v| v.is_finite()) {
        return None;
    }
    for (i, &dof) in free.iter().enumerate() {
        displacements[dof] = solution[i];
    }
    Some(displacements)
}
