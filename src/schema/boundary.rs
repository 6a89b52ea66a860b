//! Loads and fixtures applied to the user-specified nodes.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Degrees of freedom per node: three translations then three rotations.
pub const DOF_PER_NODE: usize = 6;

/// Boundary conditions keyed by node, degree of freedom and load case.
///
/// `loads[node][dof][case]` is the force (or moment) applied to that DOF and
/// `fixtures[node][dof][case]` is `1` when the DOF is held fixed. Rows exist
/// for the user-specified nodes only; every node past the last row is
/// unloaded and free.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundaryConditions {
    pub loads: Vec<[Vec<f64>; DOF_PER_NODE]>,
    pub fixtures: Vec<[Vec<u8>; DOF_PER_NODE]>,
}

impl BoundaryConditions {
    /// Create unloaded, unfixed conditions for `num_nodes` nodes.
    pub fn new(num_nodes: usize, num_load_cases: usize) -> Self {
        Self {
            loads: vec![std::array::from_fn(|_| vec![0.0; num_load_cases]); num_nodes],
            fixtures: vec![std::array::from_fn(|_| vec![0; num_load_cases]); num_nodes],
        }
    }

    /// Set the six load components of `node` in `case`.
    pub fn with_load(mut self, node: usize, case: usize, load: [f64; DOF_PER_NODE]) -> Self {
        for (dof, value) in load.into_iter().enumerate() {
            self.loads[node][dof][case] = value;
        }
        self
    }

    /// Set which of the six DOFs of `node` are fixed in `case`.
    pub fn with_fixture(mut self, node: usize, case: usize, fixed: [bool; DOF_PER_NODE]) -> Self {
        for (dof, flag) in fixed.into_iter().enumerate() {
            self.fixtures[node][dof][case] = u8::from(flag);
        }
        self
    }

    /// Fix every DOF of `node` in every load case.
    pub fn with_support(mut self, node: usize) -> Self {
        for case in 0..self.num_load_cases() {
            self = self.with_fixture(node, case, [true; DOF_PER_NODE]);
        }
        self
    }

    /// Number of node rows described.
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.loads.len()
    }

    /// Number of load cases, taken from the first load row.
    pub fn num_load_cases(&self) -> usize {
        self.loads.first().map_or(0, |row| row[0].len())
    }

    /// Applied load, zero for nodes or cases beyond the described rows.
    #[inline]
    pub fn load(&self, node: usize, dof: usize, case: usize) -> f64 {
        self.loads
            .get(node)
            .and_then(|row| row[dof].get(case))
            .copied()
            .unwrap_or(0.0)
    }

    /// Whether a DOF is fixed; nodes beyond the described rows are free.
    #[inline]
    pub fn is_fixed(&self, node: usize, dof: usize, case: usize) -> bool {
        self.fixtures
            .get(node)
            .and_then(|row| row[dof].get(case))
            .is_some_and(|&flag| flag != 0)
    }

    /// Whether any component of the load on `node` is nonzero in `case`.
    pub fn is_loaded(&self, node: usize, case: usize) -> bool {
        (0..DOF_PER_NODE).any(|dof| self.load(node, dof, case) != 0.0)
    }

    /// Check shapes against the number of user-specified nodes.
    pub fn validate(&self, num_user_nodes: usize) -> Result<(), ConfigError> {
        if self.loads.len() != num_user_nodes || self.fixtures.len() != num_user_nodes {
            return Err(ConfigError::BoundaryRows {
                expected: num_user_nodes,
                loads: self.loads.len(),
                fixtures: self.fixtures.len(),
            });
        }
        let cases = self.num_load_cases();
        if num_user_nodes > 0 && cases == 0 {
            return Err(ConfigError::NoLoadCases);
        }
        for node in 0..num_user_nodes {
            for dof in 0..DOF_PER_NODE {
                let loads = &self.loads[node][dof];
                let fixtures = &self.fixtures[node][dof];
                if loads.len() != cases || fixtures.len() != cases {
                    return Err(ConfigError::LoadCaseMismatch {
                        node,
                        dof,
                        expected: cases,
                    });
                }
                if let Some(&value) = fixtures.iter().find(|&&flag| flag > 1) {
                    return Err(ConfigError::InvalidFixture { node, dof, value });
                }
                if loads.iter().any(|load| !load.is_finite()) {
                    return Err(ConfigError::NonFiniteLoad { node, dof });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_and_accessors() {
        let bc = BoundaryConditions::new(2, 2)
            .with_support(0)
            .with_load(1, 1, [0.0, 0.0, -5.0, 0.0, 0.0, 0.0]);
        assert_eq!(bc.num_nodes(), 2);
        assert_eq!(bc.num_load_cases(), 2);
        assert!(bc.is_fixed(0, 3, 1));
        assert!(!bc.is_fixed(1, 0, 0));
        assert!(!bc.is_loaded(1, 0));
        assert!(bc.is_loaded(1, 1));
        assert_eq!(bc.load(1, 2, 1), -5.0);
        assert!(bc.validate(2).is_ok());
    }

    #[test]
    fn test_rows_beyond_user_nodes_are_free() {
        let bc = BoundaryConditions::new(1, 1).with_support(0);
        assert_eq!(bc.load(7, 0, 0), 0.0);
        assert!(!bc.is_fixed(7, 0, 0));
        assert!(!bc.is_loaded(7, 0));
    }

    #[test]
    fn test_validate_shapes() {
        let bc = BoundaryConditions::new(2, 1);
        assert!(matches!(
            bc.validate(3),
            Err(ConfigError::BoundaryRows { expected: 3, .. })
        ));

        let mut ragged = BoundaryConditions::new(2, 2);
        ragged.fixtures[1][4].pop();
        assert!(matches!(
            ragged.validate(2),
            Err(ConfigError::LoadCaseMismatch { node: 1, dof: 4, .. })
        ));

        let mut bad_flag = BoundaryConditions::new(1, 1);
        bad_flag.fixtures[0][0][0] = 2;
        assert!(matches!(
            bad_flag.validate(1),
            Err(ConfigError::InvalidFixture { value: 2, .. })
        ));

        assert!(matches!(
            BoundaryConditions::new(1, 0).validate(1),
            Err(ConfigError::NoLoadCases)
        ));
    }

    #[test]
    fn test_json_layout() {
        let json = r#"{
            "loads": [[[0.0], [0.0], [-10.0], [0.0], [0.0], [0.0]]],
            "fixtures": [[[0], [0], [0], [1], [1], [1]]]
        }"#;
        let bc: BoundaryConditions = serde_json::from_str(json).unwrap();
        assert_eq!(bc.load(0, 2, 0), -10.0);
        assert!(bc.is_fixed(0, 5, 0));
        assert!(!bc.is_fixed(0, 0, 0));
    }
}
