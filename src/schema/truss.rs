//! The truss chromosome and its solver outputs.

use std::collections::HashSet;
use std::fmt;

use nalgebra::{DMatrix, Vector3};
use serde::{Deserialize, Serialize};

/// Marker for an absent connection in either slot of an edge.
pub const ABSENT: i64 = -1;

/// Errors raised while turning raw connectivity into members.
#[derive(Debug, thiserror::Error)]
pub enum TrussError {
    #[error("Edge {edge} references node {node}, but the truss has {num_nodes} nodes")]
    NodeOutOfRange {
        edge: usize,
        node: i64,
        num_nodes: usize,
    },
    #[error("Edge {edge} has negative property index {property}")]
    NegativeProperty { edge: usize, property: i64 },
    #[error("Truss has {edges} edges but {properties} property entries")]
    PropertyCount { edges: usize, properties: usize },
}

/// One analysed member: a surviving edge between two distinct nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Member {
    /// Row of the edge in the chromosome.
    pub edge: usize,
    pub start: usize,
    pub end: usize,
    pub property: usize,
}

/// A candidate structure.
///
/// Node indices in `edges` address the user nodes followed by the random
/// nodes. Genetic operators only ever build new trusses; the solver fields are
/// written by the evaluator and the fitness function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Truss {
    /// Fixed nodes shared by the whole population (k x 3).
    #[serde(with = "crate::schema::array")]
    pub user_spec_nodes: DMatrix<f64>,
    /// Design-variable nodes (m x 3).
    #[serde(with = "crate::schema::array")]
    pub rand_nodes: DMatrix<f64>,
    /// Connectivity (e x 2); [`ABSENT`] in either slot disables the edge.
    #[serde(with = "crate::schema::array")]
    pub edges: DMatrix<i64>,
    /// Material table index per edge (e x 1).
    #[serde(with = "crate::schema::array")]
    pub properties: DMatrix<i64>,
    /// Factor of safety per member and load case.
    #[serde(default, with = "crate::schema::array::option")]
    pub fos: Option<DMatrix<f64>>,
    /// Nodal displacements per load case, each `num_nodes x 6`.
    #[serde(default, with = "crate::schema::array::option_list")]
    pub deflection: Option<Vec<DMatrix<f64>>>,
    #[serde(default)]
    pub mass: Option<f64>,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub interference: Option<f64>,
    #[serde(default)]
    pub fitness_score: Option<f64>,
}

impl Truss {
    /// Create an unevaluated truss.
    pub fn new(
        user_spec_nodes: DMatrix<f64>,
        rand_nodes: DMatrix<f64>,
        edges: DMatrix<i64>,
        properties: DMatrix<i64>,
    ) -> Self {
        Self {
            user_spec_nodes,
            rand_nodes,
            edges,
            properties,
            fos: None,
            deflection: None,
            mass: None,
            cost: None,
            interference: None,
            fitness_score: None,
        }
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.user_spec_nodes.nrows() + self.rand_nodes.nrows()
    }

    /// Coordinates of node `index` in the concatenated node list.
    pub fn node(&self, index: usize) -> Option<Vector3<f64>> {
        let user = self.user_spec_nodes.nrows();
        let (matrix, row) = if index < user {
            (&self.user_spec_nodes, index)
        } else if index < self.num_nodes() {
            (&self.rand_nodes, index - user)
        } else {
            return None;
        };
        Some(Vector3::new(
            matrix[(row, 0)],
            matrix[(row, 1)],
            matrix[(row, 2)],
        ))
    }

    /// User nodes followed by random nodes.
    pub fn nodes(&self) -> Vec<Vector3<f64>> {
        (0..self.num_nodes()).filter_map(|i| self.node(i)).collect()
    }

    /// Surviving members in edge order.
    ///
    /// Edges with an absent slot or equal endpoints are skipped, and of several
    /// edges joining the same pair of nodes only the first is kept.
    pub fn members(&self) -> Result<Vec<Member>, TrussError> {
        if self.properties.nrows() != self.edges.nrows() {
            return Err(TrussError::PropertyCount {
                edges: self.edges.nrows(),
                properties: self.properties.nrows(),
            });
        }
        let num_nodes = self.num_nodes();
        let mut seen = HashSet::new();
        let mut members = Vec::with_capacity(self.edges.nrows());
        for edge in 0..self.edges.nrows() {
            let (a, b) = (self.edges[(edge, 0)], self.edges[(edge, 1)]);
            if a < 0 || b < 0 || a == b {
                continue;
            }
            let index = |node: i64| {
                usize::try_from(node)
                    .ok()
                    .filter(|&i| i < num_nodes)
                    .ok_or(TrussError::NodeOutOfRange {
                        edge,
                        node,
                        num_nodes,
                    })
            };
            let (start, end) = (index(a)?, index(b)?);
            if !seen.insert((start.min(end), start.max(end))) {
                continue;
            }
            let raw = self.properties[(edge, 0)];
            let property = usize::try_from(raw)
                .map_err(|_| TrussError::NegativeProperty { edge, property: raw })?;
            members.push(Member {
                edge,
                start,
                end,
                property,
            });
        }
        Ok(members)
    }

    /// Replace self-connected and repeated edges with `[ABSENT, ABSENT]`.
    pub fn neutralize_invalid_edges(&mut self) {
        let mut seen = HashSet::new();
        for edge in 0..self.edges.nrows() {
            let (a, b) = (self.edges[(edge, 0)], self.edges[(edge, 1)]);
            if a < 0 || b < 0 {
                continue;
            }
            if a == b || !seen.insert((a.min(b), a.max(b))) {
                self.edges[(edge, 0)] = ABSENT;
                self.edges[(edge, 1)] = ABSENT;
            }
        }
    }

    /// Drop every solver-written field.
    pub fn clear_results(&mut self) {
        self.fos = None;
        self.deflection = None;
        self.mass = None;
        self.cost = None;
        self.interference = None;
        self.fitness_score = None;
    }
}

impl fmt::Display for Truss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let user = self.user_spec_nodes.nrows();
        let first_case = self.deflection.as_ref().and_then(|cases| cases.first());

        writeln!(f, "Nodes ({} fixed, {} random):", user, self.rand_nodes.nrows())?;
        for (i, node) in self.nodes().iter().enumerate() {
            let kind = if i < user { "user" } else { "rand" };
            write!(
                f,
                "  {i:>3} {kind} ({:>9.4}, {:>9.4}, {:>9.4})",
                node.x, node.y, node.z
            )?;
            if let Some(d) = first_case
                && i < d.nrows()
            {
                write!(
                    f,
                    "  u = ({:.3e}, {:.3e}, {:.3e})",
                    d[(i, 0)],
                    d[(i, 1)],
                    d[(i, 2)]
                )?;
            }
            writeln!(f)?;
        }

        let members = self.members().unwrap_or_default();
        writeln!(f, "Members ({}):", members.len())?;
        for (row, member) in members.iter().enumerate() {
            write!(
                f,
                "  {:>3} -> {:>3}  property {}",
                member.start, member.end, member.property
            )?;
            if let Some(fos) = &self.fos
                && row < fos.nrows()
            {
                let values: Vec<String> = fos.row(row).iter().map(|v| format!("{v:.3}")).collect();
                write!(f, "  fos [{}]", values.join(", "))?;
            }
            writeln!(f)?;
        }

        let show = |value: Option<f64>| value.map_or_else(|| "-".to_string(), |v| format!("{v:.6}"));
        writeln!(f, "Mass: {}", show(self.mass))?;
        writeln!(f, "Cost: {}", show(self.cost))?;
        write!(f, "Fitness: {}", show(self.fitness_score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Truss {
        Truss::new(
            DMatrix::from_row_slice(2, 3, &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0]),
            DMatrix::from_row_slice(2, 3, &[1.0, 1.0, 0.0, 0.0, 1.0, 0.0]),
            DMatrix::from_row_slice(6, 2, &[0, 1, 1, 2, 2, 2, 2, 1, -1, 3, 3, 0]),
            DMatrix::from_row_slice(6, 1, &[0, 1, 2, 3, 4, 5]),
        )
    }

    #[test]
    fn test_nodes_concatenate_user_then_random() {
        let truss = square();
        assert_eq!(truss.num_nodes(), 4);
        assert_eq!(truss.node(2), Some(Vector3::new(1.0, 1.0, 0.0)));
        assert_eq!(truss.node(4), None);
        assert_eq!(truss.nodes().len(), 4);
    }

    #[test]
    fn test_members_skip_invalid_and_duplicates() {
        let members = square().members().unwrap();
        let pairs: Vec<_> = members.iter().map(|m| (m.start, m.end)).collect();
        assert_eq!(pairs, vec![(0, 1), (1, 2), (3, 0)]);
        // The first of the duplicate 1-2 edges keeps its property.
        assert_eq!(members[1].property, 1);
        assert_eq!(members[2].edge, 5);
    }

    #[test]
    fn test_neutralize_invalid_edges() {
        let mut truss = square();
        truss.neutralize_invalid_edges();
        assert_eq!(truss.edges.row(2).iter().copied().collect::<Vec<_>>(), vec![ABSENT, ABSENT]);
        assert_eq!(truss.edges.row(3).iter().copied().collect::<Vec<_>>(), vec![ABSENT, ABSENT]);
        assert_eq!(truss.edges[(4, 1)], 3);
        assert_eq!(truss.members().unwrap(), square().members().unwrap());
    }

    #[test]
    fn test_out_of_range_node_is_an_error() {
        let mut truss = square();
        truss.edges[(0, 1)] = 9;
        assert!(matches!(
            truss.members(),
            Err(TrussError::NodeOutOfRange { edge: 0, node: 9, .. })
        ));
    }

    #[test]
    fn test_json_roundtrip_keeps_types() {
        let mut truss = square();
        truss.fos = Some(DMatrix::from_element(3, 2, 1.5));
        truss.deflection = Some(vec![DMatrix::zeros(4, 6)]);
        truss.mass = Some(2.5);
        let json = serde_json::to_string(&truss).unwrap();
        let parsed: Truss = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, truss);
    }

    #[test]
    fn test_display_lists_members() {
        let text = square().to_string();
        assert!(text.contains("Members (3):"));
        assert!(text.contains("Mass: -"));
    }
}
