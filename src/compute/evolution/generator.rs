//! Random truss generation and the engine's random stream.

use nalgebra::DMatrix;
use rand::prelude::*;

use crate::schema::{Domain, RandomParams, Truss};

/// Master random number generator of a search.
///
/// Workers never share it: parallel tasks get child generators seeded from
/// [`TrussRng::next_seed`], so results do not depend on scheduling.
#[derive(Debug, Clone)]
pub struct TrussRng {
    rng: StdRng,
}

impl TrussRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw a seed for a child generator.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }

    /// Draw `count` child seeds.
    pub fn seeds(&mut self, count: usize) -> Vec<u64> {
        (0..count).map(|_| self.next_seed()).collect()
    }

    /// Mutable access for the genetic operators.
    pub fn inner(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

/// Builds random trusses for one problem.
#[derive(Debug, Clone)]
pub struct TrussGenerator {
    user_spec_nodes: DMatrix<f64>,
    num_rand_nodes: usize,
    num_rand_edges: usize,
    domain: Domain,
    num_materials: usize,
}

impl TrussGenerator {
    pub fn new(params: &RandomParams, num_materials: usize) -> Self {
        let flat: Vec<f64> = params.user_spec_nodes.iter().flatten().copied().collect();
        Self {
            user_spec_nodes: DMatrix::from_row_slice(params.user_spec_nodes.len(), 3, &flat),
            num_rand_nodes: params.num_rand_nodes,
            num_rand_edges: params.num_rand_edges,
            domain: params.domain,
            num_materials,
        }
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.user_spec_nodes.nrows() + self.num_rand_nodes
    }

    /// First matrix of `truss` whose shape differs from what this generator
    /// builds, as `(field, found, expected)`.
    pub fn shape_mismatch(
        &self,
        truss: &Truss,
    ) -> Option<(&'static str, (usize, usize), (usize, usize))> {
        let expected = [
            ("user_spec_nodes", truss.user_spec_nodes.shape(), self.user_spec_nodes.shape()),
            ("rand_nodes", truss.rand_nodes.shape(), (self.num_rand_nodes, 3)),
            ("edges", truss.edges.shape(), (self.num_rand_edges, 2)),
            ("properties", truss.properties.shape(), (self.num_rand_edges, 1)),
        ];
        expected
            .into_iter()
            .find(|(_, found, expected)| found != expected)
    }

    /// Uniform nodes inside the domain, uniform edges between existing nodes
    /// and uniform property indices.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Truss {
        let domain = &self.domain;
        let rand_nodes = DMatrix::from_fn(self.num_rand_nodes, 3, |_, axis| {
            rng.gen_range(domain.low[axis]..domain.high[axis])
        });
        let num_nodes = self.num_nodes() as i64;
        let edges = DMatrix::from_fn(self.num_rand_edges, 2, |_, _| rng.gen_range(0..num_nodes));
        let num_materials = self.num_materials as i64;
        let properties =
            DMatrix::from_fn(self.num_rand_edges, 1, |_, _| rng.gen_range(0..num_materials));
        Truss::new(self.user_spec_nodes.clone(), rand_nodes, edges, properties)
    }
}
