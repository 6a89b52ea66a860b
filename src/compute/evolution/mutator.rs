//! Mutation of a single parent truss.

use nalgebra::{DMatrix, Scalar};
use rand::Rng;
use rand::seq::SliceRandom;
use rand_distr::StandardNormal;

use crate::schema::{Domain, MutationMethod, MutatorParams, Truss};

/// Per-column half-open interval `[low, high)`.
///
/// A single interval is broadcast to every column.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundaries {
    low: Vec<f64>,
    high: Vec<f64>,
}

impl Boundaries {
    /// Create per-column bounds. Both vectors must be non-empty and of equal length.
    pub fn new(low: Vec<f64>, high: Vec<f64>) -> Self {
        debug_assert!(!low.is_empty() && low.len() == high.len());
        Self { low, high }
    }

    /// One interval for every column.
    pub fn uniform(low: f64, high: f64) -> Self {
        Self::new(vec![low], vec![high])
    }

    pub fn from_domain(domain: &Domain) -> Self {
        Self::new(domain.low.to_vec(), domain.high.to_vec())
    }

    /// Interval of column `col`.
    pub fn column(&self, col: usize) -> (f64, f64) {
        let i = col.min(self.low.len() - 1);
        (self.low[i], self.high[i])
    }

    /// Periodic wrap of `value` into the interval of column `col`.
    pub fn wrap(&self, value: f64, col: usize) -> f64 {
        let (low, high) = self.column(col);
        let wrapped = low + (value - low).rem_euclid(high - low);
        // Rounding can land exactly on `high`.
        if wrapped >= high { low } else { wrapped }
    }
}

/// Add normal noise with standard deviation `std`, then wrap periodically
/// into `boundaries`. Integer arrays are rounded and wrapped again.
pub fn gaussian<R: Rng + ?Sized>(
    array: &DMatrix<f64>,
    std: f64,
    boundaries: &Boundaries,
    integer: bool,
    rng: &mut R,
) -> DMatrix<f64> {
    DMatrix::from_fn(array.nrows(), array.ncols(), |r, c| {
        let noise: f64 = rng.sample(StandardNormal);
        let value = boundaries.wrap(array[(r, c)] + noise * std, c);
        if integer {
            boundaries.wrap(value.round(), c)
        } else {
            value
        }
    })
}

/// Replace each element with probability `proportion` by a uniform draw from
/// `boundaries`. Integer arrays are floored.
pub fn pseudo_bit_flip<R: Rng + ?Sized>(
    array: &DMatrix<f64>,
    boundaries: &Boundaries,
    proportion: f64,
    integer: bool,
    rng: &mut R,
) -> DMatrix<f64> {
    DMatrix::from_fn(array.nrows(), array.ncols(), |r, c| {
        let value = if rng.gen_bool(proportion) {
            let (low, high) = boundaries.column(c);
            rng.gen_range(low..high)
        } else {
            array[(r, c)]
        };
        if integer { value.floor() } else { value }
    })
}

/// Select each element when a second uniform draw is below a first one, then
/// permute the selected elements among their own positions.
pub fn shuffle_index<T: Scalar + Copy, R: Rng + ?Sized>(
    array: &DMatrix<T>,
    rng: &mut R,
) -> DMatrix<T> {
    let selected: Vec<usize> = (0..array.len())
        .filter(|_| {
            let a: f64 = rng.r#gen();
            let b: f64 = rng.r#gen();
            b < a
        })
        .collect();
    let mut values: Vec<T> = selected.iter().map(|&i| array[i]).collect();
    values.shuffle(rng);

    let mut child = array.clone();
    for (&i, value) in selected.iter().zip(values) {
        child[i] = value;
    }
    child
}

impl MutationMethod {
    /// Apply this method to a real-valued array.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        array: &DMatrix<f64>,
        boundaries: &Boundaries,
        integer: bool,
        rng: &mut R,
    ) -> DMatrix<f64> {
        match *self {
            Self::Gaussian { std } => gaussian(array, std, boundaries, integer, rng),
            Self::PseudoBitFlip { proportion } => {
                pseudo_bit_flip(array, boundaries, proportion, integer, rng)
            }
            Self::ShuffleIndex => shuffle_index(array, rng),
        }
    }

    /// Apply this method to an index array.
    pub fn apply_integer<R: Rng + ?Sized>(
        &self,
        array: &DMatrix<i64>,
        boundaries: &Boundaries,
        rng: &mut R,
    ) -> DMatrix<i64> {
        if let Self::ShuffleIndex = self {
            return shuffle_index(array, rng);
        }
        self.apply(&array.map(|v| v as f64), boundaries, true, rng)
            .map(|v| v as i64)
    }
}

/// Applies the configured method to each chromosome array.
///
/// Bounds are derived from the problem: nodes stay inside the domain, edge
/// slots in `[-1, num_nodes)` and property indices in `[0, num_materials)`.
#[derive(Debug, Clone)]
pub struct Mutator {
    params: MutatorParams,
    node_bounds: Boundaries,
    edge_bounds: Boundaries,
    property_bounds: Boundaries,
}

impl Mutator {
    pub fn new(
        params: &MutatorParams,
        domain: &Domain,
        num_nodes: usize,
        num_materials: usize,
    ) -> Self {
        Self {
            params: params.clone(),
            node_bounds: Boundaries::from_domain(domain),
            edge_bounds: Boundaries::uniform(-1.0, num_nodes as f64),
            property_bounds: Boundaries::uniform(0.0, num_materials as f64),
        }
    }

    /// A new, unevaluated child of `parent`.
    pub fn mutate<R: Rng + ?Sized>(&self, parent: &Truss, rng: &mut R) -> Truss {
        let nodes = self
            .params
            .node_method
            .apply(&parent.rand_nodes, &self.node_bounds, false, rng);
        let edges = self
            .params
            .edge_method
            .apply_integer(&parent.edges, &self.edge_bounds, rng);
        let properties =
            self.params
                .property_method
                .apply_integer(&parent.properties, &self.property_bounds, rng);
        Truss::new(parent.user_spec_nodes.clone(), nodes, edges, properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_wrap_is_periodic() {
        let bounds = Boundaries::uniform(-1.0, 3.0);
        assert_eq!(bounds.wrap(0.5, 0), 0.5);
        assert_eq!(bounds.wrap(3.5, 0), -0.5);
        assert_eq!(bounds.wrap(-1.5, 2), 2.5);
        assert_eq!(bounds.wrap(3.0, 0), -1.0);
        assert_eq!(bounds.wrap(11.0, 0), -1.0);
    }

    #[test]
    fn test_integer_gaussian_stays_integral() {
        let mut rng = StdRng::seed_from_u64(4);
        let bounds = Boundaries::uniform(-1.0, 10.0);
        let array = DMatrix::from_fn(20, 2, |r, c| ((r + c) % 10) as f64);
        let child = gaussian(&array, 3.0, &bounds, true, &mut rng);
        assert!(child.iter().all(|&v| v.fract() == 0.0 && (-1.0..10.0).contains(&v)));
    }

    #[test]
    fn test_bit_flip_extremes() {
        let mut rng = StdRng::seed_from_u64(8);
        let bounds = Boundaries::uniform(0.0, 4.0);
        let array = DMatrix::from_element(10, 1, 2.0);
        assert_eq!(pseudo_bit_flip(&array, &bounds, 0.0, true, &mut rng), array);

        let flipped = pseudo_bit_flip(&array, &bounds, 1.0, true, &mut rng);
        assert!(flipped.iter().all(|&v| [0.0, 1.0, 2.0, 3.0].contains(&v)));
        assert_ne!(flipped, array);
    }

    #[test]
    fn test_shuffle_index_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(12);
        let array = DMatrix::from_fn(30, 2, |r, c| (r * 2 + c) as i64);
        let child = shuffle_index(&array, &mut rng);
        let mut before: Vec<i64> = array.iter().copied().collect();
        let mut after: Vec<i64> = child.iter().copied().collect();
        before.sort_unstable();
        after.sort_unstable();
        assert_eq!(before, after);
        assert_ne!(child, array);
    }

    #[test]
    fn test_mutate_respects_derived_bounds() {
        let mut rng = StdRng::seed_from_u64(21);
        let domain = Domain {
            low: [0.0, -2.0, 5.0],
            high: [1.0, 2.0, 6.0],
        };
        let mutator = Mutator::new(
            &MutatorParams {
                node_method: MutationMethod::Gaussian { std: 2.0 },
                edge_method: MutationMethod::Gaussian { std: 4.0 },
                property_method: MutationMethod::PseudoBitFlip { proportion: 0.5 },
            },
            &domain,
            6,
            3,
        );
        let parent = Truss::new(
            DMatrix::zeros(2, 3),
            DMatrix::from_row_slice(4, 3, &[0.5, 0.0, 5.5].repeat(4)),
            DMatrix::from_element(8, 2, 2),
            DMatrix::from_element(8, 1, 1),
        );
        for _ in 0..100 {
            let child = mutator.mutate(&parent, &mut rng);
            for r in 0..4 {
                assert!(domain.contains([
                    child.rand_nodes[(r, 0)],
                    child.rand_nodes[(r, 1)],
                    child.rand_nodes[(r, 2)],
                ]));
            }
            assert!(child.edges.iter().all(|&e| (-1..6).contains(&e)));
            assert!(child.properties.iter().all(|&p| (0..3).contains(&p)));
            assert_eq!(child.user_spec_nodes, parent.user_spec_nodes);
        }
    }

    proptest! {
        #[test]
        fn test_gaussian_stays_in_bounds(
            seed in any::<u64>(),
            values in prop::collection::vec(-1e3f64..1e3, 1..40),
            low in -50.0f64..50.0,
            width in 1e-3f64..100.0,
            std in 1e-3f64..1e3,
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let bounds = Boundaries::uniform(low, low + width);
            let array = DMatrix::from_vec(values.len(), 1, values);
            let child = gaussian(&array, std, &bounds, false, &mut rng);
            for &v in child.iter() {
                prop_assert!(v >= low && v < low + width, "{v} outside [{low}, {})", low + width);
            }
        }
    }
}
