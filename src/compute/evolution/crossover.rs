//! Recombination of two parent trusses.

use nalgebra::{DMatrix, Scalar};
use rand::Rng;
use rand::seq::index;

use crate::schema::{CrossoverMethod, CrossoverParams, Truss};

impl CrossoverMethod {
    /// Apply this method to a pair of equally shaped arrays.
    pub fn apply<T: Scalar + Copy, R: Rng + ?Sized>(
        &self,
        a: &DMatrix<T>,
        b: &DMatrix<T>,
        rng: &mut R,
    ) -> (DMatrix<T>, DMatrix<T>) {
        match self {
            Self::UniformCrossover => uniform_crossover(a, b, rng),
            Self::SinglePointSplit => single_point_split(a, b, rng),
            Self::TwoPointsSplit => two_points_split(a, b, rng),
        }
    }
}

/// Each element comes from `a` or `b` by a fair coin; the second child takes
/// the other parent's element.
pub fn uniform_crossover<T: Scalar + Copy, R: Rng + ?Sized>(
    a: &DMatrix<T>,
    b: &DMatrix<T>,
    rng: &mut R,
) -> (DMatrix<T>, DMatrix<T>) {
    debug_assert_eq!(a.shape(), b.shape());
    let mask = DMatrix::from_fn(a.nrows(), a.ncols(), |_, _| rng.gen_bool(0.5));
    let child1 = DMatrix::from_fn(a.nrows(), a.ncols(), |r, c| {
        if mask[(r, c)] { a[(r, c)] } else { b[(r, c)] }
    });
    let child2 = DMatrix::from_fn(a.nrows(), a.ncols(), |r, c| {
        if mask[(r, c)] { b[(r, c)] } else { a[(r, c)] }
    });
    (child1, child2)
}

/// Rows `[start, end)` taken from `inner`, the rest from `outer`.
fn splice<T: Scalar + Copy>(
    outer: &DMatrix<T>,
    inner: &DMatrix<T>,
    start: usize,
    end: usize,
) -> DMatrix<T> {
    DMatrix::from_fn(outer.nrows(), outer.ncols(), |r, c| {
        if (start..end).contains(&r) {
            inner[(r, c)]
        } else {
            outer[(r, c)]
        }
    })
}

/// Swap every row from one random cut point onwards.
pub fn single_point_split<T: Scalar + Copy, R: Rng + ?Sized>(
    a: &DMatrix<T>,
    b: &DMatrix<T>,
    rng: &mut R,
) -> (DMatrix<T>, DMatrix<T>) {
    debug_assert_eq!(a.shape(), b.shape());
    let rows = a.nrows();
    if rows == 0 {
        return (a.clone(), b.clone());
    }
    let point = rng.gen_range(0..rows);
    (splice(a, b, point, rows), splice(b, a, point, rows))
}

/// Swap the band of rows between two distinct random cut points.
pub fn two_points_split<T: Scalar + Copy, R: Rng + ?Sized>(
    a: &DMatrix<T>,
    b: &DMatrix<T>,
    rng: &mut R,
) -> (DMatrix<T>, DMatrix<T>) {
    debug_assert_eq!(a.shape(), b.shape());
    let rows = a.nrows();
    if rows == 0 {
        return (a.clone(), b.clone());
    }
    let cuts = index::sample(rng, rows + 1, 2);
    let (start, end) = (cuts.index(0).min(cuts.index(1)), cuts.index(0).max(cuts.index(1)));
    (splice(a, b, start, end), splice(b, a, start, end))
}

/// Applies the configured method to each chromosome array.
#[derive(Debug, Clone)]
pub struct Crossover {
    params: CrossoverParams,
}

impl Crossover {
    pub fn new(params: &CrossoverParams) -> Self {
        Self {
            params: params.clone(),
        }
    }

    /// Two new, unevaluated children sharing the parents' fixed nodes.
    pub fn combine<R: Rng + ?Sized>(
        &self,
        truss_1: &Truss,
        truss_2: &Truss,
        rng: &mut R,
    ) -> (Truss, Truss) {
        let params = &self.params;
        let (nodes_1, nodes_2) = params
            .node_method
            .apply(&truss_1.rand_nodes, &truss_2.rand_nodes, rng);
        let (edges_1, edges_2) = params
            .edge_method
            .apply(&truss_1.edges, &truss_2.edges, rng);
        let (properties_1, properties_2) =
            params
                .property_method
                .apply(&truss_1.properties, &truss_2.properties, rng);
        (
            Truss::new(truss_1.user_spec_nodes.clone(), nodes_1, edges_1, properties_1),
            Truss::new(truss_1.user_spec_nodes.clone(), nodes_2, edges_2, properties_2),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn matrix(rows: usize, cols: usize, offset: f64) -> DMatrix<f64> {
        DMatrix::from_fn(rows, cols, |r, c| offset + (r * cols + c) as f64)
    }

    #[test]
    fn test_identical_parents_are_reproduced() {
        let mut rng = StdRng::seed_from_u64(0);
        let a = matrix(6, 3, 0.5);
        for method in [
            CrossoverMethod::UniformCrossover,
            CrossoverMethod::SinglePointSplit,
            CrossoverMethod::TwoPointsSplit,
        ] {
            let (c1, c2) = method.apply(&a, &a, &mut rng);
            assert_eq!(c1, a);
            assert_eq!(c2, a);
        }
    }

    #[test]
    fn test_single_point_split_swaps_tail() {
        let mut rng = StdRng::seed_from_u64(17);
        let a = DMatrix::from_element(8, 2, 0i64);
        let b = DMatrix::from_element(8, 2, 1i64);
        for _ in 0..20 {
            let (c1, c2) = single_point_split(&a, &b, &mut rng);
            let point = (0..8).find(|&r| c1[(r, 0)] == 1).unwrap();
            assert!((point..8).all(|r| c1[(r, 0)] == 1 && c1[(r, 1)] == 1));
            assert!((0..point).all(|r| c1[(r, 1)] == 0));
            assert_eq!(&c1 + &c2, DMatrix::from_element(8, 2, 1));
        }
    }

    #[test]
    fn test_two_points_split_swaps_one_band() {
        let mut rng = StdRng::seed_from_u64(5);
        let a = DMatrix::from_element(10, 1, 0i64);
        let b = DMatrix::from_element(10, 1, 1i64);
        for _ in 0..50 {
            let (c1, c2) = two_points_split(&a, &b, &mut rng);
            let swapped: Vec<usize> = (0..10).filter(|&r| c1[(r, 0)] == 1).collect();
            if let (Some(&first), Some(&last)) = (swapped.first(), swapped.last()) {
                assert_eq!(swapped.len(), last - first + 1, "band must be contiguous");
            }
            assert!((0..10).all(|r| c1[(r, 0)] + c2[(r, 0)] == 1));
        }
    }

    #[test]
    fn test_combine_keeps_fixed_nodes_and_clears_results() {
        let mut rng = StdRng::seed_from_u64(2);
        let user = matrix(2, 3, 100.0);
        let mut t1 = Truss::new(
            user.clone(),
            matrix(3, 3, 0.0),
            DMatrix::from_element(4, 2, 0),
            DMatrix::from_element(4, 1, 0),
        );
        let t2 = Truss::new(
            user.clone(),
            matrix(3, 3, 50.0),
            DMatrix::from_element(4, 2, 1),
            DMatrix::from_element(4, 1, 1),
        );
        t1.fitness_score = Some(1.0);
        let crossover = Crossover::new(&CrossoverParams {
            node_method: CrossoverMethod::TwoPointsSplit,
            edge_method: CrossoverMethod::UniformCrossover,
            property_method: CrossoverMethod::SinglePointSplit,
        });
        let (c1, c2) = crossover.combine(&t1, &t2, &mut rng);
        assert_eq!(c1.user_spec_nodes, user);
        assert_eq!(c2.user_spec_nodes, user);
        assert_eq!(c1.fitness_score, None);
        assert_eq!(c1.edges.shape(), (4, 2));
        assert_eq!(c2.properties.shape(), (4, 1));
    }

    proptest! {
        #[test]
        fn test_uniform_crossover_conserves_elements(
            seed in any::<u64>(),
            rows in 1usize..12,
            cols in 1usize..4,
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let a = matrix(rows, cols, 0.0);
            let b = matrix(rows, cols, 1000.0);
            let (c1, c2) = uniform_crossover(&a, &b, &mut rng);
            for r in 0..rows {
                for c in 0..cols {
                    let from_a = c1[(r, c)] == a[(r, c)] && c2[(r, c)] == b[(r, c)];
                    let from_b = c1[(r, c)] == b[(r, c)] && c2[(r, c)] == a[(r, c)];
                    prop_assert!(from_a || from_b);
                }
            }
        }
    }
}
