//! Parent selection over a population sorted best first.

use rand::Rng;

use crate::schema::SelectionMethod;

/// Samples parent indices with replacement.
#[derive(Debug, Clone, Copy)]
pub struct Selector {
    method: SelectionMethod,
}

impl Selector {
    pub fn new(method: SelectionMethod) -> Self {
        Self { method }
    }

    /// Draw `num_parents` indices into a population of `pop_size` individuals
    /// that is sorted by ascending fitness score.
    pub fn select<R: Rng + ?Sized>(
        &self,
        num_parents: usize,
        pop_size: usize,
        rng: &mut R,
    ) -> Vec<usize> {
        match self.method {
            SelectionMethod::InverseSquareRankProbability => {
                inverse_square_rank_probability(num_parents, pop_size, rng)
            }
            SelectionMethod::Tournament {
                tourn_size,
                tourn_prob,
            } => tournament(num_parents, pop_size, tourn_size, tourn_prob, rng),
        }
    }
}

/// Running sum of `weights`.
fn cumulative(weights: impl Iterator<Item = f64>) -> Vec<f64> {
    weights
        .scan(0.0, |total, w| {
            *total += w;
            Some(*total)
        })
        .collect()
}

/// First index whose cumulative weight is at least a uniform draw in `[0, max)`.
fn sample_cdf<R: Rng + ?Sized>(cdf: &[f64], rng: &mut R) -> usize {
    let max = cdf[cdf.len() - 1];
    let x = rng.r#gen::<f64>() * max;
    cdf.partition_point(|&c| c < x).min(cdf.len() - 1)
}

/// Rank `r` (1 = fittest) is drawn with probability proportional to `1 / sqrt(r)`.
pub fn inverse_square_rank_probability<R: Rng + ?Sized>(
    num_parents: usize,
    pop_size: usize,
    rng: &mut R,
) -> Vec<usize> {
    if pop_size == 0 {
        return Vec::new();
    }
    let cdf = cumulative((1..=pop_size).map(|rank| 1.0 / (rank as f64).sqrt()));
    (0..num_parents).map(|_| sample_cdf(&cdf, rng)).collect()
}

/// For each parent, draw `tourn_size` contestants; the `i`-th best of them
/// wins with probability proportional to `tourn_prob * (1 - tourn_prob)^i`.
pub fn tournament<R: Rng + ?Sized>(
    num_parents: usize,
    pop_size: usize,
    tourn_size: usize,
    tourn_prob: f64,
    rng: &mut R,
) -> Vec<usize> {
    if pop_size == 0 || tourn_size == 0 {
        return Vec::new();
    }
    let cdf = cumulative((0..tourn_size).map(|i| tourn_prob * (1.0 - tourn_prob).powi(i as i32)));
    let mut group = vec![0; tourn_size];
    (0..num_parents)
        .map(|_| {
            for slot in group.iter_mut() {
                *slot = rng.gen_range(0..pop_size);
            }
            // Lower index means fitter in a sorted population.
            group.sort_unstable();
            group[sample_cdf(&cdf, rng)]
        })
        .collect()
}
