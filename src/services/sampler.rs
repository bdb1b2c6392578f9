use rand::{
    distributions::{Distribution, WeightedIndex},
    rngs::StdRng,
    seq::SliceRandom,
    Rng, SeedableRng,
};

use crate::errors::{AppError, AppResult};

pub const DEFAULT_WEIGHT_EXPONENT: f64 = 50.0;
pub const DEFAULT_WEIGHT_EPSILON: f64 = 1e-6;

/// Source of item positions for the selection loop.
pub trait IndexSampler: Send {
    fn next_index(&mut self) -> usize;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shape of the relevance-to-probability transform: `(d + epsilon)^-exponent`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightParams {
    pub exponent: f64,
    pub epsilon: f64,
}

impl Default for WeightParams {
    fn default() -> Self {
        Self {
            exponent: DEFAULT_WEIGHT_EXPONENT,
            epsilon: DEFAULT_WEIGHT_EPSILON,
        }
    }
}

/// Reshuffles the positions on every pass, so each block of `n` consecutive
/// draws starting at a multiple of `n` covers every position exactly once.
pub struct UniformSampler {
    order: Vec<usize>,
    cursor: usize,
    rng: StdRng,
}

impl UniformSampler {
    fn new(len: usize, rng: StdRng) -> Self {
        let mut sampler = Self {
            order: (0..len).collect(),
            cursor: len,
            rng,
        };
        sampler.reshuffle(None);
        sampler
    }

    fn reshuffle(&mut self, previous: Option<usize>) {
        self.order.shuffle(&mut self.rng);
        self.cursor = 0;

        // keep the last draw of a pass from leading the next one
        if let (Some(prev), true) = (previous, self.order.len() > 1) {
            if self.order[0] == prev {
                let swap_with = self.rng.gen_range(1..self.order.len());
                self.order.swap(0, swap_with);
            }
        }
    }
}

impl IndexSampler for UniformSampler {
    fn next_index(&mut self) -> usize {
        if self.cursor >= self.order.len() {
            let previous = self.order.last().copied();
            self.reshuffle(previous);
        }
        let index = self.order[self.cursor];
        self.cursor += 1;
        index
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

/// Draws positions independently with probability proportional to
/// `(d_i + epsilon)^-exponent`, renormalized.
pub struct WeightedSampler {
    distribution: WeightedIndex<f64>,
    probabilities: Vec<f64>,
    rng: StdRng,
}

impl WeightedSampler {
    fn new(relevance_scores: &[f64], params: WeightParams, rng: StdRng) -> AppResult<Self> {
        let probabilities = relevance_probabilities(relevance_scores, params)?;
        let distribution = WeightedIndex::new(&probabilities)
            .map_err(|e| AppError::ValidationError(format!("Invalid sampling weights: {}", e)))?;

        Ok(Self {
            distribution,
            probabilities,
            rng,
        })
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }
}

impl IndexSampler for WeightedSampler {
    fn next_index(&mut self) -> usize {
        self.distribution.sample(&mut self.rng)
    }

    fn len(&self) -> usize {
        self.probabilities.len()
    }
}

pub enum Sampler {
    Uniform(UniformSampler),
    Weighted(WeightedSampler),
}

impl Sampler {
    /// Per-position draw probabilities; uniform for the shuffling sampler.
    pub fn probabilities(&self) -> Vec<f64> {
        match self {
            Sampler::Uniform(sampler) => {
                let n = sampler.len();
                vec![1.0 / n as f64; n]
            }
            Sampler::Weighted(sampler) => sampler.probabilities().to_vec(),
        }
    }

    pub fn is_weighted(&self) -> bool {
        matches!(self, Sampler::Weighted(_))
    }
}

impl IndexSampler for Sampler {
    fn next_index(&mut self) -> usize {
        match self {
            Sampler::Uniform(sampler) => sampler.next_index(),
            Sampler::Weighted(sampler) => sampler.next_index(),
        }
    }

    fn len(&self) -> usize {
        match self {
            Sampler::Uniform(sampler) => sampler.len(),
            Sampler::Weighted(sampler) => sampler.len(),
        }
    }
}

impl Iterator for Sampler {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        Some(self.next_index())
    }
}

/// Builds the sampler for a bank of `items`. With `relevance_scores` (smaller
/// is more relevant, one per item) the sampler is weighted; otherwise it cycles
/// through shuffled passes.
pub fn make_sampler<T>(
    items: &[T],
    relevance_scores: Option<&[f64]>,
    params: WeightParams,
    seed: Option<u64>,
) -> AppResult<Sampler> {
    if items.is_empty() {
        return Err(AppError::ValidationError(
            "Cannot sample from an empty item list".to_string(),
        ));
    }

    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    match relevance_scores {
        None => Ok(Sampler::Uniform(UniformSampler::new(items.len(), rng))),
        Some(scores) => {
            if scores.len() != items.len() {
                return Err(AppError::ValidationError(format!(
                    "Expected {} relevance scores, got {}",
                    items.len(),
                    scores.len()
                )));
            }
            Ok(Sampler::Weighted(WeightedSampler::new(scores, params, rng)?))
        }
    }
}

/// Computes the normalized draw probabilities in log space; the raw weights
/// overflow for any realistic exponent.
pub fn relevance_probabilities(scores: &[f64], params: WeightParams) -> AppResult<Vec<f64>> {
    if !(params.epsilon > 0.0 && params.epsilon.is_finite()) {
        return Err(AppError::ValidationError(format!(
            "Weight epsilon must be positive, got {}",
            params.epsilon
        )));
    }
    if !(params.exponent > 0.0 && params.exponent.is_finite()) {
        return Err(AppError::ValidationError(format!(
            "Weight exponent must be positive, got {}",
            params.exponent
        )));
    }
    if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
        return Err(AppError::ValidationError(format!(
            "Relevance scores must be finite, got {}",
            bad
        )));
    }

    let log_weights: Vec<f64> = scores
        .iter()
        .map(|d| -params.exponent * (d.max(0.0) + params.epsilon).ln())
        .collect();
    let max_log = log_weights
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);

    let weights: Vec<f64> = log_weights.iter().map(|w| (w - max_log).exp()).collect();
    let total: f64 = weights.iter().sum();

    Ok(weights.into_iter().map(|w| w / total).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn uniform_passes_cover_every_position() {
        let items = vec!["a"; 7];
        let mut sampler =
            make_sampler(&items, None, WeightParams::default(), Some(11)).expect("sampler");

        for _ in 0..5 {
            let pass: HashSet<usize> = (0..items.len()).map(|_| sampler.next_index()).collect();
            assert_eq!(pass.len(), items.len());
        }
    }

    #[test]
    fn uniform_never_repeats_across_pass_boundary() {
        let items = vec![(); 3];
        let mut sampler =
            make_sampler(&items, None, WeightParams::default(), Some(3)).expect("sampler");

        let draws: Vec<usize> = sampler.by_ref().take(300).collect();
        assert!(draws.windows(2).all(|w| w[0] != w[1]));
    }

    #[test]
    fn single_item_always_returns_zero() {
        let mut sampler =
            make_sampler(&[42], None, WeightParams::default(), None).expect("sampler");
        assert!((0..10).all(|_| sampler.next_index() == 0));
    }

    #[test]
    fn probabilities_favor_smaller_scores_and_sum_to_one() {
        let probabilities =
            relevance_probabilities(&[0.1, 0.5, 0.9], WeightParams::default()).expect("weights");

        let total: f64 = probabilities.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(probabilities[0] > probabilities[1]);
        assert!(probabilities[1] > probabilities[2]);
    }

    #[test]
    fn zero_distance_does_not_overflow() {
        let probabilities =
            relevance_probabilities(&[0.0, 0.0, 0.3], WeightParams::default()).expect("weights");

        assert!(probabilities.iter().all(|p| p.is_finite()));
        assert!((probabilities[0] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn rejects_bad_inputs() {
        let empty: [u8; 0] = [];
        assert!(make_sampler(&empty, None, WeightParams::default(), None).is_err());
        assert!(make_sampler(&[1, 2], Some(&[0.1]), WeightParams::default(), None).is_err());
        assert!(
            make_sampler(&[1, 2], Some(&[0.1, f64::NAN]), WeightParams::default(), None).is_err()
        );

        let no_epsilon = WeightParams {
            exponent: 50.0,
            epsilon: 0.0,
        };
        assert!(make_sampler(&[1, 2], Some(&[0.1, 0.2]), no_epsilon, None).is_err());
    }

    #[test]
    fn weighted_sampler_reports_probabilities() {
        let sampler = make_sampler(
            &["x", "y"],
            Some(&[0.2, 0.2]),
            WeightParams::default(),
            Some(1),
        )
        .expect("sampler");

        assert!(sampler.is_weighted());
        assert_eq!(sampler.probabilities(), vec![0.5, 0.5]);
    }
}
