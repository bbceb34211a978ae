//! Ranking selection and random permutations.

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;

use crate::schema::RankingMethod;

/// Picks winner indices from a scored population.
///
/// Winners are drawn with replacement: the same index may appear several
/// times. Every winner must be below `fitness.len()`.
pub trait Ranker {
    fn rank(
        &mut self,
        method: RankingMethod,
        fitness: &[f32],
        maximize: bool,
        winners: &mut [usize],
        rng: &mut StdRng,
    );
}

/// Roulette, linear, exponential and tournament ranking.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRanker;

impl Ranker for StandardRanker {
    fn rank(
        &mut self,
        method: RankingMethod,
        fitness: &[f32],
        maximize: bool,
        winners: &mut [usize],
        rng: &mut StdRng,
    ) {
        if fitness.is_empty() {
            return;
        }

        match method {
            RankingMethod::Roulette => {
                let weights = roulette_weights(fitness, maximize);
                weighted_draw(&weights, winners, rng);
            }
            RankingMethod::Linear { selection_pressure } => {
                let order = rank_order(fitness, maximize);
                let n = fitness.len();
                let mut weights = vec![0.0f32; n];
                for (rank, &idx) in order.iter().enumerate() {
                    weights[idx] = if n == 1 {
                        1.0
                    } else {
                        selection_pressure
                            - (2.0 * selection_pressure - 2.0) * rank as f32 / (n - 1) as f32
                    };
                }
                weighted_draw(&weights, winners, rng);
            }
            RankingMethod::Exponential { base } => {
                let order = rank_order(fitness, maximize);
                let mut weights = vec![0.0f32; fitness.len()];
                let mut w = 1.0f32;
                for &idx in &order {
                    weights[idx] = w;
                    w *= base;
                }
                weighted_draw(&weights, winners, rng);
            }
            RankingMethod::Tournament { size } => {
                for winner in winners.iter_mut() {
                    let mut best = rng.gen_range(0..fitness.len());
                    for _ in 1..size.max(1) {
                        let idx = rng.gen_range(0..fitness.len());
                        if better(fitness[idx], fitness[best], maximize) {
                            best = idx;
                        }
                    }
                    *winner = best;
                }
            }
        }
    }
}

#[inline]
fn better(candidate: f32, incumbent: f32, maximize: bool) -> bool {
    if maximize {
        candidate > incumbent
    } else {
        candidate < incumbent
    }
}

/// Indices ordered best first.
fn rank_order(fitness: &[f32], maximize: bool) -> Vec<usize> {
    let mut order: Vec<usize> = (0..fitness.len()).collect();
    if maximize {
        order.sort_by(|&a, &b| fitness[b].total_cmp(&fitness[a]));
    } else {
        order.sort_by(|&a, &b| fitness[a].total_cmp(&fitness[b]));
    }
    order
}

/// Fitness-proportional weights. When minimizing, the distance below the worst
/// score is used instead. Non-finite scores get no weight.
fn roulette_weights(fitness: &[f32], maximize: bool) -> Vec<f32> {
    if maximize {
        fitness
            .iter()
            .map(|&f| if f.is_finite() { f.max(0.0) } else { 0.0 })
            .collect()
    } else {
        let worst = fitness
            .iter()
            .copied()
            .filter(|f| f.is_finite())
            .fold(f32::NEG_INFINITY, f32::max);
        fitness
            .iter()
            .map(|&f| if f.is_finite() { worst - f } else { 0.0 })
            .collect()
    }
}

/// Draw winners proportionally to `weights`, uniformly if no weight is positive.
fn weighted_draw(weights: &[f32], winners: &mut [usize], rng: &mut StdRng) {
    match WeightedIndex::new(weights) {
        Ok(dist) => {
            for winner in winners.iter_mut() {
                *winner = dist.sample(rng);
            }
        }
        Err(_) => {
            for winner in winners.iter_mut() {
                *winner = rng.gen_range(0..weights.len());
            }
        }
    }
}

/// Uniformly random permutation of `0..n` by inside-out shuffling.
pub fn inside_out_permutation(n: usize, rng: &mut StdRng) -> Vec<usize> {
    let mut permutation = vec![0usize; n];
    for l in 0..n {
        let r = rng.gen_range(0..=l);
        if r != l {
            permutation[l] = permutation[r];
        }
        permutation[r] = l;
    }
    permutation
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;

    fn draw(method: RankingMethod, fitness: &[f32], maximize: bool, count: usize) -> Vec<usize> {
        let mut rng = StdRng::seed_from_u64(3);
        let mut winners = vec![usize::MAX; count];
        StandardRanker.rank(method, fitness, maximize, &mut winners, &mut rng);
        winners
    }

    fn methods() -> Vec<RankingMethod> {
        vec![
            RankingMethod::Roulette,
            RankingMethod::Linear {
                selection_pressure: 1.5,
            },
            RankingMethod::Exponential { base: 0.8 },
            RankingMethod::Tournament { size: 3 },
        ]
    }

    proptest! {
        #[test]
        fn prop_winners_in_range(
            fitness in prop::collection::vec(-10.0f32..10.0, 1..40),
            count in 0usize..64,
            maximize in any::<bool>(),
        ) {
            for method in methods() {
                let winners = draw(method, &fitness, maximize, count);
                prop_assert_eq!(winners.len(), count);
                prop_assert!(winners.iter().all(|&w| w < fitness.len()));
            }
        }

        #[test]
        fn prop_permutation_is_bijective(n in 0usize..200, seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut permutation = inside_out_permutation(n, &mut rng);
            permutation.sort_unstable();
            prop_assert_eq!(permutation, (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_roulette_skips_zero_fitness() {
        let winners = draw(RankingMethod::Roulette, &[0.0, 5.0, 0.0], true, 100);
        assert!(winners.iter().all(|&w| w == 1));
    }

    #[test]
    fn test_roulette_uniform_fallback() {
        let winners = draw(RankingMethod::Roulette, &[0.0, 0.0, 0.0, 0.0], true, 200);
        for idx in 0..4 {
            assert!(winners.contains(&idx));
        }
    }

    #[test]
    fn test_roulette_minimize_prefers_low() {
        let winners = draw(RankingMethod::Roulette, &[1.0, 9.0], false, 100);
        assert!(winners.iter().all(|&w| w == 0));
    }

    #[test]
    fn test_full_tournament_picks_best() {
        // With many contestants the best is found with overwhelming probability.
        let fitness = [0.2, 0.9, 0.5, 0.1];
        let winners = draw(RankingMethod::Tournament { size: 64 }, &fitness, true, 10);
        assert!(winners.iter().all(|&w| w == 1));

        let winners = draw(RankingMethod::Tournament { size: 64 }, &fitness, false, 10);
        assert!(winners.iter().all(|&w| w == 3));
    }

    #[test]
    fn test_linear_max_pressure_excludes_worst() {
        // Pressure 2 gives the worst rank zero weight.
        let fitness = [3.0, 1.0, 2.0];
        let winners = draw(
            RankingMethod::Linear {
                selection_pressure: 2.0,
            },
            &fitness,
            true,
            300,
        );
        assert!(!winners.contains(&1));
        assert!(winners.contains(&0));
    }

    #[test]
    fn test_exponential_tiny_base_picks_best() {
        let fitness = [3.0, 7.0, 2.0];
        let winners = draw(RankingMethod::Exponential { base: 1e-30 }, &fitness, true, 50);
        assert!(winners.iter().all(|&w| w == 1));
    }

    #[test]
    fn test_rank_order() {
        assert_eq!(rank_order(&[1.0, 3.0, 2.0], true), vec![1, 2, 0]);
        assert_eq!(rank_order(&[1.0, 3.0, 2.0], false), vec![0, 2, 1]);
    }
}
