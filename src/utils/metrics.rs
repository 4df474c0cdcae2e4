use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::models::{FactorModel, ItemId};

/// Root-mean-square error of a model against (user_index, item_index,
/// target) triples. Empty input yields 0.0.
pub fn rmse(model: &FactorModel, triples: &[(u32, u32, f32)]) -> f64 {
    if triples.is_empty() {
        return 0.0;
    }
    let squared: f64 = triples
        .iter()
        .map(|&(u, i, target)| {
            let error = (target - model.score(u as usize, i as usize)) as f64;
            error * error
        })
        .sum();
    (squared / triples.len() as f64).sqrt()
}

/// Shuffle and split interactions into (train, holdout) by the given
/// holdout fraction. The caller decides whether the split is meaningful;
/// this just partitions.
pub fn split_holdout<T>(
    mut items: Vec<T>,
    holdout_fraction: f32,
    rng: &mut StdRng,
) -> (Vec<T>, Vec<T>) {
    items.shuffle(rng);
    let holdout_len = ((items.len() as f32) * holdout_fraction).floor() as usize;
    let train_len = items.len() - holdout_len;
    let holdout = items.split_off(train_len);
    (items, holdout)
}

/// Fraction of the recommended list that appears in the relevant set,
/// over the first `k` positions.
pub fn precision_at_k(recommended: &[ItemId], relevant: &[ItemId], k: usize) -> f64 {
    if recommended.is_empty() || k == 0 {
        return 0.0;
    }
    let relevant_set: std::collections::HashSet<_> = relevant.iter().collect();
    let hits = recommended
        .iter()
        .take(k)
        .filter(|item| relevant_set.contains(item))
        .count();
    hits as f64 / k.min(recommended.len()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrainerVariant;
    use rand::SeedableRng;

    fn flat_model() -> FactorModel {
        FactorModel {
            variant: TrainerVariant::Als,
            user_factors: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            item_factors: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            user_bias: Vec::new(),
            item_bias: Vec::new(),
            global_mean: 0.0,
        }
    }

    #[test]
    fn rmse_of_exact_model_is_zero() {
        let model = flat_model();
        let triples = vec![(0, 0, 1.0), (1, 1, 1.0), (0, 1, 0.0)];
        assert!(rmse(&model, &triples) < 1e-9);
    }

    #[test]
    fn rmse_measures_error() {
        let model = flat_model();
        let triples = vec![(0, 0, 3.0)];
        assert!((rmse(&model, &triples) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn split_partitions_without_loss() {
        let triples: Vec<_> = (0..100).map(|i| (i as u32, i as u32, 1.0)).collect();
        let mut rng = StdRng::seed_from_u64(5);
        let (train, holdout) = split_holdout(triples, 0.1, &mut rng);
        assert_eq!(train.len(), 90);
        assert_eq!(holdout.len(), 10);
    }

    #[test]
    fn zero_fraction_keeps_everything_in_train() {
        let triples = vec![(0, 0, 1.0), (1, 1, 1.0)];
        let mut rng = StdRng::seed_from_u64(5);
        let (train, holdout) = split_holdout(triples, 0.0, &mut rng);
        assert_eq!(train.len(), 2);
        assert!(holdout.is_empty());
    }

    #[test]
    fn precision_counts_hits() {
        let recommended = vec![1, 2, 3];
        let relevant = vec![1, 3];
        assert!((precision_at_k(&recommended, &relevant, 3) - 2.0 / 3.0).abs() < 1e-9);
    }
}
