use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::config::SgdConfig;
use crate::dataset::matrix::InteractionMatrix;
use crate::error::{EngineError, Result};
use crate::models::{FactorModel, TrainerVariant};
use crate::CancelToken;

/// Bias-aware matrix factorization trained by true stochastic gradient
/// descent: each triple sees the updates of the previous one, which is why
/// the pass is inherently sequential. Runs exactly `epochs` epochs, no
/// early stopping.
pub struct SgdTrainer {
    config: SgdConfig,
}

impl SgdTrainer {
    pub fn new(config: SgdConfig) -> Self {
        Self { config }
    }

    fn rng(&self) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Small scaled-normal noise via Box-Muller, matching the usual
/// factor-matrix initialization scale of 0.1 / sqrt(k).
fn init_factors(rng: &mut StdRng, rows: usize, k: usize) -> Vec<Vec<f32>> {
    let std_dev = 0.1 / (k as f32).sqrt();
    (0..rows)
        .map(|_| {
            (0..k)
                .map(|_| {
                    let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
                    let u2: f32 = rng.gen();
                    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
                    z0 * std_dev
                })
                .collect()
        })
        .collect()
}

impl super::FactorizationTrainer for SgdTrainer {
    fn fit(&self, matrix: &InteractionMatrix, cancel: &CancelToken) -> Result<FactorModel> {
        let mut triples: Vec<(u32, u32, f32)> = matrix
            .triples()
            .into_iter()
            .map(|(u, i, w)| (u, i, super::sgd_target(w)))
            .collect();
        if triples.is_empty() {
            return Err(EngineError::EmptyDataset("no triples to train on"));
        }

        let k = self.config.factors;
        let lr = self.config.learning_rate;
        let reg = self.config.regularization;
        let mut rng = self.rng();

        let global_mean =
            triples.iter().map(|(_, _, t)| t).sum::<f32>() / triples.len() as f32;
        let mut user_factors = init_factors(&mut rng, matrix.num_users(), k);
        let mut item_factors = init_factors(&mut rng, matrix.num_items(), k);
        let mut user_bias = vec![0.0f32; matrix.num_users()];
        let mut item_bias = vec![0.0f32; matrix.num_items()];

        for epoch in 0..self.config.epochs {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled {
                    completed: epoch,
                    total: self.config.epochs,
                });
            }

            triples.shuffle(&mut rng);

            let mut squared_error = 0.0f64;
            for &(u, i, target) in &triples {
                let (u, i) = (u as usize, i as usize);
                let dot: f32 = user_factors[u]
                    .iter()
                    .zip(&item_factors[i])
                    .map(|(a, b)| a * b)
                    .sum();
                let prediction = global_mean + user_bias[u] + item_bias[i] + dot;
                let error = target - prediction;
                squared_error += (error * error) as f64;

                user_bias[u] += lr * (error - reg * user_bias[u]);
                item_bias[i] += lr * (error - reg * item_bias[i]);

                for f in 0..k {
                    let uf = user_factors[u][f];
                    let itf = item_factors[i][f];
                    user_factors[u][f] += lr * (error * itf - reg * uf);
                    item_factors[i][f] += lr * (error * uf - reg * itf);
                }
            }

            let rmse = (squared_error / triples.len() as f64).sqrt();
            info!(epoch = epoch + 1, epochs = self.config.epochs, rmse, "sgd epoch complete");
        }

        Ok(FactorModel {
            variant: TrainerVariant::Sgd,
            user_factors,
            item_factors,
            user_bias,
            item_bias,
            global_mean,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::FactorizationTrainer;
    use crate::dataset::index::IndexMapping;
    use crate::models::WeightedInteraction;

    fn interaction(user: &str, item: i64, weight: f32) -> WeightedInteraction {
        WeightedInteraction {
            user_id: user.to_string(),
            item_id: item,
            weight,
        }
    }

    fn sample_matrix() -> (InteractionMatrix, IndexMapping) {
        let interactions = vec![
            interaction("alice", 101, 1.79),
            interaction("alice", 102, 20.0),
            interaction("bob", 103, 5.0),
            interaction("bob", 101, 2.0),
            interaction("carol", 102, 20.0),
            interaction("carol", 103, 1.0),
        ];
        let mapping = IndexMapping::build(&interactions).unwrap();
        (InteractionMatrix::build(&interactions, &mapping), mapping)
    }

    fn config(seed: u64) -> SgdConfig {
        SgdConfig {
            factors: 8,
            learning_rate: 0.01,
            regularization: 0.02,
            epochs: 30,
            seed: Some(seed),
        }
    }

    #[test]
    fn produces_full_model_shape() {
        let (matrix, _) = sample_matrix();
        let model = SgdTrainer::new(config(7))
            .fit(&matrix, &CancelToken::new())
            .unwrap();
        assert_eq!(model.variant, TrainerVariant::Sgd);
        assert_eq!(model.num_users(), 3);
        assert_eq!(model.num_items(), 3);
        assert_eq!(model.user_bias.len(), 3);
        assert_eq!(model.item_bias.len(), 3);
        assert!(model.global_mean > 0.0);
        for row in &model.user_factors {
            assert_eq!(row.len(), 8);
            assert!(row.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn training_reduces_reconstruction_error() {
        let (matrix, _) = sample_matrix();
        let targets: Vec<(u32, u32, f32)> = matrix
            .triples()
            .into_iter()
            .map(|(u, i, w)| (u, i, crate::algorithms::sgd_target(w)))
            .collect();

        let rmse = |model: &FactorModel| {
            let se: f32 = targets
                .iter()
                .map(|&(u, i, t)| {
                    let e = t - model.score(u as usize, i as usize);
                    e * e
                })
                .sum();
            (se / targets.len() as f32).sqrt()
        };

        let short = SgdTrainer::new(SgdConfig { epochs: 1, ..config(7) })
            .fit(&matrix, &CancelToken::new())
            .unwrap();
        let long = SgdTrainer::new(SgdConfig { epochs: 200, ..config(7) })
            .fit(&matrix, &CancelToken::new())
            .unwrap();
        assert!(rmse(&long) < rmse(&short));
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let (matrix, _) = sample_matrix();
        let a = SgdTrainer::new(config(42))
            .fit(&matrix, &CancelToken::new())
            .unwrap();
        let b = SgdTrainer::new(config(42))
            .fit(&matrix, &CancelToken::new())
            .unwrap();
        assert_eq!(a.user_factors, b.user_factors);
        assert_eq!(a.item_bias, b.item_bias);
    }

    #[test]
    fn cancellation_aborts_before_first_epoch() {
        let (matrix, _) = sample_matrix();
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = SgdTrainer::new(config(1))
            .fit(&matrix, &cancel)
            .unwrap_err();
        assert!(matches!(err, EngineError::Cancelled { completed: 0, .. }));
    }
}
