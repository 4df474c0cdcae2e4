use nalgebra::{Cholesky, DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::info;

use crate::config::AlsConfig;
use crate::dataset::matrix::InteractionMatrix;
use crate::error::{EngineError, Result};
use crate::models::{FactorModel, TrainerVariant};
use crate::CancelToken;

/// Implicit-confidence alternating least squares (Hu, Koren, Volinsky).
///
/// Weights act as confidence, not rating proxies: each observed pair has
/// preference 1 with confidence `1 + weight`, every unobserved pair has
/// preference 0 with confidence 1. Alternately fixing one side reduces the
/// other side to independent regularized normal-equation solves, which is
/// what keeps the method stable across the orders-of-magnitude confidence
/// range purchases-vs-views produces, and what makes each half-iteration
/// embarrassingly parallel.
pub struct AlsTrainer {
    config: AlsConfig,
}

impl AlsTrainer {
    pub fn new(config: AlsConfig) -> Self {
        Self { config }
    }
}

fn init_matrix(rng: &mut StdRng, rows: usize, k: usize) -> DMatrix<f32> {
    let scale = 0.1 / (k as f32).sqrt();
    DMatrix::from_fn(rows, k, |_, _| rng.gen_range(-scale..scale))
}

/// Solve one side of the alternation: for every entity with observed
/// entries `(other_index, weight)`, solve
/// `(YtY + sum (c-1) y yT + reg I) x = sum c y`.
/// The `YtY` Gram term covers all unobserved pairs at confidence 1.
fn solve_side(rows: &[Vec<(u32, f32)>], other: &DMatrix<f32>, reg: f32) -> DMatrix<f32> {
    let k = other.ncols();
    let gram = other.transpose() * other;

    let solved: Vec<Vec<f32>> = rows
        .par_iter()
        .map(|entries| {
            if entries.is_empty() {
                return vec![0.0; k];
            }

            let mut a = gram.clone();
            for d in 0..k {
                a[(d, d)] += reg;
            }
            let mut b = DVector::<f32>::zeros(k);

            for &(j, weight) in entries {
                let y = other.row(j as usize).transpose();
                let confidence = 1.0 + weight;
                a += (confidence - 1.0) * (&y * y.transpose());
                b += &y * confidence;
            }

            match Cholesky::new(a.clone()) {
                Some(chol) => chol.solve(&b).iter().copied().collect(),
                // The system is positive definite for reg > 0; LU covers
                // numerically borderline cases.
                None => match a.lu().solve(&b) {
                    Some(x) => x.iter().copied().collect(),
                    None => vec![0.0; k],
                },
            }
        })
        .collect();

    DMatrix::from_fn(rows.len(), k, |r, c| solved[r][c])
}

impl super::FactorizationTrainer for AlsTrainer {
    fn fit(&self, matrix: &InteractionMatrix, cancel: &CancelToken) -> Result<FactorModel> {
        if matrix.nnz() == 0 {
            return Err(EngineError::EmptyDataset("no interactions to train on"));
        }

        let k = self.config.factors;
        let reg = self.config.regularization;
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let user_rows: Vec<Vec<(u32, f32)>> = (0..matrix.num_users() as u32)
            .map(|u| matrix.user_row(u).collect())
            .collect();
        let item_rows = matrix.transposed_rows();

        let mut user_factors = init_matrix(&mut rng, matrix.num_users(), k);
        let mut item_factors = init_matrix(&mut rng, matrix.num_items(), k);

        for iteration in 0..self.config.iterations {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled {
                    completed: iteration,
                    total: self.config.iterations,
                });
            }

            user_factors = solve_side(&user_rows, &item_factors, reg);
            item_factors = solve_side(&item_rows, &user_factors, reg);

            info!(
                iteration = iteration + 1,
                iterations = self.config.iterations,
                "als iteration complete"
            );
        }

        let to_rows = |m: &DMatrix<f32>| -> Vec<Vec<f32>> {
            (0..m.nrows())
                .map(|r| m.row(r).iter().copied().collect())
                .collect()
        };

        Ok(FactorModel {
            variant: TrainerVariant::Als,
            user_factors: to_rows(&user_factors),
            item_factors: to_rows(&item_factors),
            user_bias: Vec::new(),
            item_bias: Vec::new(),
            global_mean: 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::FactorizationTrainer;
    use crate::config::Config;
    use crate::dataset::index::IndexMapping;
    use crate::models::WeightedInteraction;

    fn interaction(user: &str, item: i64, weight: f32) -> WeightedInteraction {
        WeightedInteraction {
            user_id: user.to_string(),
            item_id: item,
            weight,
        }
    }

    fn sample_matrix() -> InteractionMatrix {
        let interactions = vec![
            interaction("alice", 101, 1.79),
            interaction("alice", 102, 20.0),
            interaction("bob", 103, 5.0),
            interaction("bob", 102, 20.0),
            interaction("carol", 101, 3.0),
        ];
        let mapping = IndexMapping::build(&interactions).unwrap();
        InteractionMatrix::build(&interactions, &mapping)
    }

    fn config(seed: u64) -> AlsConfig {
        AlsConfig {
            factors: 8,
            regularization: 0.01,
            iterations: 10,
            seed: Some(seed),
        }
    }

    #[test]
    fn produces_bias_free_model() {
        let matrix = sample_matrix();
        let model = AlsTrainer::new(config(3))
            .fit(&matrix, &CancelToken::new())
            .unwrap();
        assert_eq!(model.variant, TrainerVariant::Als);
        assert_eq!(model.num_users(), 3);
        assert_eq!(model.num_items(), 3);
        assert!(model.user_bias.is_empty());
        assert!(model.item_bias.is_empty());
        assert_eq!(model.global_mean, 0.0);
        for row in model.user_factors.iter().chain(&model.item_factors) {
            assert_eq!(row.len(), 8);
            assert!(row.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn observed_pairs_score_above_unobserved() {
        let matrix = sample_matrix();
        let model = AlsTrainer::new(AlsConfig { iterations: 20, ..config(3) })
            .fit(&matrix, &CancelToken::new())
            .unwrap();
        // alice bought item index 1 heavily and never touched index 2.
        assert!(model.score(0, 1) > model.score(0, 2));
        // bob's strongest signal is also item index 1.
        assert!(model.score(1, 1) > model.score(1, 0));
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let matrix = sample_matrix();
        let a = AlsTrainer::new(config(9))
            .fit(&matrix, &CancelToken::new())
            .unwrap();
        let b = AlsTrainer::new(config(9))
            .fit(&matrix, &CancelToken::new())
            .unwrap();
        assert_eq!(a.item_factors, b.item_factors);
    }

    #[test]
    fn cancellation_between_iterations() {
        let matrix = sample_matrix();
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = AlsTrainer::new(config(1))
            .fit(&matrix, &cancel)
            .unwrap_err();
        assert!(matches!(err, EngineError::Cancelled { completed: 0, .. }));
    }

    #[test]
    fn default_hyperparameters_match_config() {
        let config = Config::default().als;
        assert_eq!(config.factors, 64);
        assert_eq!(config.regularization, 0.01);
        assert_eq!(config.iterations, 20);
    }
}
