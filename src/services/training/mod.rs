use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::algorithms;
use crate::config::Config;
use crate::dataset::{self, index::IndexMapping, matrix::InteractionMatrix};
use crate::error::{EngineError, Result};
use crate::models::{
    FactorModel, InteractionRow, ItemId, TrainedModel, TrainerVariant, WeightedInteraction,
};
use crate::services::recommendation;
use crate::utils::metrics;
use crate::CancelToken;

/// One-shot batch training: raw feed rows in, an immutable serving pair
/// out. Owns nothing mutable between runs; every call rebuilds the full
/// pipeline (normalize, weight, index, matrix, factorize).
pub struct TrainingService {
    config: Arc<Config>,
}

impl TrainingService {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    pub fn train(&self, rows: Vec<InteractionRow>, variant: TrainerVariant) -> Result<TrainedModel> {
        self.train_with_cancel(rows, variant, &CancelToken::new())
    }

    pub fn train_with_cancel(
        &self,
        rows: Vec<InteractionRow>,
        variant: TrainerVariant,
        cancel: &CancelToken,
    ) -> Result<TrainedModel> {
        let normalized = dataset::normalize(rows, &self.config.weights);
        let weighted = dataset::build_weights(&normalized, &self.config.weights);
        if weighted.is_empty() {
            return Err(EngineError::EmptyDataset("no interactions survived weighting"));
        }

        let mapping = IndexMapping::build(&weighted)?;
        let interactions = InteractionMatrix::build(&weighted, &mapping);
        info!(
            users = mapping.num_users(),
            items = mapping.num_items(),
            interactions = interactions.nnz(),
            ?variant,
            "assembled interaction matrix"
        );

        let (train_set, holdout) = self.split(&weighted, variant);

        let train_matrix = if holdout.is_empty() {
            interactions.clone()
        } else {
            InteractionMatrix::build(&train_set, &mapping)
        };

        let trainer = algorithms::trainer_for(variant, &self.config);
        let factors = trainer.fit(&train_matrix, cancel)?;

        let eval_set = if holdout.is_empty() { &weighted } else { &holdout };
        let eval_triples = self.eval_triples(eval_set, &mapping, variant);
        let holdout_rmse = metrics::rmse(&factors, &eval_triples);
        info!(
            holdout_rmse,
            holdout_size = eval_triples.len(),
            degenerate = holdout.is_empty(),
            "training complete"
        );
        if !holdout.is_empty() {
            self.log_ranking_quality(&factors, &mapping, train_matrix, &holdout);
        }

        let model = TrainedModel {
            factors,
            mapping,
            interactions,
        };
        model.check_consistent()?;
        Ok(model)
    }

    /// Partition the weighted set for holdout monitoring. Too few
    /// interactions (or a zero fraction) degenerates the split: warn and
    /// reuse the full set for both training and evaluation.
    fn split(
        &self,
        weighted: &[WeightedInteraction],
        variant: TrainerVariant,
    ) -> (Vec<WeightedInteraction>, Vec<WeightedInteraction>) {
        let settings = &self.config.training;
        if settings.holdout_fraction <= 0.0
            || weighted.len() < settings.min_split_interactions
        {
            if settings.holdout_fraction > 0.0 {
                warn!(
                    interactions = weighted.len(),
                    minimum = settings.min_split_interactions,
                    "too few interactions for a meaningful holdout split, evaluating on the training set"
                );
            }
            return (weighted.to_vec(), Vec::new());
        }

        let seed = match variant {
            TrainerVariant::Sgd => self.config.sgd.seed,
            TrainerVariant::Als => self.config.als.seed,
        };
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        metrics::split_holdout(weighted.to_vec(), settings.holdout_fraction, &mut rng)
    }

    /// Mean precision@N over holdout users: how much of each user's
    /// held-out history the train-side model ranks into its top N. Served
    /// against the train matrix so held-out items count as unseen.
    fn log_ranking_quality(
        &self,
        factors: &FactorModel,
        mapping: &IndexMapping,
        train_matrix: InteractionMatrix,
        holdout: &[WeightedInteraction],
    ) {
        let train_model = TrainedModel {
            factors: factors.clone(),
            mapping: mapping.clone(),
            interactions: train_matrix,
        };
        let top_n = self.config.recommend.top_n;

        let mut relevant: HashMap<&str, Vec<ItemId>> = HashMap::new();
        for w in holdout {
            relevant.entry(w.user_id.as_str()).or_default().push(w.item_id);
        }

        let total: f64 = relevant
            .iter()
            .map(|(user_id, items)| {
                let recs = recommendation::recommend(&train_model, user_id, top_n);
                metrics::precision_at_k(&recs, items, top_n)
            })
            .sum();
        let precision = total / relevant.len() as f64;
        info!(precision, top_n, users = relevant.len(), "holdout ranking quality");
    }

    /// Evaluation targets per variant: SGD predicts the log-compressed
    /// weight, ALS predicts preference 1.0 for observed pairs.
    fn eval_triples(
        &self,
        interactions: &[WeightedInteraction],
        mapping: &IndexMapping,
        variant: TrainerVariant,
    ) -> Vec<(u32, u32, f32)> {
        interactions
            .iter()
            .filter_map(|w| {
                let u = mapping.user_index(&w.user_id)?;
                let i = mapping.item_index(w.item_id)?;
                let target = match variant {
                    TrainerVariant::Sgd => algorithms::sgd_target(w.weight),
                    TrainerVariant::Als => 1.0,
                };
                Some((u, i, target))
            })
            .collect()
    }
}
