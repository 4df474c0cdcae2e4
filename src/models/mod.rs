use serde::{Deserialize, Serialize};

use crate::dataset::index::IndexMapping;
use crate::dataset::matrix::InteractionMatrix;

/// External user identifier as supplied by the feed.
pub type UserId = String;
/// External item identifier as supplied by the feed.
pub type ItemId = i64;

/// One pre-aggregated row of the interaction feed: the upstream store has
/// already summed counts and averaged ratings per (user, item) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRow {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub view_count: f32,
    pub buy_count: f32,
    pub rating: Option<f32>,
}

impl InteractionRow {
    pub fn new(user_id: impl Into<UserId>, item_id: ItemId) -> Self {
        Self {
            user_id: user_id.into(),
            item_id,
            view_count: 0.0,
            buy_count: 0.0,
            rating: None,
        }
    }

    pub fn with_views(mut self, views: f32) -> Self {
        self.view_count = views;
        self
    }

    pub fn with_buys(mut self, buys: f32) -> Self {
        self.buy_count = buys;
        self
    }

    pub fn with_rating(mut self, rating: f32) -> Self {
        self.rating = Some(rating);
        self
    }
}

/// A (user, item) pair reduced to a single positive implicit-feedback
/// weight. Pairs whose signals cancel to zero never become one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedInteraction {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub weight: f32,
}

/// Which factorization algorithm a training run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainerVariant {
    /// Bias-aware matrix factorization via stochastic gradient descent.
    Sgd,
    /// Implicit-confidence alternating least squares.
    Als,
}

impl std::str::FromStr for TrainerVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sgd" => Ok(Self::Sgd),
            "als" => Ok(Self::Als),
            other => Err(format!("unknown trainer variant: {other}")),
        }
    }
}

/// Latent factors produced by one training run. Bias vectors are populated
/// by the SGD variant only; the ALS variant scores by pure dot product.
/// Never mutated after training completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorModel {
    pub variant: TrainerVariant,
    pub user_factors: Vec<Vec<f32>>,
    pub item_factors: Vec<Vec<f32>>,
    pub user_bias: Vec<f32>,
    pub item_bias: Vec<f32>,
    pub global_mean: f32,
}

impl FactorModel {
    pub fn num_users(&self) -> usize {
        self.user_factors.len()
    }

    pub fn num_items(&self) -> usize {
        self.item_factors.len()
    }

    /// Predicted preference of user index `u` for item index `i`.
    pub fn score(&self, u: usize, i: usize) -> f32 {
        let dot = crate::utils::dot(&self.user_factors[u], &self.item_factors[i]);
        match self.variant {
            TrainerVariant::Sgd => self.global_mean + self.user_bias[u] + self.item_bias[i] + dot,
            TrainerVariant::Als => dot,
        }
    }
}

/// The atomically-swappable serving unit: one model plus the mapping and
/// interaction matrix it was trained against. Indices are only meaningful
/// within one of these; mixing fields across instances is never valid.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainedModel {
    pub factors: FactorModel,
    pub mapping: IndexMapping,
    pub interactions: InteractionMatrix,
}

impl TrainedModel {
    /// Dimension-consistency check between factors, mapping and matrix.
    pub fn check_consistent(&self) -> crate::error::Result<()> {
        let (users, items) = (self.mapping.num_users(), self.mapping.num_items());
        if self.factors.num_users() != users || self.factors.num_items() != items {
            return Err(crate::error::EngineError::MalformedModel(format!(
                "factors are {}x{} but mapping is {}x{}",
                self.factors.num_users(),
                self.factors.num_items(),
                users,
                items
            )));
        }
        if self.interactions.num_users() != users || self.interactions.num_items() != items {
            return Err(crate::error::EngineError::MalformedModel(format!(
                "interaction matrix is {}x{} but mapping is {}x{}",
                self.interactions.num_users(),
                self.interactions.num_items(),
                users,
                items
            )));
        }
        if self.factors.variant == TrainerVariant::Sgd
            && (self.factors.user_bias.len() != users || self.factors.item_bias.len() != items)
        {
            return Err(crate::error::EngineError::MalformedModel(
                "bias vectors do not match mapping dimensions".to_string(),
            ));
        }
        Ok(())
    }
}

/// One ranked output tuple, as written to the batch export sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
    pub item_id: ItemId,
    pub score: f32,
}
