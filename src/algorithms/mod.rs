pub mod als;
pub mod sgd;

use crate::config::Config;
use crate::dataset::matrix::InteractionMatrix;
use crate::error::Result;
use crate::models::{FactorModel, TrainerVariant};
use crate::CancelToken;

/// A factorization algorithm: consumes the assembled interaction matrix and
/// produces an immutable factor model. The output contract is the fixed
/// `FactorModel` shape for every implementation; callers never have to guess
/// what a trainer returned.
pub trait FactorizationTrainer: Send + Sync {
    fn fit(&self, matrix: &InteractionMatrix, cancel: &CancelToken) -> Result<FactorModel>;
}

pub fn trainer_for(variant: TrainerVariant, config: &Config) -> Box<dyn FactorizationTrainer> {
    match variant {
        TrainerVariant::Sgd => Box::new(sgd::SgdTrainer::new(config.sgd.clone())),
        TrainerVariant::Als => Box::new(als::AlsTrainer::new(config.als.clone())),
    }
}

/// The SGD training target for one observed interaction. One labeling
/// scheme feeds both trainers: ALS consumes the raw weight as confidence,
/// SGD consumes its log compression so the wide confidence range
/// (purchases vs. views) stays within reach of a fixed learning rate.
pub(crate) fn sgd_target(weight: f32) -> f32 {
    weight.ln_1p()
}
