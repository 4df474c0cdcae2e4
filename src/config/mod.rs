use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub weights: WeightConfig,
    pub sgd: SgdConfig,
    pub als: AlsConfig,
    pub recommend: RecommendConfig,
    pub training: TrainingConfig,
}

/// Constants of the interaction-weight formula:
/// `weight = view * ln(1 + views) + buy * buys + rating_bonus * [rating >= threshold]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightConfig {
    pub view: f32,
    pub buy: f32,
    pub rating_bonus: f32,
    pub rating_threshold: f32,
    /// Substituted for absent ratings before clipping to [1, 5].
    pub base_rating: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SgdConfig {
    pub factors: usize,
    pub learning_rate: f32,
    pub regularization: f32,
    pub epochs: usize,
    /// Fixed seed for factor initialization and epoch shuffling.
    /// `None` draws from entropy.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlsConfig {
    pub factors: usize,
    pub regularization: f32,
    pub iterations: usize,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendConfig {
    pub top_n: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Fraction of interactions held out for post-training RMSE monitoring.
    pub holdout_fraction: f32,
    /// Below this many interactions the holdout split degenerates and the
    /// full set is evaluated instead.
    pub min_split_interactions: usize,
    pub threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            weights: WeightConfig {
                view: 1.0,
                buy: 20.0,
                rating_bonus: 5.0,
                rating_threshold: 4.0,
                base_rating: 3.0,
            },
            sgd: SgdConfig {
                factors: 20,
                learning_rate: 0.01,
                regularization: 0.02,
                epochs: 25,
                seed: None,
            },
            als: AlsConfig {
                factors: 64,
                regularization: 0.01,
                iterations: 20,
                seed: None,
            },
            recommend: RecommendConfig { top_n: 10 },
            training: TrainingConfig {
                holdout_fraction: 0.1,
                min_split_interactions: 10,
                threads: num_cpus::get(),
            },
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("LATENTREC").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_engine_defaults() {
        let config = Config::default();
        assert_eq!(config.weights.buy, 20.0);
        assert_eq!(config.sgd.factors, 20);
        assert_eq!(config.sgd.epochs, 25);
        assert_eq!(config.als.factors, 64);
        assert_eq!(config.als.iterations, 20);
        assert_eq!(config.recommend.top_n, 10);
    }
}
