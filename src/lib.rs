pub mod algorithms;
pub mod config;
pub mod dataset;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{EngineError, Result};
pub use models::*;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

/// Cooperative cancellation flag for long-lived training runs, checked
/// between epochs/iterations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Explicitly owned serving context holding the active model/mapping pair.
///
/// Retraining produces a brand-new `TrainedModel`; `install` swaps the whole
/// pair in one step, so a concurrent reader sees either the old or the new
/// pair in full, never old factors against new indices. Multiple contexts
/// can coexist, which is what makes hot-swapping across model versions
/// possible without process-wide globals.
#[derive(Debug, Default)]
pub struct EngineContext {
    active: RwLock<Option<Arc<TrainedModel>>>,
}

impl EngineContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(model: TrainedModel) -> Self {
        let context = Self::new();
        context.install(model);
        context
    }

    /// Publish a freshly trained model, replacing the previous one.
    pub fn install(&self, model: TrainedModel) {
        *self.active.write() = Some(Arc::new(model));
    }

    /// The currently active pair, if a training run has completed.
    pub fn current(&self) -> Option<Arc<TrainedModel>> {
        self.active.read().clone()
    }
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
