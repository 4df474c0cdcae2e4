use thiserror::Error;

/// Failure taxonomy for the recommendation engine.
///
/// Unknown user or item identifiers are deliberately not represented here:
/// lookups against the active mapping recover locally to an empty result and
/// never surface as errors to serving callers.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No interactions survived cleaning and weighting. Training aborts
    /// before any factor is touched.
    #[error("empty dataset: {0}")]
    EmptyDataset(&'static str),

    /// Training was cancelled between epochs/iterations. No model is
    /// published.
    #[error("training cancelled after {completed} of {total} passes")]
    Cancelled { completed: usize, total: usize },

    /// The factor model and the index mapping disagree on dimensions,
    /// e.g. a model paired with a mapping from a different run. Recovered
    /// to empty results at the serving boundary.
    #[error("malformed model: {0}")]
    MalformedModel(String),

    /// Input feed could not be read or parsed.
    #[error("feed error: {0}")]
    Feed(String),

    /// A persisted model snapshot could not be written or restored.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
