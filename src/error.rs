use thiserror::Error;

/// Errors raised while accumulating weighted items or building a sampler.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SamplerError {
    #[error("weight must be positive, got {0}")]
    NonPositiveWeight(String),
    #[error("probability {0} is outside (0, 1]")]
    ProbabilityOutOfRange(f32),
    #[error("resolution {0} is outside [0, 0.5]")]
    ResolutionOutOfRange(f32),
    #[error("malformed decimal weight `{0}`")]
    MalformedDecimal(String),
    #[error("decimal scale {scale} exceeds the supported maximum of {max}")]
    ScaleOutOfRange { scale: u32, max: u32 },
    /// Accumulated weight would overflow the representable total, or the
    /// committed probability mass would exceed 1.
    #[error("insufficient capacity: {committed} committed, cannot add {requested}")]
    InsufficientCapacity { committed: String, requested: String },
    #[error("no items")]
    Empty,
}

impl SamplerError {
    pub(crate) fn capacity(committed: impl ToString, requested: impl ToString) -> Self {
        Self::InsufficientCapacity {
            committed: committed.to_string(),
            requested: requested.to_string(),
        }
    }
}
