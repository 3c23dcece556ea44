//! Weighted random item selection.
//!
//! A [`Builder`] validates `(item, weight)` pairs and produces an immutable
//! [`WeightedSampler`]. The sampler groups items of equal weight into buckets
//! indexed by cumulative weight, so each draw is a binary search over the
//! distinct weights followed by a uniform pick inside the chosen bucket.
//!
//! Three weight representations share the algorithm:
//! - integers ([`Builder::integer`]), exact `i64` weights;
//! - decimals ([`Builder::decimal`]), rescaled to a common power of ten;
//! - probabilities ([`Builder::probability`]), `f32` masses in `(0, 1]`
//!   summed as `f64` and compared with a configurable resolution; draws may
//!   select nothing when the committed mass is below 1.

pub mod builder;
pub mod configure;
pub mod decimal;
pub mod error;
pub mod rand;
pub mod sampler;
pub mod weight;

#[cfg(feature = "log")]
pub mod log;
#[cfg(feature = "sync")]
pub mod shared;
#[cfg(feature = "toml")]
pub mod weights_file;

pub use builder::{Builder, DecimalBuilder, IntegerBuilder, ProbabilityBuilder};
pub use configure::SamplerConfig;
pub use decimal::Decimal;
pub use error::SamplerError;
pub use sampler::WeightedSampler;
pub use weight::{Exact, Probability, WeightPolicy, WeightedEntry};
